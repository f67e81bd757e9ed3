//! Accounts, wishlists and newsletter subscribers.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::domain::aggregates::{Identity, ProfileUpdate, Subscriber, User, WishlistEntry};
use crate::domain::value_objects::Money;
use crate::{Result, StorefrontError};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn split(self) -> (User, String) {
        let user = User {
            id: self.id,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (user, self.password_hash)
    }
}

/// Fields written when an account is created.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub phone: Option<&'a str>,
}

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO users (email, password_hash, first_name, last_name, phone, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.first_name)
        .bind(user.last_name)
        .bind(user.phone)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match StorefrontError::from(e) {
            StorefrontError::Conflict(_) => StorefrontError::conflict("Email already registered"),
            other => other,
        })?;
        Ok(result.last_insert_rowid())
    }

    /// The account and its stored password hash.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserRow::split))
    }

    pub async fn find(&self, id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.split().0))
    }

    /// Overwrites only the fields present in `update`. Returns false for an unknown id.
    pub async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<bool> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(first_name) = &update.first_name {
            qb.push(", first_name = ").push_bind(first_name.clone());
        }
        if let Some(last_name) = &update.last_name {
            qb.push(", last_name = ").push_bind(last_name.clone());
        }
        if let Some(phone) = &update.phone {
            qb.push(", phone = ").push_bind(phone.clone());
        }
        qb.push(" WHERE id = ").push_bind(id);

        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }
}

#[derive(sqlx::FromRow)]
struct WishlistRow {
    id: i64,
    user_id: Option<i64>,
    session_id: Option<String>,
    product_id: i64,
    created_at: DateTime<Utc>,
    name: String,
    price_cents: i64,
    image_url: Option<String>,
    rating: f64,
    review_count: i64,
}

impl From<WishlistRow> for WishlistEntry {
    fn from(row: WishlistRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            session_id: row.session_id,
            product_id: row.product_id,
            created_at: row.created_at,
            name: row.name,
            price: Money::from_cents(row.price_cents),
            image_url: row.image_url,
            rating: row.rating,
            review_count: row.review_count,
        }
    }
}

fn push_identity(qb: &mut QueryBuilder<'_, Sqlite>, identity: &Identity, column_prefix: &str) {
    match identity {
        Identity::User(user_id) => {
            qb.push(format!("{column_prefix}user_id = ")).push_bind(*user_id);
        }
        Identity::Session(session_id) => {
            qb.push(format!("{column_prefix}user_id IS NULL AND {column_prefix}session_id = "))
                .push_bind(session_id.clone());
        }
    }
}

#[derive(Clone)]
pub struct WishlistStore {
    pool: SqlitePool,
}

impl WishlistStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(&self, identity: &Identity) -> Result<Vec<WishlistEntry>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT w.id, w.user_id, w.session_id, w.product_id, w.created_at, \
             p.name, p.price_cents, p.image_url, p.rating, p.review_count \
             FROM wishlist w JOIN products p ON w.product_id = p.id WHERE ",
        );
        push_identity(&mut qb, identity, "w.");
        qb.push(" ORDER BY w.created_at DESC, w.id DESC");

        let rows: Vec<WishlistRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(WishlistEntry::from).collect())
    }

    /// Adds `product_id` for `identity`. Unknown products are NotFound and a
    /// repeat add is a Conflict.
    pub async fn add(&self, identity: &Identity, product_id: i64) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let product: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if product.is_none() {
            return Err(StorefrontError::not_found(format!("Product {product_id} not found")));
        }

        let mut existing: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT id FROM wishlist WHERE ");
        push_identity(&mut existing, identity, "");
        existing.push(" AND product_id = ").push_bind(product_id);
        let duplicate: Option<i64> = existing.build_query_scalar().fetch_optional(&mut *tx).await?;
        if duplicate.is_some() {
            return Err(StorefrontError::conflict("Product already in wishlist"));
        }

        let (user_id, session_id) = match identity {
            Identity::User(id) => (Some(*id), None),
            Identity::Session(session) => (None, Some(session.as_str())),
        };
        let id = sqlx::query("INSERT INTO wishlist (user_id, session_id, product_id, created_at) VALUES (?, ?, ?, ?)")
            .bind(user_id)
            .bind(session_id)
            .bind(product_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await
            .map_err(|e| match StorefrontError::from(e) {
                StorefrontError::Conflict(_) => StorefrontError::conflict("Product already in wishlist"),
                other => other,
            })?
            .last_insert_rowid();

        tx.commit().await?;
        Ok(id)
    }

    /// Returns false when no entry has `id`.
    pub async fn remove(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM wishlist WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn remove_product(&self, identity: &Identity, product_id: i64) -> Result<u64> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM wishlist WHERE ");
        push_identity(&mut qb, identity, "");
        qb.push(" AND product_id = ").push_bind(product_id);
        Ok(qb.build().execute(&self.pool).await?.rows_affected())
    }
}

#[derive(sqlx::FromRow)]
struct SubscriberRow {
    id: i64,
    email: String,
    subscribed_at: DateTime<Utc>,
    is_active: bool,
}

impl From<SubscriberRow> for Subscriber {
    fn from(row: SubscriberRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            subscribed_at: row.subscribed_at,
            is_active: row.is_active,
        }
    }
}

#[derive(Clone)]
pub struct SubscriberStore {
    pool: SqlitePool,
}

impl SubscriberStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(&self, email: &str) -> Result<Option<Subscriber>> {
        let row = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, subscribed_at, is_active FROM newsletter_subscribers WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Subscriber::from))
    }

    pub async fn insert(&self, email: &str) -> Result<i64> {
        let result = sqlx::query("INSERT INTO newsletter_subscribers (email, subscribed_at, is_active) VALUES (?, ?, 1)")
            .bind(email)
            .bind(Utc::now())
            .execute(&self.pool)
            .await
            .map_err(|e| match StorefrontError::from(e) {
                StorefrontError::Conflict(_) => StorefrontError::conflict("Email already subscribed"),
                other => other,
            })?;
        Ok(result.last_insert_rowid())
    }

    pub async fn reactivate(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE newsletter_subscribers SET is_active = 1, subscribed_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn deactivate(&self, email: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE newsletter_subscribers SET is_active = 0 WHERE email = ?")
            .bind(email)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_active(&self) -> Result<Vec<Subscriber>> {
        let rows = sqlx::query_as::<_, SubscriberRow>(
            "SELECT id, email, subscribed_at, is_active FROM newsletter_subscribers \
             WHERE is_active = 1 ORDER BY subscribed_at DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Subscriber::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{connect_in_memory, seed_catalog};

    fn grace<'a>() -> NewUser<'a> {
        NewUser {
            email: "grace@example.com",
            password_hash: "hash",
            first_name: Some("Grace"),
            last_name: Some("Hopper"),
            phone: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let users = UserStore::new(connect_in_memory().await.unwrap());
        let id = users.create(&grace()).await.unwrap();
        let err = users.create(&grace()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));

        let (user, hash) = users.find_by_email("grace@example.com").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(hash, "hash");
    }

    #[tokio::test]
    async fn test_profile_update_is_partial() {
        let users = UserStore::new(connect_in_memory().await.unwrap());
        let id = users.create(&grace()).await.unwrap();
        let update = ProfileUpdate { phone: Some("555-0100".into()), ..Default::default() };

        assert!(users.update_profile(id, &update).await.unwrap());
        assert!(!users.update_profile(id + 1, &update).await.unwrap());

        let user = users.find(id).await.unwrap().unwrap();
        assert_eq!(user.first_name.as_deref(), Some("Grace"));
        assert_eq!(user.phone.as_deref(), Some("555-0100"));
    }

    #[tokio::test]
    async fn test_wishlist_per_identity() {
        let pool = connect_in_memory().await.unwrap();
        seed_catalog(&pool).await.unwrap();
        let wishlist = WishlistStore::new(pool);
        let session = Identity::Session("abc".into());
        let other = Identity::Session("xyz".into());

        wishlist.add(&session, 3).await.unwrap();
        wishlist.add(&other, 3).await.unwrap();
        let err = wishlist.add(&session, 3).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));
        let err = wishlist.add(&session, 999).await.unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));

        let entries = wishlist.list(&session).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "Summer Dress");

        assert_eq!(wishlist.remove_product(&session, 3).await.unwrap(), 1);
        assert!(wishlist.list(&session).await.unwrap().is_empty());
        assert_eq!(wishlist.list(&other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_subscriber_lifecycle() {
        let subscribers = SubscriberStore::new(connect_in_memory().await.unwrap());
        let id = subscribers.insert("a@example.com").await.unwrap();
        assert!(matches!(subscribers.insert("a@example.com").await, Err(StorefrontError::Conflict(_))));

        assert!(subscribers.deactivate("a@example.com").await.unwrap());
        assert!(subscribers.list_active().await.unwrap().is_empty());

        subscribers.reactivate(id).await.unwrap();
        let found = subscribers.find("a@example.com").await.unwrap().unwrap();
        assert!(found.is_active);
        assert_eq!(subscribers.list_active().await.unwrap().len(), 1);
    }
}
