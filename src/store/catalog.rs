//! Products and reviews.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use std::collections::HashMap;

use crate::domain::aggregates::product::{join_list, split_list};
use crate::domain::aggregates::{NewProduct, Product, ProductSort, Rating, Review};
use crate::domain::value_objects::Money;
use crate::{Result, StorefrontError};

const PRODUCT_COLUMNS: &str = "id, name, description, price_cents, category, image_url, rating, review_count, \
     stock, sizes, colors, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    description: Option<String>,
    price_cents: i64,
    category: String,
    image_url: Option<String>,
    rating: f64,
    review_count: i64,
    stock: i64,
    sizes: Option<String>,
    colors: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: Money::from_cents(row.price_cents),
            category: row.category,
            image_url: row.image_url,
            rating: row.rating,
            review_count: row.review_count,
            stock: row.stock,
            sizes: split_list(row.sizes.as_deref()),
            colors: split_list(row.colors.as_deref()),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: i64,
    product_id: i64,
    user_id: Option<i64>,
    rating: i64,
    comment: Option<String>,
    created_at: DateTime<Utc>,
    first_name: Option<String>,
    last_name: Option<String>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            rating: row.rating,
            comment: row.comment,
            created_at: row.created_at,
            first_name: row.first_name,
            last_name: row.last_name,
        }
    }
}

/// Narrowing applied before sorting and paging.
#[derive(Clone, Debug, Default)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub min_price: Option<Money>,
    pub max_price: Option<Money>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

/// Escapes LIKE wildcards so a search term only ever matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) -> Result<()> {
    qb.push(" WHERE 1=1");
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND price_cents >= ").push_bind(min.cents()?);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND price_cents <= ").push_bind(max.cents()?);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(name) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'");
        qb.push(" OR LOWER(COALESCE(description, '')) LIKE ").push_bind(pattern.clone()).push(" ESCAPE '\\'");
        qb.push(" OR LOWER(category) LIKE ").push_bind(pattern).push(" ESCAPE '\\')");
    }
    Ok(())
}

#[derive(Clone)]
pub struct CatalogStore {
    pool: SqlitePool,
}

impl CatalogStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of matching products plus the size of the whole filtered set.
    pub async fn list(&self, filter: &ProductFilter, page: u32, limit: u32) -> Result<(Vec<Product>, i64)> {
        let mut count_qb: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT COUNT(*) FROM products");
        push_filters(&mut count_qb, filter)?;
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_filters(&mut qb, filter)?;
        qb.push(" ORDER BY ").push(filter.sort.order_by());
        qb.push(" LIMIT ").push_bind(i64::from(limit));
        qb.push(" OFFSET ").push_bind(offset);

        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    pub async fn find(&self, id: i64) -> Result<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// Products keyed by id. Ids with no product are simply absent.
    pub async fn find_many(&self, ids: &[i64]) -> Result<HashMap<i64, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut found = HashMap::with_capacity(ids.len());
        for chunk in ids.chunks(super::BIND_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            qb.push(")");

            let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&self.pool).await?;
            found.extend(rows.into_iter().map(|row| (row.id, Product::from(row))));
        }
        Ok(found)
    }

    pub async fn create(&self, product: &NewProduct) -> Result<Product> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO products (name, description, price_cents, category, image_url, stock, sizes, colors, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&product.name)
        .bind(product.description.as_deref())
        .bind(product.price.cents()?)
        .bind(&product.category)
        .bind(product.image_url.as_deref())
        .bind(product.stock.unwrap_or(0))
        .bind(join_list(&product.sizes))
        .bind(join_list(&product.colors))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.find(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found(format!("Product {id} not found")))
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar("SELECT DISTINCT category FROM products ORDER BY category")
            .fetch_all(&self.pool)
            .await?;
        Ok(categories)
    }

    /// Reviews for a product, newest first, with the reviewer's name when known.
    pub async fn reviews(&self, product_id: i64) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>(
            "SELECT r.id, r.product_id, r.user_id, r.rating, r.comment, r.created_at, u.first_name, u.last_name \
             FROM reviews r LEFT JOIN users u ON r.user_id = u.id \
             WHERE r.product_id = ? ORDER BY r.created_at DESC, r.id DESC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Review::from).collect())
    }

    /// Inserts the review and recomputes the product's rating and review
    /// count in the same transaction.
    pub async fn add_review(
        &self,
        product_id: i64,
        rating: Rating,
        comment: Option<&str>,
        user_id: Option<i64>,
    ) -> Result<i64> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Err(StorefrontError::not_found(format!("Product {product_id} not found")));
        }

        let now = Utc::now();
        let review_id = sqlx::query(
            "INSERT INTO reviews (product_id, user_id, rating, comment, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(product_id)
        .bind(user_id)
        .bind(i64::from(rating.value()))
        .bind(comment)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        sqlx::query(
            "UPDATE products SET \
             rating = (SELECT COALESCE(AVG(rating), 0) FROM reviews WHERE product_id = ?1), \
             review_count = (SELECT COUNT(*) FROM reviews WHERE product_id = ?1), \
             updated_at = ?2 \
             WHERE id = ?1",
        )
        .bind(product_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(review_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{connect_in_memory, seed_catalog};

    async fn seeded() -> CatalogStore {
        let pool = connect_in_memory().await.unwrap();
        seed_catalog(&pool).await.unwrap();
        CatalogStore::new(pool)
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Tee"), "%tee%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[tokio::test]
    async fn test_second_page() {
        let store = seeded().await;
        let (items, total) = store.list(&ProductFilter::default(), 2, 12).await.unwrap();
        assert_eq!(total, 24);
        assert_eq!(items.len(), 12);
        assert_eq!(items.first().unwrap().id, 13);
        assert_eq!(items.last().unwrap().id, 24);
    }

    #[tokio::test]
    async fn test_filters_combine() {
        let store = seeded().await;
        let filter = ProductFilter {
            category: Some("dresses".into()),
            min_price: Some(Money::from_cents(3500)),
            max_price: Some(Money::from_cents(4599)),
            sort: ProductSort::PriceLow,
            ..Default::default()
        };
        let (items, total) = store.list(&filter, 1, 12).await.unwrap();
        let names: Vec<&str> = items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Flower Print Dress", "Tutu Dress", "Party Dress"]);
        assert_eq!(total, 3);
    }

    #[tokio::test]
    async fn test_search_matches_any_field() {
        let store = seeded().await;
        let by_name = ProductFilter { search: Some("HOODIE".into()), ..Default::default() };
        assert_eq!(store.list(&by_name, 1, 12).await.unwrap().1, 1);

        let by_category = ProductFilter { search: Some("bottoms".into()), ..Default::default() };
        assert_eq!(store.list(&by_category, 1, 50).await.unwrap().1, 6);

        let wildcard = ProductFilter { search: Some("%".into()), ..Default::default() };
        assert_eq!(store.list(&wildcard, 1, 50).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_review_recomputes_rating() {
        let store = seeded().await;
        store.add_review(1, Rating::new(5).unwrap(), Some("Great"), None).await.unwrap();
        let product = store.find(1).await.unwrap().unwrap();
        assert_eq!(product.rating, 5.0);
        assert_eq!(product.review_count, 1);

        store.add_review(1, Rating::new(3).unwrap(), None, None).await.unwrap();
        let product = store.find(1).await.unwrap().unwrap();
        assert_eq!(product.rating, 4.0);
        assert_eq!(product.review_count, 2);

        let reviews = store.reviews(1).await.unwrap();
        assert_eq!(reviews.iter().map(|r| r.rating).collect::<Vec<_>>(), vec![3, 5]);
    }

    #[tokio::test]
    async fn test_review_unknown_product() {
        let store = seeded().await;
        let err = store.add_review(999, Rating::new(4).unwrap(), None, None).await.unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reviews").fetch_one(&store.pool).await.unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_find_many_skips_unknown() {
        let store = seeded().await;
        let found = store.find_many(&[2, 3, 999]).await.unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&2].price, Money::from_cents(1999));
    }

    #[tokio::test]
    async fn test_find_many_beyond_bind_limit() {
        let store = seeded().await;
        let ids: Vec<i64> = (1..=40_000).collect();
        let found = store.find_many(&ids).await.unwrap();
        assert_eq!(found.len(), 24);
        assert_eq!(found[&24].id, 24);
    }
}
