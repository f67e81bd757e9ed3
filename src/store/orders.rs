//! Orders and their line items.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;

use crate::domain::aggregates::{NewOrder, Order, OrderItem, OrderStatus};
use crate::domain::value_objects::{Money, OrderNumber, OrderRef, PaymentMethod};
use crate::{Result, StorefrontError};

const ORDER_COLUMNS: &str = "id, user_id, order_number, email, first_name, last_name, address, city, state, \
     zip_code, phone, payment_method, subtotal_cents, shipping_cents, total_cents, status, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, price_cents, quantity, size, color, created_at";

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    user_id: Option<i64>,
    order_number: String,
    email: String,
    first_name: String,
    last_name: String,
    address: String,
    city: String,
    state: String,
    zip_code: String,
    phone: String,
    payment_method: String,
    subtotal_cents: i64,
    shipping_cents: i64,
    total_cents: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct OrderItemRow {
    id: i64,
    order_id: i64,
    product_id: Option<i64>,
    product_name: String,
    price_cents: i64,
    quantity: i64,
    size: Option<String>,
    color: Option<String>,
    created_at: DateTime<Utc>,
}

fn corrupt(what: &str, value: &str) -> StorefrontError {
    StorefrontError::Persistence(sqlx::Error::Decode(format!("unexpected {what} in store: {value}").into()))
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> Result<Order> {
        let payment_method = self.payment_method.parse::<PaymentMethod>().map_err(|_| corrupt("payment method", &self.payment_method))?;
        let status = self.status.parse::<OrderStatus>().map_err(|_| corrupt("order status", &self.status))?;
        Ok(Order {
            id: self.id,
            user_id: self.user_id,
            order_number: self.order_number,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            address: self.address,
            city: self.city,
            state: self.state,
            zip_code: self.zip_code,
            phone: self.phone,
            payment_method,
            subtotal: Money::from_cents(self.subtotal_cents),
            shipping: Money::from_cents(self.shipping_cents),
            total: Money::from_cents(self.total_cents),
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            items,
        })
    }
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        Self {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            product_name: row.product_name,
            price: Money::from_cents(row.price_cents),
            quantity: u32::try_from(row.quantity).unwrap_or_default(),
            size: row.size,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

/// Writes the header and every line item on `conn`. The caller owns the
/// transaction; nothing here commits.
pub async fn insert_order(conn: &mut SqliteConnection, number: &OrderNumber, order: &NewOrder) -> Result<i64> {
    let now = Utc::now();
    let contact = &order.contact;
    let (subtotal_cents, shipping_cents, total_cents) =
        (order.subtotal.cents()?, order.shipping.cents()?, order.total.cents()?);

    let header = sqlx::query(
        "INSERT INTO orders (user_id, order_number, email, first_name, last_name, address, city, state, zip_code, \
         phone, payment_method, subtotal_cents, shipping_cents, total_cents, status, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(order.user_id)
    .bind(number.as_str())
    .bind(&contact.email)
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(&contact.address)
    .bind(&contact.city)
    .bind(&contact.state)
    .bind(&contact.zip_code)
    .bind(&contact.phone)
    .bind(order.payment_method.as_str())
    .bind(subtotal_cents)
    .bind(shipping_cents)
    .bind(total_cents)
    .bind(OrderStatus::Processing.as_str())
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await
    .map_err(|e| match StorefrontError::from(e) {
        StorefrontError::Conflict(_) => StorefrontError::conflict(format!("Order number {number} already exists")),
        other => other,
    })?;
    let order_id = header.last_insert_rowid();

    for item in &order.items {
        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, product_name, price_cents, quantity, size, color, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(order_id)
        .bind(item.product_id)
        .bind(item.name.as_deref())
        .bind(item.price.cents()?)
        .bind(i64::from(item.quantity))
        .bind(item.size.as_deref())
        .bind(item.color.as_deref())
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(order_id)
}

#[derive(Clone)]
pub struct OrderStore {
    pool: SqlitePool,
}

impl OrderStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persists header and items in one transaction: all rows or none.
    pub async fn create(&self, number: &OrderNumber, order: &NewOrder) -> Result<i64> {
        let mut tx = self.pool.begin().await?;
        let order_id = insert_order(&mut tx, number, order).await?;
        tx.commit().await?;
        Ok(order_id)
    }

    pub async fn find(&self, order_ref: &OrderRef) -> Result<Option<Order>> {
        let row = match order_ref {
            OrderRef::Id(id) => {
                sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"))
                    .bind(*id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            OrderRef::Number(number) => {
                sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?"))
                    .bind(number)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match row {
            Some(row) => {
                let mut items = self.items_for(&[row.id]).await?;
                let items = items.remove(&row.id).unwrap_or_default();
                row.into_order(items).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Orders newest first, each with its items. No filter returns every order.
    pub async fn list(&self, user_id: Option<i64>, email: Option<&str>) -> Result<Vec<Order>> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders WHERE 1=1"));
        if let Some(user_id) = user_id {
            qb.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(email) = email {
            qb.push(" AND email = ").push_bind(email.to_string());
        }
        qb.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<OrderRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let mut items = self.items_for(&ids).await?;

        rows.into_iter()
            .map(|row| {
                let order_items = items.remove(&row.id).unwrap_or_default();
                row.into_order(order_items)
            })
            .collect()
    }

    async fn items_for(&self, order_ids: &[i64]) -> Result<HashMap<i64, Vec<OrderItem>>> {
        let mut grouped: HashMap<i64, Vec<OrderItem>> = HashMap::new();
        if order_ids.is_empty() {
            return Ok(grouped);
        }

        for chunk in order_ids.chunks(super::BIND_CHUNK) {
            let mut qb: QueryBuilder<Sqlite> =
                QueryBuilder::new(format!("SELECT {ITEM_COLUMNS} FROM order_items WHERE order_id IN ("));
            let mut separated = qb.separated(", ");
            for id in chunk {
                separated.push_bind(*id);
            }
            qb.push(") ORDER BY id ASC");

            let rows: Vec<OrderItemRow> = qb.build_query_as().fetch_all(&self.pool).await?;
            for row in rows {
                grouped.entry(row.order_id).or_default().push(OrderItem::from(row));
            }
        }
        Ok(grouped)
    }

    /// Unconditional status write. Returns false when no order has `id`.
    pub async fn set_status(&self, id: i64, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Writes `next` only while the order is still in `expected`.
    pub async fn compare_and_set_status(&self, id: i64, expected: OrderStatus, next: OrderStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE orders SET status = ?, updated_at = ? WHERE id = ? AND status = ?")
            .bind(next.as_str())
            .bind(Utc::now())
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
