//! SQLite persistence. Every store takes the pool it works on; nothing here
//! holds a process-wide connection.

pub mod catalog;
pub mod customers;
pub mod orders;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::aggregates::product::{DEFAULT_COLORS, DEFAULT_SIZES};
use crate::{Result, StorefrontError};

pub use catalog::{CatalogStore, ProductFilter};
pub use customers::{NewUser, SubscriberStore, UserStore, WishlistStore};
pub use orders::OrderStore;

/// Upper bound on ids bound into a single `IN (...)` list, well under
/// SQLite's host parameter limit.
const BIND_CHUNK: usize = 500;

/// Opens a pool on `url`, creating the database file if needed, with
/// foreign key enforcement switched on for every connection.
pub async fn connect(url: &str, max_connections: u32) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(url)
        .map_err(StorefrontError::Persistence)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await
        .map_err(StorefrontError::Persistence)
}

/// Single-connection in-memory database. The connection is never recycled,
/// so the data lives as long as the pool.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(StorefrontError::Persistence)?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None::<Duration>)
        .max_lifetime(None::<Duration>)
        .connect_with(options)
        .await
        .map_err(StorefrontError::Persistence)?;
    migrate(&pool).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

struct SeedProduct {
    name: &'static str,
    price_cents: i64,
    category: &'static str,
    stock: i64,
    description: &'static str,
}

const fn seed(name: &'static str, price_cents: i64, category: &'static str, stock: i64, description: &'static str) -> SeedProduct {
    SeedProduct { name, price_cents, category, stock, description }
}

const SEED_PRODUCTS: [SeedProduct; 24] = [
    seed("Organic Cotton T-Shirt", 2499, "tops", 50, "Soft organic cotton t-shirt for everyday comfort"),
    seed("Comfortable Shorts", 1999, "bottoms", 40, "Breathable shorts perfect for active kids"),
    seed("Summer Dress", 3499, "dresses", 30, "Light and airy summer dress"),
    seed("Cozy Romper", 2999, "new", 25, "One-piece romper for easy wear"),
    seed("Striped Polo Shirt", 2699, "tops", 35, "Classic polo with modern stripes"),
    seed("Denim Jeans", 3299, "bottoms", 45, "Durable denim for everyday adventures"),
    seed("Flower Print Dress", 3899, "dresses", 20, "Beautiful floral pattern dress"),
    seed("Cozy Hoodie", 4299, "new", 30, "Warm and comfortable hoodie"),
    seed("Basic Tee Pack (3)", 3999, "tops", 60, "Value pack of 3 essential tees"),
    seed("Cargo Pants", 2999, "bottoms", 35, "Practical cargo pants with pockets"),
    seed("Party Dress", 4599, "dresses", 15, "Special occasion party dress"),
    seed("Sleep Set", 3599, "new", 40, "Comfortable sleepwear set"),
    seed("Graphic Tee", 2299, "tops", 50, "Fun graphic print t-shirt"),
    seed("Swim Shorts", 2499, "bottoms", 30, "Quick-dry swim shorts"),
    seed("Casual Dress", 3199, "dresses", 25, "Versatile casual dress"),
    seed("Winter Jacket", 5499, "new", 20, "Warm winter jacket"),
    seed("Long Sleeve Shirt", 2899, "tops", 40, "Classic long sleeve shirt"),
    seed("Leggings", 1899, "bottoms", 55, "Stretchy comfortable leggings"),
    seed("Tutu Dress", 4299, "dresses", 18, "Adorable tutu-style dress"),
    seed("Overalls", 3999, "new", 25, "Classic denim overalls"),
    seed("Tank Top", 1699, "tops", 45, "Cool tank top for summer"),
    seed("Joggers", 2699, "bottoms", 40, "Comfortable jogger pants"),
    seed("Maxi Dress", 4899, "dresses", 15, "Elegant maxi dress"),
    seed("Sweater Set", 4499, "new", 22, "Cozy sweater and pants set"),
];

/// Inserts the demo catalog when the products table is empty. Returns the
/// number of products inserted.
pub async fn seed_catalog(pool: &SqlitePool) -> Result<usize> {
    let mut tx = pool.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&mut *tx).await?;
    if existing > 0 {
        tracing::info!(existing, "Products already exist, skipping seed");
        return Ok(0);
    }

    let sizes = DEFAULT_SIZES.join(",");
    let colors = DEFAULT_COLORS.join(",");
    let now = Utc::now();
    for (index, p) in SEED_PRODUCTS.iter().enumerate() {
        sqlx::query(
            "INSERT INTO products (name, description, price_cents, category, image_url, stock, sizes, colors, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(p.name)
        .bind(p.description)
        .bind(p.price_cents)
        .bind(p.category)
        .bind(format!("/images/products/{}.jpg", index + 1))
        .bind(p.stock)
        .bind(&sizes)
        .bind(&colors)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::info!(count = SEED_PRODUCTS.len(), "Seeded catalog");
    Ok(SEED_PRODUCTS.len())
}
