//! Catalog queries and reviews.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use validator::Validate;

use crate::domain::aggregates::{NewProduct, Product, ProductSort, Rating, Review};
use crate::domain::value_objects::Money;
use crate::store::catalog::ProductFilter;
use crate::store::CatalogStore;
use crate::{Result, StorefrontError};

pub const DEFAULT_PAGE_SIZE: u32 = 12;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Raw listing options as they arrive on the query string.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<String>,
    #[serde(rename = "minPrice", alias = "min_price")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice", alias = "max_price")]
    pub max_price: Option<String>,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl Pagination {
    pub fn new(page: u32, limit: u32, total: i64) -> Self {
        let limit_i = i64::from(limit.max(1));
        Self { page, limit, total, total_pages: (total + limit_i - 1) / limit_i }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReviewRequest {
    pub user_id: Option<i64>,
    pub rating: Option<i64>,
    pub comment: Option<String>,
}

fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_param<T: FromStr>(name: &str, raw: &Option<String>) -> Result<Option<T>> {
    present(raw)
        .map(|v| v.parse::<T>().map_err(|_| StorefrontError::validation(format!("Invalid {name}: {v}"))))
        .transpose()
}

impl ProductQuery {
    /// Filter plus the clamped page and page size.
    pub fn resolve(&self) -> Result<(ProductFilter, u32, u32)> {
        let filter = ProductFilter {
            category: present(&self.category).filter(|c| *c != "all").map(String::from),
            min_price: parse_param::<Money>("minPrice", &self.min_price)?,
            max_price: parse_param::<Money>("maxPrice", &self.max_price)?,
            search: present(&self.search).map(String::from),
            sort: present(&self.sort).map(|s| s.parse::<ProductSort>().unwrap_or_default()).unwrap_or_default(),
        };

        let page = parse_param::<i64>("page", &self.page)?.unwrap_or(1).max(1);
        let limit = parse_param::<i64>("limit", &self.limit)?
            .unwrap_or(i64::from(DEFAULT_PAGE_SIZE))
            .clamp(1, i64::from(MAX_PAGE_SIZE));

        Ok((filter, u32::try_from(page).unwrap_or(u32::MAX), u32::try_from(limit).unwrap_or(DEFAULT_PAGE_SIZE)))
    }
}

#[derive(Clone)]
pub struct CatalogService {
    store: CatalogStore,
}

impl CatalogService {
    pub fn new(store: CatalogStore) -> Self {
        Self { store }
    }

    pub async fn list_products(&self, query: &ProductQuery) -> Result<(Vec<Product>, Pagination)> {
        let (filter, page, limit) = query.resolve()?;
        let (products, total) = self.store.list(&filter, page, limit).await?;
        Ok((products, Pagination::new(page, limit, total)))
    }

    pub async fn get_product(&self, id: i64) -> Result<Product> {
        self.store
            .find(id)
            .await?
            .ok_or_else(|| StorefrontError::not_found("Product not found"))
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product> {
        product.validate()?;
        product.check()?;
        let created = self.store.create(&product).await?;
        tracing::info!(product_id = created.id, name = %created.name, "Product created");
        Ok(created)
    }

    pub async fn categories(&self) -> Result<Vec<String>> {
        self.store.categories().await
    }

    pub async fn reviews(&self, product_id: i64) -> Result<Vec<Review>> {
        self.store.reviews(product_id).await
    }

    pub async fn add_review(&self, product_id: i64, request: ReviewRequest) -> Result<i64> {
        let rating = request.rating.map(Rating::new).transpose()?.ok_or_else(|| {
            StorefrontError::validation("Rating must be between 1 and 5")
        })?;
        let comment = request.comment.as_deref().map(str::trim).filter(|c| !c.is_empty());
        let review_id = self.store.add_review(product_id, rating, comment, request.user_id).await?;
        tracing::info!(product_id, review_id, rating = rating.value(), "Review added");
        Ok(review_id)
    }
}
