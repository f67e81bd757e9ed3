//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::domain::value_objects::Money;

/// Sizes and colors the seeded catalog ships with.
pub const DEFAULT_SIZES: [&str; 5] = ["0-6M", "6-12M", "1-2Y", "2-4Y", "4-6Y"];
pub const DEFAULT_COLORS: [&str; 5] = ["Beige", "Navy", "White", "Pink", "Gray"];

#[derive(Clone, Debug, Serialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    pub category: String,
    pub image_url: Option<String>,
    /// Mean of all review ratings; 0 when unreviewed.
    pub rating: f64,
    pub review_count: i64,
    pub stock: i64,
    pub sizes: Vec<String>,
    pub colors: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    pub image_url: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i64>,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub colors: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Review {
    pub id: i64,
    pub product_id: i64,
    pub user_id: Option<i64>,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Review score, an integer in 1..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rating(u8);

impl Rating {
    pub fn new(value: i64) -> Result<Self, ProductError> {
        u8::try_from(value)
            .ok()
            .filter(|v| (1..=5).contains(v))
            .map(Self)
            .ok_or(ProductError::InvalidRating)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProductSort {
    #[default]
    Featured,
    PriceLow,
    PriceHigh,
    Newest,
    Rating,
}

impl ProductSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            Self::Featured => "id ASC",
            Self::PriceLow => "price_cents ASC, id ASC",
            Self::PriceHigh => "price_cents DESC, id ASC",
            Self::Newest => "created_at DESC, id DESC",
            Self::Rating => "rating DESC, id ASC",
        }
    }
}

/// Unknown sort keys fall back to `Featured`.
impl FromStr for ProductSort {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "price-low" => Self::PriceLow,
            "price-high" => Self::PriceHigh,
            "newest" => Self::Newest,
            "rating" => Self::Rating,
            _ => Self::Featured,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProductError {
    #[error("Rating must be between 1 and 5")]
    InvalidRating,
    #[error("Invalid price: must be greater than zero")]
    InvalidPrice,
}

impl NewProduct {
    pub fn check(&self) -> Result<(), ProductError> {
        if self.price.is_positive() {
            Ok(())
        } else {
            Err(ProductError::InvalidPrice)
        }
    }
}

/// Splits the comma-separated list form used in storage.
pub fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| s.split(',').map(str::trim).filter(|v| !v.is_empty()).map(String::from).collect())
        .unwrap_or_default()
}

pub fn join_list(values: &[String]) -> Option<String> {
    if values.is_empty() {
        None
    } else {
        Some(values.join(","))
    }
}
