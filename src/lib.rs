//! Storefront API
//!
//! Backend for a small clothing storefront.
//!
//! ## Features
//! - Product catalog with filtering, sorting, pagination and reviews
//! - Checkout: atomic order + line item persistence with unique order numbers
//! - Order tracking and status lifecycle
//! - Customer accounts, wishlists and newsletter subscriptions
//! - Pluggable notification and payment gateway adapters

pub mod api;
pub mod config;
pub mod domain;
pub mod services;
pub mod store;

use axum::http::StatusCode;
use thiserror::Error;

pub use config::AppConfig;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Storage error: {0}")]
    Persistence(#[source] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Notification failed: {0}")]
    Notification(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorefrontError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Persistence(_) | Self::Migration(_) | Self::Notification(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to hand back to a client. Store failures are reduced to a
    /// generic message; the underlying error is logged by the API layer.
    pub fn public_message(&self) -> String {
        match self {
            Self::Persistence(_) | Self::Migration(_) => "Internal storage error".to_string(),
            Self::Notification(_) => "Notification delivery failed".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

/// Constraint violations are classified so callers see a 409 or 400 instead
/// of a raw storage failure.
impl From<sqlx::Error> for StorefrontError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind;

        if let sqlx::Error::Database(db_err) = &err {
            match db_err.kind() {
                ErrorKind::UniqueViolation => {
                    return Self::Conflict("Record already exists".to_string())
                }
                ErrorKind::ForeignKeyViolation => {
                    return Self::Validation("Referenced record does not exist".to_string())
                }
                ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                    return Self::Validation(format!("Invalid record: {}", db_err.message()))
                }
                _ => {}
            }
        }
        Self::Persistence(err)
    }
}

impl From<domain::aggregates::OrderError> for StorefrontError {
    fn from(err: domain::aggregates::OrderError) -> Self {
        use domain::aggregates::OrderError;

        match err {
            OrderError::IllegalTransition { .. } => Self::Conflict(err.to_string()),
            other => Self::Validation(other.to_string()),
        }
    }
}

impl From<domain::aggregates::ProductError> for StorefrontError {
    fn from(err: domain::aggregates::ProductError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<domain::value_objects::MoneyError> for StorefrontError {
    fn from(err: domain::value_objects::MoneyError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<validator::ValidationErrors> for StorefrontError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<&str> = errors.field_errors().into_keys().collect();
        fields.sort_unstable();
        Self::Validation(format!("Invalid field(s): {}", fields.join(", ")))
    }
}

pub type Result<T> = std::result::Result<T, StorefrontError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(StorefrontError::validation("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(StorefrontError::not_found("x").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(StorefrontError::conflict("x").status_code(), StatusCode::CONFLICT);
        assert_eq!(
            StorefrontError::Persistence(sqlx::Error::RowNotFound).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_order_errors_classified() {
        use crate::domain::aggregates::{OrderError, OrderStatus};

        let err = StorefrontError::from(OrderError::NoItems);
        assert!(matches!(err, StorefrontError::Validation(ref m) if m == "Order must contain at least one item"));
        let err = StorefrontError::from(OrderError::IllegalTransition {
            from: OrderStatus::Delivered,
            to: OrderStatus::Cancelled,
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_persistence_message_is_generic() {
        let err = StorefrontError::Persistence(sqlx::Error::PoolTimedOut);
        assert_eq!(err.public_message(), "Internal storage error");
        let err = StorefrontError::Internal("argon2 params".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(StorefrontError::validation("Missing required fields").public_message(), "Missing required fields");
    }
}
