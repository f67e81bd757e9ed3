//! Customer-side records: accounts, wishlists, newsletter subscriptions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::value_objects::Money;

#[derive(Clone, Debug, Serialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct Registration {
    #[validate(email)]
    pub email: Option<String>,
    pub password: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

/// Who a wishlist belongs to: a signed-in user, else an anonymous session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
    User(i64),
    Session(String),
}

impl Identity {
    /// The user id wins when both are present.
    pub fn from_parts(user_id: Option<i64>, session_id: Option<String>) -> Option<Self> {
        match (user_id, session_id.filter(|s| !s.trim().is_empty())) {
            (Some(id), _) => Some(Self::User(id)),
            (None, Some(session)) => Some(Self::Session(session)),
            (None, None) => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WishlistEntry {
    pub id: i64,
    pub user_id: Option<i64>,
    pub session_id: Option<String>,
    pub product_id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub price: Money,
    pub image_url: Option<String>,
    pub rating: f64,
    pub review_count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
    pub is_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_prefers_user() {
        assert_eq!(Identity::from_parts(Some(7), Some("s1".into())), Some(Identity::User(7)));
        assert_eq!(Identity::from_parts(None, Some("s1".into())), Some(Identity::Session("s1".into())));
        assert_eq!(Identity::from_parts(None, Some("  ".into())), None);
        assert_eq!(Identity::from_parts(None, None), None);
    }
}
