//! Domain events handed to the notifier after a write commits.
use crate::domain::value_objects::Money;
use serde::Serialize;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced(OrderPlaced),
    OrderShipped(OrderShipped),
    NewsletterSubscribed { email: String },
}

impl DomainEvent {
    /// Stable name used for routing (e.g. message subjects).
    pub fn kind(&self) -> &'static str {
        match self {
            Self::OrderPlaced(_) => "order_placed",
            Self::OrderShipped(_) => "order_shipped",
            Self::NewsletterSubscribed { .. } => "newsletter_subscribed",
        }
    }

    pub fn recipient(&self) -> &str {
        match self {
            Self::OrderPlaced(e) => &e.email,
            Self::OrderShipped(e) => &e.email,
            Self::NewsletterSubscribed { email } => email,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderPlaced {
    pub email: String,
    pub order_number: String,
    pub first_name: String,
    pub items: Vec<PlacedItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlacedItem {
    pub name: String,
    pub quantity: u32,
    pub price: Money,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderShipped {
    pub email: String,
    pub order_number: String,
    pub tracking_number: Option<String>,
    pub carrier: Option<String>,
    pub estimated_delivery: Option<String>,
}
