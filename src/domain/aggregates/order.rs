//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::domain::events::{OrderPlaced, PlacedItem};
use crate::domain::value_objects::{Money, MoneyError, OrderNumber, PaymentMethod};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[default]
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 4] = [Self::Processing, Self::Shipped, Self::Delivered, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Forward-only lifecycle: Processing -> Shipped -> Delivered, with
    /// Cancelled reachable from Processing or Shipped.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::Delivered)
                | (Self::Processing | Self::Shipped, Self::Cancelled)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::InvalidStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Missing required fields")]
    MissingFields,
    #[error("Order must contain at least one item")]
    NoItems,
    #[error("Invalid status: {0}")]
    InvalidStatus(String),
    #[error("Item {index}: {reason}")]
    InvalidItem { index: usize, reason: String },
    #[error("Invalid field(s): {0}")]
    InvalidFields(String),
    #[error("Unsupported payment method: {0}")]
    InvalidPaymentMethod(String),
    #[error("{0}")]
    TotalMismatch(String),
    #[error(transparent)]
    Amount(#[from] MoneyError),
    #[error("Cannot change order status from {from} to {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkout payload as submitted by the browser. Everything is optional at
/// the wire level so missing fields surface as a validation failure rather
/// than a body rejection.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub user_id: Option<i64>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[validate(length(max = 255))]
    pub address: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub state: Option<String>,
    #[validate(length(max = 20))]
    pub zip_code: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    pub payment_method: Option<String>,
    #[serde(default)]
    pub items: Vec<CheckoutItem>,
    pub subtotal: Option<Money>,
    pub shipping: Option<Money>,
    pub total: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutItem {
    #[serde(alias = "id")]
    pub product_id: Option<i64>,
    #[serde(alias = "product_name")]
    pub name: Option<String>,
    pub price: Money,
    pub quantity: i64,
    pub size: Option<String>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
}

/// A checkout that passed field validation and is ready to persist.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Option<i64>,
    pub contact: Contact,
    pub payment_method: PaymentMethod,
    pub items: Vec<NewOrderItem>,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Option<i64>,
    pub name: Option<String>,
    pub price: Money,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
}

/// Trims the value and drops it when nothing is left.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl TryFrom<CheckoutRequest> for NewOrder {
    type Error = OrderError;

    fn try_from(req: CheckoutRequest) -> Result<Self, Self::Error> {
        let contact = match (
            non_blank(req.email.clone()),
            non_blank(req.first_name.clone()),
            non_blank(req.last_name.clone()),
            non_blank(req.address.clone()),
            non_blank(req.city.clone()),
            non_blank(req.state.clone()),
            non_blank(req.zip_code.clone()),
            non_blank(req.phone.clone()),
        ) {
            (Some(email), Some(first_name), Some(last_name), Some(address), Some(city), Some(state), Some(zip_code), Some(phone)) => {
                Contact { email, first_name, last_name, address, city, state, zip_code, phone }
            }
            _ => return Err(OrderError::MissingFields),
        };

        if req.items.is_empty() {
            return Err(OrderError::NoItems);
        }

        let payment_method = non_blank(req.payment_method.clone()).ok_or(OrderError::MissingFields)?;
        let (subtotal, shipping, total) = match (req.subtotal, req.shipping, req.total) {
            (Some(subtotal), Some(shipping), Some(total)) => (subtotal, shipping, total),
            _ => return Err(OrderError::MissingFields),
        };

        if let Err(errors) = req.validate() {
            let mut fields: Vec<&str> = errors.field_errors().into_keys().collect();
            fields.sort_unstable();
            return Err(OrderError::InvalidFields(fields.join(", ")));
        }

        let payment_method = payment_method
            .parse::<PaymentMethod>()
            .map_err(|_| OrderError::InvalidPaymentMethod(payment_method.trim().to_string()))?;

        let items = req
            .items
            .into_iter()
            .enumerate()
            .map(|(index, item)| NewOrderItem::try_from_checkout(index, item))
            .collect::<Result<Vec<_>, _>>()?;

        let order = NewOrder { user_id: req.user_id, contact, payment_method, items, subtotal, shipping, total };
        order.check_totals()?;
        Ok(order)
    }
}

impl NewOrderItem {
    fn try_from_checkout(index: usize, item: CheckoutItem) -> Result<Self, OrderError> {
        let invalid = |reason: &str| OrderError::InvalidItem { index, reason: reason.to_string() };

        let quantity = u32::try_from(item.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| invalid("quantity must be a positive integer"))?;
        if item.price.is_negative() {
            return Err(invalid("price must not be negative"));
        }
        let name = non_blank(item.name);
        if name.is_none() && item.product_id.is_none() {
            return Err(invalid("a product name or product_id is required"));
        }

        Ok(Self {
            product_id: item.product_id,
            name,
            price: item.price,
            quantity,
            size: non_blank(item.size),
            color: non_blank(item.color),
        })
    }

    pub fn line_total(&self) -> Result<Money, MoneyError> {
        self.price.checked_mul(self.quantity)
    }
}

impl NewOrder {
    /// `subtotal` must equal the sum of line totals and `total` must equal
    /// `subtotal + shipping`, both to the cent.
    pub fn check_totals(&self) -> Result<(), OrderError> {
        if self.shipping.is_negative() {
            return Err(OrderError::TotalMismatch("Shipping must not be negative".to_string()));
        }
        let line_totals = self.items.iter().map(NewOrderItem::line_total).collect::<Result<Vec<_>, _>>()?;
        let computed = Money::checked_sum(line_totals)?;
        if !computed.matches(&self.subtotal) {
            return Err(OrderError::TotalMismatch(format!(
                "Subtotal {} does not match line items ({})",
                self.subtotal, computed
            )));
        }
        let expected = self.subtotal.checked_add(self.shipping)?;
        if !expected.matches(&self.total) {
            return Err(OrderError::TotalMismatch(format!(
                "Total {} does not equal subtotal plus shipping ({})",
                self.total, expected
            )));
        }
        Ok(())
    }

    pub fn placed_event(&self, order_number: &OrderNumber) -> OrderPlaced {
        OrderPlaced {
            email: self.contact.email.clone(),
            order_number: order_number.to_string(),
            first_name: self.contact.first_name.clone(),
            items: self
                .items
                .iter()
                .map(|i| PlacedItem {
                    name: i.name.clone().unwrap_or_default(),
                    quantity: i.quantity,
                    price: i.price,
                })
                .collect(),
            subtotal: self.subtotal,
            shipping: self.shipping,
            total: self.total,
        }
    }
}

/// Persisted order header with its line items.
#[derive(Clone, Debug, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub order_number: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub subtotal: Money,
    pub shipping: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: Option<i64>,
    pub product_name: String,
    pub price: Money,
    pub quantity: u32,
    pub size: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
}
