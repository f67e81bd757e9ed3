//! Payment gateway capability. Only the mock adapter ships; a vendor adapter
//! implements the same trait.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::value_objects::{Money, PaymentMethod};
use crate::{Result, StorefrontError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    RequiresConfirmation,
    /// Collected later, e.g. cash on delivery.
    Pending,
    Succeeded,
}

#[derive(Clone, Debug, Serialize)]
pub struct PaymentIntent {
    pub id: String,
    pub method: PaymentMethod,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    async fn create_intent(&self, amount: Money, currency: &str, method: PaymentMethod) -> Result<PaymentIntent>;

    async fn confirm(&self, method: PaymentMethod, intent_id: &str) -> Result<PaymentIntent>;
}

/// In-memory gateway for development and tests. Card and PayPal intents
/// confirm immediately; cash-on-delivery intents stay pending.
#[derive(Default)]
pub struct MockPaymentGateway {
    intents: RwLock<HashMap<String, PaymentIntent>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_prefix(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Card => "pi_mock_",
        PaymentMethod::Paypal => "PAYPAL_MOCK_",
        PaymentMethod::CashOnDelivery => "COD_",
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_intent(&self, amount: Money, currency: &str, method: PaymentMethod) -> Result<PaymentIntent> {
        if !amount.is_positive() {
            return Err(StorefrontError::validation("Invalid amount"));
        }

        let id = format!("{}{}", id_prefix(method), Uuid::new_v4().simple());
        let (status, client_secret) = match method {
            PaymentMethod::CashOnDelivery => (PaymentStatus::Pending, None),
            _ => (PaymentStatus::RequiresConfirmation, Some(format!("{id}_secret"))),
        };
        let intent = PaymentIntent {
            id: id.clone(),
            method,
            amount,
            currency: currency.to_ascii_lowercase(),
            status,
            client_secret,
        };

        self.intents.write().await.insert(id, intent.clone());
        tracing::debug!(intent_id = %intent.id, %method, "Created mock payment intent");
        Ok(intent)
    }

    async fn confirm(&self, method: PaymentMethod, intent_id: &str) -> Result<PaymentIntent> {
        let mut intents = self.intents.write().await;
        let intent = intents
            .get_mut(intent_id)
            .filter(|intent| intent.method == method)
            .ok_or_else(|| StorefrontError::not_found(format!("Payment intent {intent_id} not found")))?;

        if intent.status == PaymentStatus::RequiresConfirmation {
            intent.status = PaymentStatus::Succeeded;
        }
        intent.client_secret = None;
        Ok(intent.clone())
    }
}
