//! Best-effort customer notifications.
//!
//! The order workflow and newsletter hand a [`DomainEvent`] to a [`Notifier`]
//! once their write has committed. Delivery runs on its own task through
//! [`dispatch`]; a failed delivery is logged and goes no further.

use async_trait::async_trait;
use std::fmt::Write as _;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::domain::events::DomainEvent;
use crate::{Result, StorefrontError};

/// Outcome reported by a notifier for one delivered event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub provider: &'static str,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    fn provider(&self) -> &'static str;

    async fn notify(&self, event: &DomainEvent) -> Result<Delivery>;
}

/// Rendered plain-text message for an event.
#[derive(Clone, Debug)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub text: String,
}

pub fn render(event: &DomainEvent, frontend_url: &str) -> Message {
    let (subject, text) = match event {
        DomainEvent::OrderPlaced(order) => {
            let mut text = format!("Hi {},\n\nThank you for your order!\n\nOrder #{}\n\n", order.first_name, order.order_number);
            for item in &order.items {
                let _ = writeln!(text, "{} - Qty: {} x {}", item.name, item.quantity, item.price);
            }
            let _ = write!(
                text,
                "\nSubtotal: {}\nShipping: {}\nTotal: {}\n\nYou can track your order at: {frontend_url}/orders.html\n",
                order.subtotal, order.shipping, order.total
            );
            (format!("Order Confirmation - {}", order.order_number), text)
        }
        DomainEvent::OrderShipped(shipped) => {
            let mut text = format!("Your Order Has Shipped!\n\nOrder #{} is on its way.\n\n", shipped.order_number);
            if let Some(carrier) = &shipped.carrier {
                let _ = writeln!(text, "Carrier: {carrier}");
            }
            if let Some(tracking) = &shipped.tracking_number {
                let _ = writeln!(text, "Tracking Number: {tracking}");
            }
            if let Some(eta) = &shipped.estimated_delivery {
                let _ = writeln!(text, "Estimated Delivery: {eta}");
            }
            let _ = write!(text, "\nTrack your order at: {frontend_url}/orders.html\n");
            (format!("Your Order {} Has Shipped!", shipped.order_number), text)
        }
        DomainEvent::NewsletterSubscribed { .. } => (
            "Welcome to the Storefront Newsletter!".to_string(),
            format!(
                "Thank you for subscribing to our newsletter!\n\n\
                 You'll receive updates about new arrivals, promotions and early access to sales.\n\n\
                 Start shopping: {frontend_url}/shop.html\n"
            ),
        ),
    };

    Message { to: event.recipient().to_string(), subject, text }
}

/// Development notifier: renders the message and writes it to the log.
pub struct LogNotifier {
    frontend_url: String,
}

impl LogNotifier {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self { frontend_url: frontend_url.into() }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn provider(&self) -> &'static str {
        "console"
    }

    async fn notify(&self, event: &DomainEvent) -> Result<Delivery> {
        let message = render(event, &self.frontend_url);
        tracing::info!(to = %message.to, subject = %message.subject, "📧 {}", message.text);
        Ok(Delivery { provider: self.provider() })
    }
}

/// Publishes each event as JSON on `<prefix>.<event kind>` for a downstream
/// mailer to pick up.
pub struct NatsNotifier {
    client: async_nats::Client,
    subject_prefix: String,
}

impl NatsNotifier {
    pub async fn connect(url: &str, subject_prefix: impl Into<String>) -> Result<Self> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| StorefrontError::Notification(format!("NATS connect to {url} failed: {e}")))?;
        Ok(Self { client, subject_prefix: subject_prefix.into() })
    }

    pub fn subject(&self, event: &DomainEvent) -> String {
        format!("{}.{}", self.subject_prefix, event.kind())
    }
}

#[async_trait]
impl Notifier for NatsNotifier {
    fn provider(&self) -> &'static str {
        "nats"
    }

    async fn notify(&self, event: &DomainEvent) -> Result<Delivery> {
        let payload = serde_json::to_vec(event).map_err(|e| StorefrontError::Notification(e.to_string()))?;
        self.client
            .publish(self.subject(event), payload.into())
            .await
            .map_err(|e| StorefrontError::Notification(e.to_string()))?;
        Ok(Delivery { provider: self.provider() })
    }
}

/// Delivers `event` on a spawned task. Failures are logged at warn and never
/// reach the caller.
pub fn dispatch(notifier: Arc<dyn Notifier>, event: DomainEvent) -> JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&event).await {
            Ok(delivery) => {
                tracing::debug!(kind = event.kind(), provider = delivery.provider, "Notification delivered")
            }
            Err(e) => tracing::warn!(kind = event.kind(), provider = notifier.provider(), error = %e, "Notification failed"),
        }
    })
}
