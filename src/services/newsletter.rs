//! Newsletter subscriptions.

use serde::Deserialize;
use std::sync::Arc;
use validator::validate_email;

use crate::domain::aggregates::Subscriber;
use crate::domain::events::DomainEvent;
use crate::services::notifier::{self, Notifier};
use crate::store::SubscriberStore;
use crate::{Result, StorefrontError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubscriptionRequest {
    pub email: Option<String>,
}

impl SubscriptionRequest {
    fn email(&self) -> Result<String> {
        let email = self
            .email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| StorefrontError::validation("Email is required"))?;
        if !validate_email(email) {
            return Err(StorefrontError::validation("Invalid email format"));
        }
        Ok(email.to_ascii_lowercase())
    }
}

/// Result of a subscribe call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Subscription {
    Created(i64),
    Reactivated(i64),
}

#[derive(Clone)]
pub struct NewsletterService {
    subscribers: SubscriberStore,
    notifier: Arc<dyn Notifier>,
}

impl NewsletterService {
    pub fn new(subscribers: SubscriberStore, notifier: Arc<dyn Notifier>) -> Self {
        Self { subscribers, notifier }
    }

    /// New addresses get a welcome message. An inactive address is switched
    /// back on; an active one is a Conflict.
    pub async fn subscribe(&self, request: SubscriptionRequest) -> Result<Subscription> {
        let email = request.email()?;

        match self.subscribers.find(&email).await? {
            Some(existing) if existing.is_active => Err(StorefrontError::conflict("Email already subscribed")),
            Some(existing) => {
                self.subscribers.reactivate(existing.id).await?;
                tracing::info!(subscriber_id = existing.id, "Subscription reactivated");
                Ok(Subscription::Reactivated(existing.id))
            }
            None => {
                let id = self.subscribers.insert(&email).await?;
                tracing::info!(subscriber_id = id, "New newsletter subscriber");
                notifier::dispatch(self.notifier.clone(), DomainEvent::NewsletterSubscribed { email });
                Ok(Subscription::Created(id))
            }
        }
    }

    /// Unknown addresses are accepted silently.
    pub async fn unsubscribe(&self, request: SubscriptionRequest) -> Result<()> {
        let email = request.email()?;
        if self.subscribers.deactivate(&email).await? {
            tracing::info!("Newsletter subscription deactivated");
        }
        Ok(())
    }

    pub async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        self.subscribers.list_active().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::notifier::LogNotifier;
    use crate::store::connect_in_memory;

    fn request(email: &str) -> SubscriptionRequest {
        SubscriptionRequest { email: Some(email.into()) }
    }

    #[tokio::test]
    async fn test_subscribe_lifecycle() {
        let pool = connect_in_memory().await.unwrap();
        let newsletter = NewsletterService::new(SubscriberStore::new(pool), Arc::new(LogNotifier::new("http://x")));

        let Subscription::Created(id) = newsletter.subscribe(request("Fan@Example.com")).await.unwrap() else {
            panic!("expected a new subscription");
        };
        let err = newsletter.subscribe(request("fan@example.com")).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Conflict(_)));

        newsletter.unsubscribe(request("fan@example.com")).await.unwrap();
        assert!(newsletter.active_subscribers().await.unwrap().is_empty());
        assert_eq!(newsletter.subscribe(request("fan@example.com")).await.unwrap(), Subscription::Reactivated(id));

        newsletter.unsubscribe(request("stranger@example.com")).await.unwrap();
    }

    #[tokio::test]
    async fn test_subscribe_validates_email() {
        let pool = connect_in_memory().await.unwrap();
        let newsletter = NewsletterService::new(SubscriberStore::new(pool), Arc::new(LogNotifier::new("http://x")));

        for bad in [SubscriptionRequest::default(), request("  "), request("not-an-email")] {
            assert!(matches!(newsletter.subscribe(bad).await, Err(StorefrontError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_surrounding_whitespace_is_trimmed() {
        let pool = connect_in_memory().await.unwrap();
        let newsletter = NewsletterService::new(SubscriberStore::new(pool), Arc::new(LogNotifier::new("http://x")));

        assert!(matches!(newsletter.subscribe(request(" fan@example.com ")).await, Ok(Subscription::Created(_))));
        let active = newsletter.active_subscribers().await.unwrap();
        assert_eq!(active[0].email, "fan@example.com");
    }
}
