#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use sqlx::SqlitePool;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::ServiceExt;

use storefront::domain::events::DomainEvent;
use storefront::services::notifier::{Delivery, Notifier};
use storefront::services::MockPaymentGateway;
use storefront::{api, store, AppConfig, StorefrontError};

/// Keeps every event it is handed.
#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<DomainEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn provider(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, event: &DomainEvent) -> storefront::Result<Delivery> {
        self.events.lock().unwrap().push(event.clone());
        Ok(Delivery { provider: self.provider() })
    }
}

/// Fails every delivery.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    fn provider(&self) -> &'static str {
        "failing"
    }

    async fn notify(&self, _event: &DomainEvent) -> storefront::Result<Delivery> {
        Err(StorefrontError::Notification("mail server unreachable".into()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: SqlitePool,
    pub recorder: Arc<RecordingNotifier>,
}

pub async fn spawn_app() -> TestApp {
    let recorder = Arc::new(RecordingNotifier::default());
    build(recorder.clone(), recorder).await
}

pub async fn spawn_app_with(notifier: Arc<dyn Notifier>) -> TestApp {
    build(notifier, Arc::new(RecordingNotifier::default())).await
}

async fn build(notifier: Arc<dyn Notifier>, recorder: Arc<RecordingNotifier>) -> TestApp {
    let pool = store::connect_in_memory().await.unwrap();
    store::seed_catalog(&pool).await.unwrap();
    let config = AppConfig::default();
    let state = api::AppState::new(pool.clone(), &config, notifier, Arc::new(MockPaymentGateway::new()));
    TestApp { router: api::router(state, &[]), pool, recorder }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.request_as(None, method, uri, body).await
    }

    /// Sends the request with an `Authorization: Bearer` header when a token is given.
    pub async fn request_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).unwrap())
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    pub async fn count(&self, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    /// Waits for spawned notification tasks to hand `n` events to the recorder.
    pub async fn wait_for_events(&self, n: usize) -> Vec<DomainEvent> {
        for _ in 0..100 {
            {
                let events = self.recorder.events.lock().unwrap();
                if events.len() >= n {
                    return events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.recorder.events.lock().unwrap().clone()
    }
}

pub fn checkout(items: Value, subtotal: f64, shipping: f64, total: f64) -> Value {
    serde_json::json!({
        "email": "ada@example.com",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "address": "12 St James's Square",
        "city": "London",
        "state": "LDN",
        "zip_code": "SW1Y 4JH",
        "phone": "555-0101",
        "payment_method": "card",
        "items": items,
        "subtotal": subtotal,
        "shipping": shipping,
        "total": total,
    })
}

pub fn tee_checkout() -> Value {
    checkout(serde_json::json!([{ "name": "Tee", "price": 10.00, "quantity": 2 }]), 20.00, 5.99, 25.99)
}
