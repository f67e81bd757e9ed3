//! HTTP surface: router, shared state, extractors and the JSON envelope.
//!
//! Every response carries `success`. Successful bodies put their payload in
//! `data`; failures carry a human-readable `error` and never a raw internal
//! error.

pub mod newsletter;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;
pub mod wishlist;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use async_trait::async_trait;
use axum::extract::{FromRequest, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::domain::value_objects::OrderNumberGenerator;
use crate::services::accounts::Claims;
use crate::services::catalog::Pagination;
use crate::services::{
    AccountService, CatalogService, NewsletterService, Notifier, OrderWorkflow, PaymentGateway, WishlistService,
};
use crate::store::{CatalogStore, OrderStore, SubscriberStore, UserStore, WishlistStore};
use crate::{AppConfig, StorefrontError};

#[derive(Clone)]
pub struct AppState {
    pub orders: OrderWorkflow,
    pub catalog: CatalogService,
    pub accounts: AccountService,
    pub wishlist: WishlistService,
    pub newsletter: NewsletterService,
    pub payments: Arc<dyn PaymentGateway>,
}

impl AppState {
    /// Wires every service onto the one pool.
    pub fn new(
        pool: SqlitePool,
        config: &AppConfig,
        notifier: Arc<dyn Notifier>,
        payments: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog_store = CatalogStore::new(pool.clone());
        Self {
            orders: OrderWorkflow::new(
                OrderStore::new(pool.clone()),
                catalog_store.clone(),
                Arc::new(OrderNumberGenerator::new()),
                notifier.clone(),
            ),
            catalog: CatalogService::new(catalog_store),
            accounts: AccountService::new(UserStore::new(pool.clone()), &config.jwt_secret, config.jwt_ttl_hours),
            wishlist: WishlistService::new(WishlistStore::new(pool.clone())),
            newsletter: NewsletterService::new(SubscriberStore::new(pool), notifier),
            payments,
        }
    }
}

pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/products", get(products::list_products).post(products::create_product))
        .route("/products/categories/list", get(products::list_categories))
        .route("/products/:id", get(products::get_product))
        .route("/products/:id/reviews", get(products::list_reviews).post(products::add_review))
        .route("/orders", get(orders::list_orders).post(orders::create_order))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/status", patch(orders::update_status))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/users/register", post(users::register))
        .route("/users/login", post(users::login))
        .route("/users/profile/:id", get(users::get_profile).patch(users::update_profile))
        .route("/wishlist", get(wishlist::list).post(wishlist::add))
        .route("/wishlist/:id", delete(wishlist::remove))
        .route("/wishlist/product/:product_id", delete(wishlist::remove_product))
        .route("/newsletter", get(newsletter::list_subscribers))
        .route("/newsletter/subscribe", post(newsletter::subscribe))
        .route("/newsletter/unsubscribe", post(newsletter::unsubscribe))
        .route("/payments/:method/intents", post(payments::create_intent))
        .route("/payments/:method/intents/:intent_id/confirm", post(payments::confirm_intent));

    Router::new()
        .route("/", get(index))
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors(allowed_origins))
        .with_state(state)
}

fn cors(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new().allow_origin(origins).allow_methods(Any).allow_headers(Any)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "storefront",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn index() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Storefront API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "products": "/api/products",
            "orders": "/api/orders",
            "users": "/api/users",
            "wishlist": "/api/wishlist",
            "newsletter": "/api/newsletter",
            "payments": "/api/payments",
            "health": "/api/health",
        }
    }))
}

async fn route_not_found() -> StorefrontError {
    StorefrontError::not_found("Route not found")
}

// =============================================================================
// Envelope
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn data(data: T) -> Self {
        Self { success: true, data: Some(data), message: None, pagination: None }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Id of a row a request just created.
#[derive(Debug, Serialize)]
pub struct Created {
    pub id: i64,
}

/// Success with only a message and no payload.
pub fn acknowledged(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse { success: true, data: None, message: Some(message.into()), pagination: None }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}

impl IntoResponse for StorefrontError {
    fn into_response(self) -> Response {
        match &self {
            Self::Persistence(_) | Self::Migration(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "Request failed")
            }
            Self::Notification(_) => tracing::warn!(error = %self, "Notification error reached the API"),
            _ => tracing::debug!(error = %self, "Request rejected"),
        }
        let body = serde_json::json!({ "success": false, "error": self.public_message() });
        (self.status_code(), Json(body)).into_response()
    }
}

/// Successful creation: 201 with the envelope.
pub fn created<T: Serialize>(data: T) -> (StatusCode, ApiResponse<T>) {
    (StatusCode::CREATED, ApiResponse::data(data))
}

// =============================================================================
// Extractors
// =============================================================================

/// `Json` whose rejections render as the error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(StorefrontError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(StorefrontError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(StorefrontError))]
pub struct ApiPath<T>(pub T);

/// Claims of a valid `Authorization: Bearer` token.
pub struct Authenticated(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for Authenticated {
    type Rejection = StorefrontError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| StorefrontError::Unauthorized("Missing bearer token".to_string()))?;
        state.accounts.verify_token(token).map(Self)
    }
}

impl From<JsonRejection> for StorefrontError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for StorefrontError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for StorefrontError {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}
