use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::{created, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState};
use crate::domain::aggregates::{CheckoutRequest, Order};
use crate::services::orders::{PlacedOrder, ShippingDetails};
use crate::{Result, StorefrontError};

#[derive(Debug, Default, Deserialize)]
pub struct OrderListQuery {
    pub user_id: Option<i64>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusUpdate {
    pub status: Option<String>,
    #[serde(flatten)]
    pub shipping: ShippingDetails,
}

pub async fn list_orders(
    State(s): State<AppState>,
    ApiQuery(q): ApiQuery<OrderListQuery>,
) -> Result<ApiResponse<Vec<Order>>> {
    let email = q.email.as_deref().map(str::trim).filter(|e| !e.is_empty());
    let orders = s.orders.list_orders(q.user_id, email).await?;
    Ok(ApiResponse::data(orders))
}

pub async fn get_order(State(s): State<AppState>, ApiPath(identifier): ApiPath<String>) -> Result<ApiResponse<Order>> {
    Ok(ApiResponse::data(s.orders.get_order(&identifier).await?))
}

pub async fn create_order(
    State(s): State<AppState>,
    ApiJson(request): ApiJson<CheckoutRequest>,
) -> Result<(StatusCode, ApiResponse<PlacedOrder>)> {
    let placed = s.orders.place_order(request).await?;
    Ok(created(placed))
}

pub async fn update_status(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<StatusUpdate>,
) -> Result<ApiResponse<Order>> {
    let status = update.status.ok_or_else(|| StorefrontError::validation("Status is required"))?;
    let order = s.orders.update_order_status(id, &status, update.shipping).await?;
    Ok(ApiResponse::data(order).with_message("Order status updated"))
}

pub async fn cancel_order(State(s): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<ApiResponse<Order>> {
    let order = s.orders.cancel_order(id).await?;
    Ok(ApiResponse::data(order).with_message("Order cancelled"))
}
