use axum::extract::State;
use axum::http::StatusCode;

use super::{acknowledged, ApiJson, ApiResponse, AppState, Created};
use crate::domain::aggregates::Subscriber;
use crate::services::newsletter::{Subscription, SubscriptionRequest};
use crate::Result;

pub async fn list_subscribers(State(s): State<AppState>) -> Result<ApiResponse<Vec<Subscriber>>> {
    Ok(ApiResponse::data(s.newsletter.active_subscribers().await?))
}

/// 201 for a new address, 200 when an inactive one is switched back on.
pub async fn subscribe(
    State(s): State<AppState>,
    ApiJson(request): ApiJson<SubscriptionRequest>,
) -> Result<(StatusCode, ApiResponse<Created>)> {
    let response = match s.newsletter.subscribe(request).await? {
        Subscription::Created(id) => {
            (StatusCode::CREATED, ApiResponse::data(Created { id }).with_message("Successfully subscribed to newsletter"))
        }
        Subscription::Reactivated(id) => {
            (StatusCode::OK, ApiResponse::data(Created { id }).with_message("Subscription reactivated"))
        }
    };
    Ok(response)
}

pub async fn unsubscribe(
    State(s): State<AppState>,
    ApiJson(request): ApiJson<SubscriptionRequest>,
) -> Result<ApiResponse<()>> {
    s.newsletter.unsubscribe(request).await?;
    Ok(acknowledged("Successfully unsubscribed from newsletter"))
}
