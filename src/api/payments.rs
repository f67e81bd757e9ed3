use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;

use super::{ApiJson, ApiPath, ApiResponse, AppState};
use crate::domain::value_objects::{Money, PaymentMethod};
use crate::services::payments::PaymentIntent;
use crate::{Result, StorefrontError};

#[derive(Debug, Default, Deserialize)]
pub struct IntentRequest {
    pub amount: Option<Money>,
    pub currency: Option<String>,
}

fn method(raw: &str) -> Result<PaymentMethod> {
    raw.parse().map_err(StorefrontError::Validation)
}

pub async fn create_intent(
    State(s): State<AppState>,
    ApiPath(raw_method): ApiPath<String>,
    ApiJson(request): ApiJson<IntentRequest>,
) -> Result<(StatusCode, ApiResponse<PaymentIntent>)> {
    let method = method(&raw_method)?;
    let amount = request.amount.ok_or_else(|| StorefrontError::validation("Invalid amount"))?;
    let currency = request.currency.as_deref().unwrap_or("usd");

    let intent = s.payments.create_intent(amount, currency, method).await?;
    let response = ApiResponse::data(intent).with_message(format!("Payment intent created ({})", s.payments.name()));
    Ok((StatusCode::CREATED, response))
}

pub async fn confirm_intent(
    State(s): State<AppState>,
    ApiPath((raw_method, intent_id)): ApiPath<(String, String)>,
) -> Result<ApiResponse<PaymentIntent>> {
    let method = method(&raw_method)?;
    Ok(ApiResponse::data(s.payments.confirm(method, &intent_id).await?))
}
