use axum::extract::State;
use axum::http::StatusCode;

use super::{created, ApiJson, ApiPath, ApiResponse, AppState, Authenticated};
use crate::domain::aggregates::{Credentials, ProfileUpdate, Registration, User};
use crate::services::accounts::AuthSession;
use crate::Result;

pub async fn register(
    State(s): State<AppState>,
    ApiJson(registration): ApiJson<Registration>,
) -> Result<(StatusCode, ApiResponse<AuthSession>)> {
    Ok(created(s.accounts.register(registration).await?))
}

pub async fn login(
    State(s): State<AppState>,
    ApiJson(credentials): ApiJson<Credentials>,
) -> Result<ApiResponse<AuthSession>> {
    Ok(ApiResponse::data(s.accounts.login(credentials).await?))
}

pub async fn get_profile(
    State(s): State<AppState>,
    Authenticated(claims): Authenticated,
    ApiPath(id): ApiPath<i64>,
) -> Result<ApiResponse<User>> {
    claims.require_user(id)?;
    Ok(ApiResponse::data(s.accounts.profile(id).await?))
}

pub async fn update_profile(
    State(s): State<AppState>,
    Authenticated(claims): Authenticated,
    ApiPath(id): ApiPath<i64>,
    ApiJson(update): ApiJson<ProfileUpdate>,
) -> Result<ApiResponse<User>> {
    claims.require_user(id)?;
    let user = s.accounts.update_profile(id, update).await?;
    Ok(ApiResponse::data(user).with_message("Profile updated"))
}
