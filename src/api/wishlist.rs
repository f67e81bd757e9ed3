use axum::extract::State;
use axum::http::StatusCode;

use super::{acknowledged, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::domain::aggregates::WishlistEntry;
use crate::services::wishlist::{AddToWishlist, Owner};
use crate::Result;

pub async fn list(State(s): State<AppState>, ApiQuery(owner): ApiQuery<Owner>) -> Result<ApiResponse<Vec<WishlistEntry>>> {
    Ok(ApiResponse::data(s.wishlist.list(owner).await?))
}

pub async fn add(
    State(s): State<AppState>,
    ApiJson(request): ApiJson<AddToWishlist>,
) -> Result<(StatusCode, ApiResponse<Created>)> {
    let id = s.wishlist.add(request).await?;
    Ok((StatusCode::CREATED, ApiResponse::data(Created { id }).with_message("Added to wishlist")))
}

pub async fn remove(State(s): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<ApiResponse<()>> {
    s.wishlist.remove(id).await?;
    Ok(acknowledged("Removed from wishlist"))
}

pub async fn remove_product(
    State(s): State<AppState>,
    ApiPath(product_id): ApiPath<i64>,
    ApiQuery(owner): ApiQuery<Owner>,
) -> Result<ApiResponse<()>> {
    s.wishlist.remove_product(owner, product_id).await?;
    Ok(acknowledged("Removed from wishlist"))
}
