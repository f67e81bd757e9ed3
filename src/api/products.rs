use axum::extract::State;
use axum::http::StatusCode;

use super::{created, ApiJson, ApiPath, ApiQuery, ApiResponse, AppState, Created};
use crate::domain::aggregates::{NewProduct, Product, Review};
use crate::services::catalog::{ProductQuery, ReviewRequest};
use crate::Result;

pub async fn list_products(
    State(s): State<AppState>,
    ApiQuery(q): ApiQuery<ProductQuery>,
) -> Result<ApiResponse<Vec<Product>>> {
    let (products, pagination) = s.catalog.list_products(&q).await?;
    Ok(ApiResponse::data(products).with_pagination(pagination))
}

pub async fn get_product(State(s): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<ApiResponse<Product>> {
    Ok(ApiResponse::data(s.catalog.get_product(id).await?))
}

pub async fn create_product(
    State(s): State<AppState>,
    ApiJson(product): ApiJson<NewProduct>,
) -> Result<(StatusCode, ApiResponse<Product>)> {
    Ok(created(s.catalog.create_product(product).await?))
}

pub async fn list_categories(State(s): State<AppState>) -> Result<ApiResponse<Vec<String>>> {
    Ok(ApiResponse::data(s.catalog.categories().await?))
}

pub async fn list_reviews(State(s): State<AppState>, ApiPath(id): ApiPath<i64>) -> Result<ApiResponse<Vec<Review>>> {
    Ok(ApiResponse::data(s.catalog.reviews(id).await?))
}

pub async fn add_review(
    State(s): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(review): ApiJson<ReviewRequest>,
) -> Result<(StatusCode, ApiResponse<Created>)> {
    let review_id = s.catalog.add_review(id, review).await?;
    Ok(created(Created { id: review_id }))
}
