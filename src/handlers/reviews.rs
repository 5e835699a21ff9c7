use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;

use super::common::{created, ApiJson};
use crate::{
    auth::AuthUser, entities::review, errors::ServiceError, services::reviews::ReviewInput,
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "reservationId": "7d1f5c2a-0b3e-4f6a-9c8d-2e4b6a8c0d1f",
    "rating": 5,
    "review": "Lovely jacket, friendly seller"
}))]
pub struct CreateReviewRequest {
    #[schema(value_type = Option<String>)]
    pub reservation_id: Option<Value>,
    /// Whole number from 1 to 5
    #[schema(value_type = Option<i32>)]
    pub rating: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub review: Option<Value>,
}

#[utoipa::path(
    post,
    path = "/api/stores/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review stored", body = ApiResponse<review::Model>),
        (status = 400, description = "Bad rating, missing reservation, not Sold or already reviewed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Reservation belongs to someone else", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ApiResponse<review::Model>>), ServiceError> {
    let review = state
        .services
        .reviews
        .create(
            &caller.uid,
            ReviewInput {
                reservation_id: payload.reservation_id,
                rating: payload.rating,
                review: payload.review,
            },
        )
        .await?;
    Ok(created(review))
}

#[utoipa::path(
    get,
    path = "/api/stores/{storeId}/reviews",
    params(("storeId" = String, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Reviews for the store, newest first", body = ApiResponse<Vec<review::Model>>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "reviews"
)]
pub async fn store_reviews(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> ApiResult<Vec<review::Model>> {
    let reviews = state.services.reviews.list_for_store(&store_id).await?;
    Ok(Json(ApiResponse::success(reviews)))
}
