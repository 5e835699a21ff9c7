use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::common::{created, ApiJson};
use crate::{
    auth::AuthUser,
    entities::reservation,
    errors::ServiceError,
    services::{
        non_empty,
        reservations::{ConfirmedReservation, ReservationView},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({ "storeId": "5b0c3a8e-6f5d-4c49-9a57-1c1f1f0b8f11" }))]
pub struct ReserveItemRequest {
    pub store_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "itemId": "0f6e2d4c-5a34-4d7b-bb0e-2f1d0b9a7c21",
    "storeId": "5b0c3a8e-6f5d-4c49-9a57-1c1f1f0b8f11"
}))]
pub struct CreateReservationRequest {
    pub item_id: Option<String>,
    pub store_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[schema(example = json!({ "status": "Sold" }))]
pub struct UpdateReservationStatusRequest {
    /// Confirmed, Sold or Cancelled
    pub status: Option<String>,
}

fn required(value: Option<String>, field: &str) -> Result<String, ServiceError> {
    non_empty(value).ok_or_else(|| ServiceError::InvalidInput(format!("{} is required", field)))
}

#[utoipa::path(
    put,
    path = "/api/stores/reserve/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    request_body = ReserveItemRequest,
    responses(
        (status = 201, description = "Item reserved; the store owner was messaged", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Item not available or not in this store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn reserve_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(item_id): Path<String>,
    ApiJson(payload): ApiJson<ReserveItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<reservation::Model>>), ServiceError> {
    let store_id = required(payload.store_id, "storeId")?;
    let reservation = state
        .services
        .reservations
        .reserve(&caller.uid, &item_id, &store_id)
        .await?;
    Ok(created(reservation))
}

#[utoipa::path(
    post,
    path = "/api/stores/reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Item reserved; the store owner was messaged", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Item not available or not in this store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateReservationRequest>,
) -> Result<(StatusCode, Json<ApiResponse<reservation::Model>>), ServiceError> {
    let item_id = required(payload.item_id, "itemId")?;
    let store_id = required(payload.store_id, "storeId")?;
    let reservation = state
        .services
        .reservations
        .reserve(&caller.uid, &item_id, &store_id)
        .await?;
    Ok(created(reservation))
}

#[utoipa::path(
    get,
    path = "/api/stores/reservations",
    responses(
        (status = 200, description = "Store owners get their store's reservations, customers their own", body = ApiResponse<Vec<ReservationView>>)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn list_reservations(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Vec<ReservationView>> {
    let reservations = state.services.reservations.list_for(&caller.uid).await?;
    Ok(Json(ApiResponse::success(reservations)))
}

#[utoipa::path(
    put,
    path = "/api/stores/reservations/{reservationId}",
    params(("reservationId" = String, Path, description = "Reservation ID")),
    request_body = UpdateReservationStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<reservation::Model>),
        (status = 400, description = "Unknown status or transition not allowed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller does not own the store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn update_reservation_status(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(reservation_id): Path<String>,
    ApiJson(payload): ApiJson<UpdateReservationStatusRequest>,
) -> ApiResult<reservation::Model> {
    let status = payload.status.unwrap_or_default();
    let reservation = state
        .services
        .reservations
        .update_status(&caller.uid, &reservation_id, status.trim())
        .await?;
    Ok(Json(ApiResponse::success(reservation)))
}

#[utoipa::path(
    put,
    path = "/api/stores/reservations/{reservationId}/confirm",
    params(("reservationId" = String, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation completed and store rating refreshed", body = ApiResponse<ConfirmedReservation>),
        (status = 400, description = "Reservation is not Sold", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller did not make the reservation", body = crate::errors::ErrorResponse),
        (status = 404, description = "Reservation not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "reservations"
)]
pub async fn confirm_reservation(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(reservation_id): Path<String>,
) -> ApiResult<ConfirmedReservation> {
    let confirmed = state
        .services
        .reservations
        .confirm(&caller.uid, &reservation_id)
        .await?;
    Ok(Json(
        ApiResponse::success(confirmed).with_message("Reservation completed"),
    ))
}
