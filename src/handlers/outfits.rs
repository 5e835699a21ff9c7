use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::common::{created, ApiJson};
use crate::{
    auth::AuthUser, entities::outfit, errors::ServiceError, ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[schema(example = json!({
    "name": "Autumn layers",
    "slots": ["item-1", null, null, "item-2", null, null, null, null, "item-3"]
}))]
pub struct CreateOutfitRequest {
    pub name: Option<String>,
    /// Exactly nine entries; `null` marks an empty slot
    #[serde(default)]
    pub slots: Vec<Option<String>>,
}

#[utoipa::path(
    post,
    path = "/api/outfits",
    request_body = CreateOutfitRequest,
    responses(
        (status = 201, description = "Outfit saved", body = ApiResponse<outfit::Model>),
        (status = 400, description = "Slot count is not nine", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "outfits"
)]
pub async fn create_outfit(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateOutfitRequest>,
) -> Result<(StatusCode, Json<ApiResponse<outfit::Model>>), ServiceError> {
    let outfit = state
        .services
        .outfits
        .create(&caller.uid, payload.name, payload.slots)
        .await?;
    Ok(created(outfit))
}

#[utoipa::path(
    get,
    path = "/api/outfits",
    responses(
        (status = 200, description = "Caller's outfits, newest first", body = ApiResponse<Vec<outfit::Model>>)
    ),
    security(("bearer_auth" = [])),
    tag = "outfits"
)]
pub async fn list_outfits(
    State(state): State<AppState>,
    caller: AuthUser,
) -> ApiResult<Vec<outfit::Model>> {
    let outfits = state.services.outfits.list(&caller.uid).await?;
    Ok(Json(ApiResponse::success(outfits)))
}

#[utoipa::path(
    get,
    path = "/api/outfits/{outfitId}",
    params(("outfitId" = String, Path, description = "Outfit ID")),
    responses(
        (status = 200, description = "Outfit", body = ApiResponse<outfit::Model>),
        (status = 404, description = "Outfit not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "outfits"
)]
pub async fn get_outfit(
    State(state): State<AppState>,
    _caller: AuthUser,
    Path(outfit_id): Path<String>,
) -> ApiResult<outfit::Model> {
    let outfit = state.services.outfits.get(&outfit_id).await?;
    Ok(Json(ApiResponse::success(outfit)))
}

#[utoipa::path(
    delete,
    path = "/api/outfits/{outfitId}",
    params(("outfitId" = String, Path, description = "Outfit ID")),
    responses(
        (status = 204, description = "Outfit deleted"),
        (status = 403, description = "Outfit belongs to someone else", body = crate::errors::ErrorResponse),
        (status = 404, description = "Outfit not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "outfits"
)]
pub async fn delete_outfit(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(outfit_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state
        .services
        .outfits
        .delete(&caller.uid, &outfit_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
