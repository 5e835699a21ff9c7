use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use super::common::{created, ApiJson, FormData};
use crate::{
    auth::AuthUser,
    entities::store,
    errors::ServiceError,
    services::{
        items::ItemView,
        stores::{NewStore, StoreUpdate},
    },
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "name": "Second Chance Threads",
    "description": "Curated vintage denim and knitwear",
    "address": "12 Market St",
    "latitude": 40.7128,
    "longitude": -74.006
}))]
pub struct CreateStoreRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[utoipa::path(
    get,
    path = "/api/stores",
    responses(
        (status = 200, description = "All stores", body = ApiResponse<Vec<store::Model>>)
    ),
    tag = "stores"
)]
pub async fn list_stores(State(state): State<AppState>) -> ApiResult<Vec<store::Model>> {
    let stores = state.services.stores.list().await?;
    Ok(Json(ApiResponse::success(stores)))
}

#[utoipa::path(
    post,
    path = "/api/stores",
    request_body = CreateStoreRequest,
    responses(
        (status = 201, description = "Store created", body = ApiResponse<store::Model>),
        (status = 400, description = "Missing name or store already exists", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller is not a store owner", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn create_store(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateStoreRequest>,
) -> Result<(StatusCode, Json<ApiResponse<store::Model>>), ServiceError> {
    let store = state
        .services
        .stores
        .create(
            &caller.uid,
            NewStore {
                name: payload.name,
                description: payload.description,
                address: payload.address,
                latitude: payload.latitude,
                longitude: payload.longitude,
            },
        )
        .await?;
    Ok(created(store))
}

#[utoipa::path(
    get,
    path = "/api/my-store",
    responses(
        (status = 200, description = "Caller's store", body = ApiResponse<store::Model>),
        (status = 404, description = "Caller has no store", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn my_store(State(state): State<AppState>, caller: AuthUser) -> ApiResult<store::Model> {
    let store = state.services.stores.my_store(&caller.uid).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    put,
    path = "/api/my-store",
    request_body(
        content_type = "multipart/form-data",
        description = "Fields `name`, `description`, `address`, `latitude`, `longitude` and `profileImage`"
    ),
    responses(
        (status = 200, description = "Store updated", body = ApiResponse<store::Model>),
        (status = 400, description = "Malformed field", body = crate::errors::ErrorResponse),
        (status = 404, description = "Caller has no store", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "stores"
)]
pub async fn update_my_store(
    State(state): State<AppState>,
    caller: AuthUser,
    mut form: FormData,
) -> ApiResult<store::Model> {
    let update = StoreUpdate {
        name: form.text("name"),
        description: form.text("description"),
        address: form.text("address"),
        latitude: form.parse("latitude", "Latitude must be a number")?,
        longitude: form.parse("longitude", "Longitude must be a number")?,
        profile_image: form.take_file("profileImage"),
    };
    let store = state
        .services
        .stores
        .update_my_store(&caller.uid, update)
        .await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    get,
    path = "/api/stores/{storeId}",
    params(("storeId" = String, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Store", body = ApiResponse<store::Model>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn get_store(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> ApiResult<store::Model> {
    let store = state.services.stores.get(&store_id).await?;
    Ok(Json(ApiResponse::success(store)))
}

#[utoipa::path(
    get,
    path = "/api/stores/{storeId}/items",
    params(("storeId" = String, Path, description = "Store ID")),
    responses(
        (status = 200, description = "Items listed by the store", body = ApiResponse<Vec<ItemView>>),
        (status = 404, description = "Store not found", body = crate::errors::ErrorResponse)
    ),
    tag = "stores"
)]
pub async fn store_items(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> ApiResult<Vec<ItemView>> {
    let items = state.services.items.list_for_store(&store_id).await?;
    Ok(Json(ApiResponse::success(items)))
}
