use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use utoipa::{IntoParams, ToSchema};

use super::common::{created, ApiJson, FormData};
use crate::{
    auth::AuthUser,
    entities::item::ItemStatus,
    errors::ServiceError,
    services::{
        items::{ItemUpdate, ItemView, NewItem},
        non_empty,
        search::ItemFilters,
    },
    ApiResponse, ApiResult, AppState,
};

const PRICE_ERROR: &str = "Price must be a number";
const QUANTITY_ERROR: &str = "Quantity must be a whole number";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ItemSearchQuery {
    pub category: Option<String>,
    pub style: Option<String>,
    pub department: Option<String>,
    /// Available, Reserved, Sold or "Out of Stock"
    pub status: Option<String>,
    pub store_id: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    /// Case-insensitive text matched against name and description
    pub q: Option<String>,
}

fn parse_price(value: Option<String>, message: &str) -> Result<Option<Decimal>, ServiceError> {
    match non_empty(value) {
        Some(raw) => Decimal::from_str(&raw)
            .map(Some)
            .map_err(|_| ServiceError::InvalidInput(message.to_string())),
        None => Ok(None),
    }
}

impl TryFrom<ItemSearchQuery> for ItemFilters {
    type Error = ServiceError;

    fn try_from(query: ItemSearchQuery) -> Result<Self, Self::Error> {
        let status = match non_empty(query.status) {
            Some(raw) => Some(
                ItemStatus::parse(&raw)
                    .ok_or_else(|| ServiceError::InvalidInput("Invalid status filter".to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            category: non_empty(query.category),
            style: non_empty(query.style),
            department: non_empty(query.department),
            status,
            store_id: non_empty(query.store_id),
            min_price: parse_price(query.min_price, "minPrice must be a number")?,
            max_price: parse_price(query.max_price, "maxPrice must be a number")?,
            q: non_empty(query.q),
        })
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "name": "Levi's 501 jeans",
    "description": "Light wash, barely worn",
    "category": "Bottoms",
    "style": "Vintage",
    "department": "Women",
    "size": "28",
    "price": "24.00",
    "quantity": 1
}))]
pub struct CreateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub style: Option<String>,
    pub department: Option<String>,
    pub size: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

impl From<CreateItemRequest> for NewItem {
    fn from(req: CreateItemRequest) -> Self {
        Self {
            name: req.name,
            description: req.description,
            category: req.category,
            style: req.style,
            department: req.department,
            size: req.size,
            price: req.price,
            quantity: req.quantity,
        }
    }
}

fn new_item_from_form(form: &FormData) -> Result<NewItem, ServiceError> {
    Ok(NewItem {
        name: form.text("name"),
        description: form.text("description"),
        category: form.text("category"),
        style: form.text("style"),
        department: form.text("department"),
        size: form.text("size"),
        price: form.parse("price", PRICE_ERROR)?,
        quantity: form.parse("quantity", QUANTITY_ERROR)?,
    })
}

fn item_update_from_form(form: &FormData) -> Result<ItemUpdate, ServiceError> {
    let status = match non_empty(form.text("status")) {
        Some(raw) => Some(
            ItemStatus::parse(&raw)
                .ok_or_else(|| ServiceError::InvalidInput("Invalid status".to_string()))?,
        ),
        None => None,
    };
    Ok(ItemUpdate {
        name: form.text("name"),
        description: form.text("description"),
        category: form.text("category"),
        style: form.text("style"),
        department: form.text("department"),
        size: form.text("size"),
        price: form.parse("price", PRICE_ERROR)?,
        quantity: form.parse("quantity", QUANTITY_ERROR)?,
        status,
        remove_image_ids: form.list("removeImageIds"),
    })
}

#[utoipa::path(
    get,
    path = "/api/items",
    params(ItemSearchQuery),
    responses(
        (status = 200, description = "Matching items, newest first", body = ApiResponse<Vec<ItemView>>),
        (status = 400, description = "Malformed filter", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn search_items(
    State(state): State<AppState>,
    Query(query): Query<ItemSearchQuery>,
) -> ApiResult<Vec<ItemView>> {
    let filters = ItemFilters::try_from(query)?;
    let items = state.services.items.search(filters).await?;
    Ok(Json(ApiResponse::success(items)))
}

#[utoipa::path(
    get,
    path = "/api/items/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    responses(
        (status = 200, description = "Item with images", body = ApiResponse<ItemView>),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_item(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
) -> ApiResult<ItemView> {
    let item = state.services.items.get(&item_id).await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    post,
    path = "/api/items",
    request_body = CreateItemRequest,
    responses(
        (status = 201, description = "Item listed", body = ApiResponse<ItemView>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller has no store", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<CreateItemRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ItemView>>), ServiceError> {
    let item = state
        .services
        .items
        .create(&caller.uid, payload.into(), Vec::new())
        .await?;
    Ok(created(item))
}

#[utoipa::path(
    post,
    path = "/api/stores/items",
    request_body(
        content_type = "multipart/form-data",
        description = "Item fields plus up to 5 `images`; the first image becomes primary"
    ),
    responses(
        (status = 201, description = "Item listed", body = ApiResponse<ItemView>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Caller has no store", body = crate::errors::ErrorResponse),
        (status = 500, description = "Image upload failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn create_item_with_images(
    State(state): State<AppState>,
    caller: AuthUser,
    mut form: FormData,
) -> Result<(StatusCode, Json<ApiResponse<ItemView>>), ServiceError> {
    let input = new_item_from_form(&form)?;
    let images = form.take_files("images");
    let item = state
        .services
        .items
        .create(&caller.uid, input, images)
        .await?;
    Ok(created(item))
}

#[utoipa::path(
    put,
    path = "/api/stores/items/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    request_body(
        content_type = "multipart/form-data",
        description = "Changed fields, extra `images` and `removeImageIds`"
    ),
    responses(
        (status = 200, description = "Item updated", body = ApiResponse<ItemView>),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 403, description = "Item belongs to another store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn update_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(item_id): Path<String>,
    mut form: FormData,
) -> ApiResult<ItemView> {
    let update = item_update_from_form(&form)?;
    let images = form.take_files("images");
    let item = state
        .services
        .items
        .update(&caller.uid, &item_id, update, images)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    put,
    path = "/api/stores/items/{itemId}/images/{imageId}/primary",
    params(
        ("itemId" = String, Path, description = "Item ID"),
        ("imageId" = String, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Primary image changed", body = ApiResponse<ItemView>),
        (status = 403, description = "Item belongs to another store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item or image not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn set_primary_image(
    State(state): State<AppState>,
    caller: AuthUser,
    Path((item_id, image_id)): Path<(String, String)>,
) -> ApiResult<ItemView> {
    let item = state
        .services
        .items
        .set_primary_image(&caller.uid, &item_id, &image_id)
        .await?;
    Ok(Json(ApiResponse::success(item)))
}

#[utoipa::path(
    delete,
    path = "/api/stores/items/{itemId}",
    params(("itemId" = String, Path, description = "Item ID")),
    responses(
        (status = 204, description = "Item, image rows and blobs deleted"),
        (status = 403, description = "Item belongs to another store", body = crate::errors::ErrorResponse),
        (status = 404, description = "Item not found", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "items"
)]
pub async fn delete_item(
    State(state): State<AppState>,
    caller: AuthUser,
    Path(item_id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    state.services.items.delete(&caller.uid, &item_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
