use axum::{extract::State, Json};

use super::common::FormData;
use crate::{
    auth::AuthUser, entities::user, services::users::ProfileUpdate, ApiResponse, ApiResult,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Caller's profile", body = ApiResponse<user::Model>),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse),
        (status = 404, description = "No user record for this account", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn get_me(State(state): State<AppState>, caller: AuthUser) -> ApiResult<user::Model> {
    let user = state.services.users.get(&caller.uid).await?;
    Ok(Json(ApiResponse::success(user)))
}

/// Multipart fields: `name`, `profileImage`.
#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body(content_type = "multipart/form-data", description = "Fields `name` and `profileImage`"),
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<user::Model>),
        (status = 404, description = "No user record for this account", body = crate::errors::ErrorResponse),
        (status = 500, description = "Image upload failed", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    caller: AuthUser,
    mut form: FormData,
) -> ApiResult<user::Model> {
    let update = ProfileUpdate {
        name: form.text("name"),
        profile_image: form.take_file("profileImage"),
    };
    let user = state
        .services
        .users
        .update_profile(&caller.uid, update)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
