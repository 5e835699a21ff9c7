use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::common::{created, ApiJson};
use crate::{
    auth::AuthUser,
    entities::user,
    errors::ServiceError,
    services::users::{SignupInput, SignupResult},
    ApiResponse, ApiResult, AppState,
};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "ada@example.com",
    "password": "hunter22",
    "name": "Ada's Attic",
    "role": "storeOwner"
}))]
pub struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    /// `customer` or `storeOwner`
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[schema(example = json!({ "role": "customer", "name": "Grace" }))]
pub struct GoogleSignupRequest {
    pub role: Option<String>,
    pub name: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = ApiResponse<SignupResult>),
        (status = 400, description = "Missing fields, unknown role or existing account", body = crate::errors::ErrorResponse),
        (status = 500, description = "Identity provider failure", body = crate::errors::ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SignupResult>>), ServiceError> {
    payload.validate()?;

    let result = state
        .services
        .users
        .signup(SignupInput {
            email: payload.email,
            password: payload.password,
            name: payload.name,
            role: payload.role,
        })
        .await?;

    Ok(created(result))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup/google",
    request_body = GoogleSignupRequest,
    responses(
        (status = 200, description = "User record for the signed-in Google account", body = ApiResponse<user::Model>),
        (status = 400, description = "Missing or unknown role", body = crate::errors::ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = crate::errors::ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "auth"
)]
pub async fn signup_google(
    State(state): State<AppState>,
    caller: AuthUser,
    ApiJson(payload): ApiJson<GoogleSignupRequest>,
) -> ApiResult<user::Model> {
    let user = state
        .services
        .users
        .signup_google(&caller, payload.role, payload.name)
        .await?;
    Ok(Json(ApiResponse::success(user)))
}
