/*!
 * # Authentication
 *
 * Bearer tokens are issued by an external identity provider and verified on
 * every protected request. Two providers are supported:
 *
 * - [`FirebaseIdentityProvider`]: RS256 ID tokens checked against Google's
 *   published JWK set, accounts created through the Identity Toolkit REST API
 * - [`SharedSecretIdentityProvider`]: HS256 tokens signed with a local secret,
 *   for development and tests
 *
 * The verified caller is attached to the request as [`AuthUser`].
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::ServiceError;

mod firebase;
mod shared_secret;

pub use firebase::{FirebaseEndpoints, FirebaseIdentityProvider};
pub use shared_secret::SharedSecretIdentityProvider;

/// Verified caller attached to each authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Account freshly created through [`IdentityProvider::create_account`].
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub uid: String,
    /// Token the client can use right away, when the provider hands one out
    pub id_token: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,

    #[error("{0}")]
    AccountExists(String),

    #[error("{0}")]
    InvalidAccount(String),

    #[error("Identity provider unavailable: {0}")]
    Provider(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ServiceError::from(self).into_response()
    }
}

/// External identity service: verifies bearer tokens and creates accounts.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<AuthUser, AuthError>;

    async fn create_account(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<NewAccount, AuthError>;
}

pub type SharedIdentityProvider = Arc<dyn IdentityProvider>;

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingToken)?;

    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or(AuthError::MissingToken)?;

    if token.is_empty() {
        return Err(AuthError::MissingToken);
    }
    Ok(token)
}

/// Authentication middleware that verifies the bearer token and attaches the caller
pub async fn auth_middleware(
    State(identity): State<SharedIdentityProvider>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(request.headers())?.to_owned();
    let user = identity.verify_token(&token).await?;

    debug!(uid = %user.uid, "Authenticated request");
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| ServiceError::from(AuthError::MissingToken))
    }
}

/// Picks the identity provider named by `auth_provider`.
pub fn identity_provider_from_config(cfg: &AppConfig) -> Result<SharedIdentityProvider, AuthError> {
    if cfg.uses_firebase() {
        let project_id = cfg
            .firebase_project_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AuthError::Provider("firebase_project_id is not set".to_string()))?;
        let provider = FirebaseIdentityProvider::new(
            project_id,
            cfg.firebase_api_key.clone(),
            cfg.http_timeout(),
        )?;
        Ok(Arc::new(provider))
    } else {
        let secret = cfg
            .jwt_secret
            .clone()
            .filter(|secret| !secret.trim().is_empty())
            .ok_or_else(|| AuthError::Provider("jwt_secret is not set".to_string()))?;
        Ok(Arc::new(SharedSecretIdentityProvider::new(
            secret,
            cfg.jwt_expiration,
        )))
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self, identity: SharedIdentityProvider) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, identity: SharedIdentityProvider) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            identity,
            auth_middleware,
        ))
    }
}
