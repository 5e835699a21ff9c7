//! Thrift Market API Library
//!
//! Backend for a second-hand marketplace: stores list items, customers
//! reserve and review them, and both sides talk over per-pair chats.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use std::time::SystemTime;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};
use utoipa::ToSchema;

use crate::auth::{AuthRouterExt, SharedIdentityProvider};
use crate::services::chat::ChatHub;
use crate::storage::SharedBlobStore;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub identity: SharedIdentityProvider,
    pub blobs: SharedBlobStore,
    pub chat_hub: ChatHub,
    pub services: handlers::AppServices,
    pub started_at: SystemTime,
}

impl AppState {
    /// Wires every service against one connection pool, identity provider and blob store.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        identity: SharedIdentityProvider,
        blobs: SharedBlobStore,
    ) -> Self {
        let chat_hub = ChatHub::new(config.chat_hub_capacity);
        let services = handlers::AppServices::new(
            db.clone(),
            identity.clone(),
            blobs.clone(),
            chat_hub.clone(),
        );
        Self {
            db,
            config,
            identity,
            blobs,
            chat_hub,
            services,
            started_at: SystemTime::now(),
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Every marketplace route, relative to `/api`. Reads of stores and items
/// are public; everything else runs behind the identity provider.
pub fn api_routes(identity: SharedIdentityProvider) -> Router<AppState> {
    use handlers::{auth as account, chat, items, outfits, reservations, reviews, stores, users};

    let public = Router::new()
        .route("/auth/signup", post(account::signup))
        .route("/stores", get(stores::list_stores))
        .route("/stores/:storeId", get(stores::get_store))
        .route("/stores/:storeId/items", get(stores::store_items))
        .route("/stores/:storeId/reviews", get(reviews::store_reviews))
        .route("/items", get(items::search_items))
        .route("/items/:itemId", get(items::get_item));

    let accounts = Router::new()
        .route("/auth/signup/google", post(account::signup_google))
        .route("/users/me", get(users::get_me).put(users::update_me))
        .with_auth(identity.clone());

    let store_management = Router::new()
        .route("/stores", post(stores::create_store))
        .route(
            "/my-store",
            get(stores::my_store).put(stores::update_my_store),
        )
        .route("/items", post(items::create_item))
        .route("/stores/items", post(items::create_item_with_images))
        .route(
            "/stores/items/:itemId",
            put(items::update_item).delete(items::delete_item),
        )
        .route(
            "/stores/items/:itemId/images/:imageId/primary",
            put(items::set_primary_image),
        )
        .with_auth(identity.clone());

    let trading = Router::new()
        .route("/stores/reserve/:itemId", put(reservations::reserve_item))
        .route(
            "/stores/reservations",
            get(reservations::list_reservations).post(reservations::create_reservation),
        )
        .route(
            "/stores/reservations/:reservationId",
            put(reservations::update_reservation_status),
        )
        .route(
            "/stores/reservations/:reservationId/confirm",
            put(reservations::confirm_reservation),
        )
        .route("/stores/reviews", post(reviews::create_review))
        .with_auth(identity.clone());

    let messaging = Router::new()
        .route("/stores/chats", get(chat::list_chats).post(chat::create_chat))
        .route("/stores/chats/:chatId/messages", get(chat::chat_messages))
        .route("/stores/chats/:chatId/read", put(chat::mark_chat_read))
        .route("/stores/chats/:chatId/stream", get(chat::chat_stream))
        .route("/stores/messages", post(chat::send_message))
        .with_auth(identity.clone());

    let wardrobe = Router::new()
        .route(
            "/outfits",
            post(outfits::create_outfit).get(outfits::list_outfits),
        )
        .route(
            "/outfits/:outfitId",
            get(outfits::get_outfit).delete(outfits::delete_outfit),
        )
        .with_auth(identity);

    Router::new()
        .merge(public)
        .merge(accounts)
        .merge(store_management)
        .merge(trading)
        .merge(messaging)
        .merge(wardrobe)
}

/// Builds the CORS layer from configuration. Explicit origins win; otherwise
/// development (or an explicit opt-in) gets a permissive policy.
pub fn cors_layer(cfg: &config::AppConfig) -> Result<CorsLayer, errors::ServiceError> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        Err(errors::ServiceError::InternalError(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
                .to_string(),
        ))
    }
}

/// Full application: `/api` routes, health checks and Swagger UI wrapped in
/// the HTTP middleware stack.
pub fn build_router(state: AppState) -> Result<Router, errors::ServiceError> {
    let cors = cors_layer(&state.config)?;
    let body_limit = state.config.max_body_size;

    let app = Router::<AppState>::new()
        .route("/", get(|| async { "thrift-market-api up" }))
        .nest("/api", api_routes(state.identity.clone()))
        .nest("/health", health::health_routes())
        .merge(openapi::swagger_ui())
        // Multipart uploads carry up to five images
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(axum::middleware::from_fn(
            middleware_helpers::security_headers::security_headers_middleware,
        ))
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state);

    Ok(app)
}
