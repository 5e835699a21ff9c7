#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tempfile::TempDir;
use thrift_market_api::{
    auth::{SharedIdentityProvider, SharedSecretIdentityProvider},
    build_router,
    config::AppConfig,
    db,
    entities::user::{self, UserRole},
    storage::{InMemoryBlobStore, SharedBlobStore},
    AppState,
};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration_test_secret_that_is_long_enough_for_hs256";

const BOUNDARY: &str = "thrift-market-test-boundary";

/// File part for [`TestApp::multipart`].
pub struct FilePart<'a> {
    pub field: &'a str,
    pub file_name: &'a str,
    pub content_type: &'a str,
    pub data: &'a [u8],
}

impl<'a> FilePart<'a> {
    pub fn image(file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            field: "images",
            file_name,
            content_type: "image/jpeg",
            data,
        }
    }
}

/// Full application over a throwaway SQLite file, the shared-secret identity
/// provider and an in-memory blob store.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub identity: Arc<SharedSecretIdentityProvider>,
    pub blobs: Arc<InMemoryBlobStore>,
    _db_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir");
        let db_path = db_dir.path().join("thrift_market_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.jwt_secret = Some(TEST_SECRET.to_string());
        // One connection keeps SQLite writes serialized
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.chat_hub_capacity = 64;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let identity = Arc::new(SharedSecretIdentityProvider::new(TEST_SECRET, 3600));
        let blobs = Arc::new(InMemoryBlobStore::new());
        let shared_identity: SharedIdentityProvider = identity.clone();
        let shared_blobs: SharedBlobStore = blobs.clone();

        let state = AppState::new(Arc::new(pool), cfg, shared_identity, shared_blobs);
        let router = build_router(state.clone()).expect("router builds");

        Self {
            router,
            state,
            identity,
            blobs,
            _db_dir: db_dir,
        }
    }

    /// Bearer token for `uid`, whether or not a user row exists.
    pub fn token_for(&self, uid: &str) -> String {
        self.identity
            .issue_token(uid, Some(&format!("{}@example.com", uid)), Some(uid))
            .expect("issue token")
    }

    /// Inserts a user row and returns a token for it.
    pub async fn create_user(&self, uid: &str, role: UserRole) -> String {
        let now = Utc::now();
        user::ActiveModel {
            uid: Set(uid.to_string()),
            email: Set(format!("{}@example.com", uid)),
            name: Set(format!("User {}", uid)),
            role: Set(role),
            profile_image_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert user");
        self.token_for(uid)
    }

    /// Store owner with a store; returns `(token, store_id)`.
    pub async fn create_owner_with_store(&self, uid: &str, store_name: &str) -> (String, String) {
        let token = self.create_user(uid, UserRole::StoreOwner).await;
        let response = self
            .request(
                Method::POST,
                "/api/stores",
                Some(json!({ "name": store_name, "address": "1 Test Lane" })),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        let store_id = body["data"]["storeId"]
            .as_str()
            .expect("store id")
            .to_string();
        (token, store_id)
    }

    /// Lists an item through the JSON endpoint and returns the item body.
    pub async fn create_item(&self, owner_token: &str, item: Value) -> Value {
        let response = self
            .request(Method::POST, "/api/items", Some(item), Some(owner_token))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await["data"].clone()
    }

    pub async fn create_simple_item(&self, owner_token: &str, name: &str) -> String {
        let item = self
            .create_item(owner_token, json!({ "name": name, "price": "10.00" }))
            .await;
        item["itemId"].as_str().expect("item id").to_string()
    }

    /// Send a request with an optional JSON body and bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        self.send(builder.body(body).expect("failed to build request"))
            .await
    }

    /// Send a `multipart/form-data` request.
    pub async fn multipart(
        &self,
        method: Method,
        uri: &str,
        fields: &[(&str, &str)],
        files: &[FilePart<'_>],
        token: &str,
    ) -> Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", token))
            .header(
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(multipart_body(fields, files)))
            .expect("failed to build multipart request");
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Drives a reservation to `Sold` and returns its id.
    pub async fn sold_reservation(
        &self,
        customer_token: &str,
        owner_token: &str,
        item_id: &str,
        store_id: &str,
    ) -> String {
        let response = self
            .request(
                Method::PUT,
                &format!("/api/stores/reserve/{}", item_id),
                Some(json!({ "storeId": store_id })),
                Some(customer_token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let reservation_id = body_json(response).await["data"]["reservationId"]
            .as_str()
            .expect("reservation id")
            .to_string();

        let response = self
            .request(
                Method::PUT,
                &format!("/api/stores/reservations/{}", reservation_id),
                Some(json!({ "status": "Sold" })),
                Some(owner_token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        reservation_id
    }
}

fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    for file in files {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                file.field, file.file_name
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", file.content_type).as_bytes());
        body.extend_from_slice(file.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

/// Collects a response body and parses it as JSON.
pub async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is JSON")
}

/// `error` message of an error response.
pub async fn error_message(response: Response) -> String {
    body_json(response).await["error"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
