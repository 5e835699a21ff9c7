mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, error_message, FilePart, TestApp};
use serde_json::json;
use thrift_market_api::entities::user::UserRole;

#[tokio::test]
async fn signup_creates_account_and_profile() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/auth/signup",
            Some(json!({
                "email": "ada@example.com",
                "password": "hunter22",
                "name": "Ada",
                "role": "storeOwner"
            })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["role"], "storeOwner");
    let token = body["data"]["idToken"].as_str().unwrap().to_string();
    let uid = body["data"]["uid"].as_str().unwrap().to_string();

    let response = app
        .request(Method::GET, "/api/users/me", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await["data"].clone();
    assert_eq!(me["uid"], uid.as_str());
    assert_eq!(me["email"], "ada@example.com");
    assert_eq!(me["name"], "Ada");

    // The new owner can open a store straight away
    let response = app
        .request(
            Method::POST,
            "/api/stores",
            Some(json!({ "name": "Ada's Attic" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn signup_rejects_bad_input() {
    let app = TestApp::new().await;
    let valid = json!({
        "email": "grace@example.com",
        "password": "secret1",
        "name": "Grace",
        "role": "customer"
    });

    let mut missing_name = valid.clone();
    missing_name["name"] = json!("");
    let mut bad_role = valid.clone();
    bad_role["role"] = json!("admin");
    let mut bad_email = valid.clone();
    bad_email["email"] = json!("not-an-email");
    let mut short_password = valid.clone();
    short_password["password"] = json!("abc");

    let cases = [
        (missing_name, "Email, password, name and role are required"),
        (bad_role, "Invalid role"),
        (bad_email, "Invalid email address"),
        (short_password, "Password should be at least 6 characters"),
    ];
    for (body, expected) in cases {
        let response = app
            .request(Method::POST, "/api/auth/signup", Some(body), None)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, expected);
    }

    let response = app
        .request(Method::POST, "/api/auth/signup", Some(valid.clone()), None)
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::POST, "/api/auth/signup", Some(valid), None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Email already in use");
}

#[tokio::test]
async fn malformed_json_uses_the_error_body() {
    let app = TestApp::new().await;
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/auth/signup")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().is_some());
    assert!(body["timestamp"].as_str().is_some());
}

#[tokio::test]
async fn google_signup_registers_once() {
    let app = TestApp::new().await;
    let token = app.token_for("google-uid");

    let response = app
        .request(
            Method::POST,
            "/api/auth/signup/google",
            Some(json!({})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Role is required");

    let response = app
        .request(
            Method::POST,
            "/api/auth/signup/google",
            Some(json!({ "role": "customer" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let user = body_json(response).await["data"].clone();
    assert_eq!(user["uid"], "google-uid");
    assert_eq!(user["email"], "google-uid@example.com");
    assert_eq!(user["role"], "customer");

    // Second call returns the stored record untouched
    let response = app
        .request(
            Method::POST,
            "/api/auth/signup/google",
            Some(json!({ "role": "storeOwner" })),
            Some(&token),
        )
        .await;
    assert_eq!(body_json(response).await["data"]["role"], "customer");

    let response = app
        .request(
            Method::POST,
            "/api/auth/signup/google",
            Some(json!({ "role": "customer" })),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_without_record_is_not_found() {
    let app = TestApp::new().await;
    let token = app.token_for("nobody");

    let response = app
        .request(Method::GET, "/api/users/me", None, Some(&token))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "User not found");
}

#[tokio::test]
async fn profile_update_takes_name_and_picture() {
    let app = TestApp::new().await;
    let token = app.create_user("carol", UserRole::Customer).await;

    let files = [FilePart {
        field: "profileImage",
        file_name: "me.png",
        content_type: "image/png",
        data: b"png-bytes",
    }];
    let response = app
        .multipart(
            Method::PUT,
            "/api/users/me",
            &[("name", "Carol B")],
            &files,
            &token,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let me = body_json(response).await["data"].clone();
    assert_eq!(me["name"], "Carol B");
    assert!(me["profileImageUrl"]
        .as_str()
        .unwrap()
        .ends_with("/me.png"));
    assert_eq!(app.blobs.len().await, 1);
}

#[tokio::test]
async fn customers_cannot_open_stores() {
    let app = TestApp::new().await;
    let token = app.create_user("dave", UserRole::Customer).await;

    let response = app
        .request(
            Method::POST,
            "/api/stores",
            Some(json!({ "name": "Dave's" })),
            Some(&token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn health_endpoints_report_up() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "up");

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "up");
    assert_eq!(body["details"]["database"]["status"], "up");

    let response = app.request(Method::GET, "/health/version", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["version"],
        env!("CARGO_PKG_VERSION")
    );
}

#[tokio::test]
async fn responses_carry_request_id_and_security_headers() {
    let app = TestApp::new().await;

    let request = axum::http::Request::builder()
        .uri("/api/stores")
        .header("x-request-id", "req-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers.get("x-request-id").unwrap(), "req-123");
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");

    let response = app.request(Method::GET, "/api/stores", None, None).await;
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["info"]["title"], "Thrift Market API");
    assert!(doc["paths"]["/api/stores/reservations/{reservationId}/confirm"].is_object());
}
