use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use serde_json::json;
use thrift_market_api::storage::{
    BlobStore, BlobStoreError, CloudinaryConfig, CloudinaryStore, Upload,
};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn store(server: &MockServer) -> CloudinaryStore {
    let mut config = CloudinaryConfig::new("demo-cloud", "key-123", "secret-456", "thrift-market");
    config.api_base = server.uri();
    CloudinaryStore::new(config, Duration::from_secs(5)).expect("store builds")
}

fn upload() -> Upload {
    Upload {
        file_name: "jacket.jpg".to_string(),
        content_type: Some("image/jpeg".to_string()),
        data: Bytes::from_static(b"jpeg-bytes"),
    }
}

#[tokio::test]
async fn upload_posts_signed_form_and_returns_secure_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo-cloud/image/upload"))
        .and(body_string_contains("name=\"signature\""))
        .and(body_string_contains("key-123"))
        .and(body_string_contains("thrift-market"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "public_id": "thrift-market/abc123",
            "secure_url": "https://res.cloudinary.com/demo-cloud/image/upload/v1/thrift-market/abc123.jpg",
            "format": "jpg"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let blob = store(&server).upload(upload()).await.expect("upload succeeds");
    assert_eq!(blob.public_id, "thrift-market/abc123");
    assert!(blob.url.starts_with("https://res.cloudinary.com/"));
}

#[tokio::test]
async fn upload_failure_surfaces_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo-cloud/image/upload"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"error":{"message":"Invalid Signature"}}"#),
        )
        .mount(&server)
        .await;

    let err = store(&server).upload(upload()).await.unwrap_err();
    assert_matches!(err, BlobStoreError::Api { status: 401, ref message } if message.contains("Invalid Signature"));
}

#[tokio::test]
async fn destroy_maps_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo-cloud/image/destroy"))
        .and(body_string_contains("public_id=thrift-market%2Fgone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "not found" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1_1/demo-cloud/image/destroy"))
        .and(body_string_contains("public_id=thrift-market%2Fabc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "result": "ok" })))
        .mount(&server)
        .await;

    let store = store(&server);
    store
        .delete("thrift-market/abc123")
        .await
        .expect("delete succeeds");
    assert_matches!(
        store.delete("thrift-market/gone").await,
        Err(BlobStoreError::NotFound(id)) if id == "thrift-market/gone"
    );
}
