mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, error_message, TestApp};
use serde_json::{json, Value};
use thrift_market_api::entities::user::UserRole;

async fn search(app: &TestApp, query: &str) -> Vec<String> {
    let response = app
        .request(Method::GET, &format!("/api/items{}", query), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let mut names: Vec<String> = body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    names
}

async fn catalog(app: &TestApp) -> (String, String, String) {
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let (other_owner, _) = app.create_owner_with_store("owner-2", "Loft").await;

    let items: [(&str, Value); 3] = [
        (
            owner.as_str(),
            json!({
                "name": "Floral dress",
                "description": "Summer midi with pockets",
                "category": "Dresses",
                "style": "Boho",
                "department": "Women",
                "price": "30"
            }),
        ),
        (
            owner.as_str(),
            json!({
                "name": "Flannel shirt",
                "category": "Tops",
                "style": "Grunge",
                "department": "Men",
                "price": "12"
            }),
        ),
        (
            other_owner.as_str(),
            json!({
                "name": "Leather boots",
                "description": "Resoled, FLORAL stitching",
                "category": "Shoes",
                "department": "Women",
                "price": "80",
                "quantity": 0
            }),
        ),
    ];
    for (token, body) in items {
        app.create_item(token, body).await;
    }
    (owner, other_owner, store_id)
}

#[tokio::test]
async fn no_filters_returns_everything() {
    let app = TestApp::new().await;
    catalog(&app).await;

    assert_eq!(
        search(&app, "").await,
        vec!["Flannel shirt", "Floral dress", "Leather boots"]
    );
}

#[tokio::test]
async fn equality_filters_combine() {
    let app = TestApp::new().await;
    let (_, _, store_id) = catalog(&app).await;

    assert_eq!(
        search(&app, "?department=Women").await,
        vec!["Floral dress", "Leather boots"]
    );
    assert_eq!(
        search(&app, "?department=Women&category=Dresses").await,
        vec!["Floral dress"]
    );
    assert_eq!(search(&app, "?style=Grunge").await, vec!["Flannel shirt"]);
    assert_eq!(
        search(&app, &format!("?storeId={}", store_id)).await,
        vec!["Flannel shirt", "Floral dress"]
    );
    assert!(search(&app, "?category=Hats").await.is_empty());
}

#[tokio::test]
async fn status_filter_accepts_out_of_stock() {
    let app = TestApp::new().await;
    catalog(&app).await;

    assert_eq!(
        search(&app, "?status=Out%20of%20Stock").await,
        vec!["Leather boots"]
    );
    assert_eq!(
        search(&app, "?status=Available").await,
        vec!["Flannel shirt", "Floral dress"]
    );

    let response = app
        .request(Method::GET, "/api/items?status=Lost", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid status filter");
}

#[tokio::test]
async fn price_range_is_inclusive() {
    let app = TestApp::new().await;
    catalog(&app).await;

    assert_eq!(
        search(&app, "?minPrice=12&maxPrice=30").await,
        vec!["Flannel shirt", "Floral dress"]
    );
    assert_eq!(search(&app, "?minPrice=50").await, vec!["Leather boots"]);
    assert_eq!(search(&app, "?maxPrice=20").await, vec!["Flannel shirt"]);

    let response = app
        .request(Method::GET, "/api/items?minPrice=lots", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "minPrice must be a number");
}

#[tokio::test]
async fn text_query_matches_name_and_description() {
    let app = TestApp::new().await;
    catalog(&app).await;

    assert_eq!(
        search(&app, "?q=floral").await,
        vec!["Floral dress", "Leather boots"]
    );
    assert_eq!(search(&app, "?q=POCKETS").await, vec!["Floral dress"]);
    assert_eq!(
        search(&app, "?q=floral&department=Women&maxPrice=40").await,
        vec!["Floral dress"]
    );
}

#[tokio::test]
async fn reserved_items_leave_the_available_results() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Trench coat").await;
    app.create_simple_item(&owner, "Raincoat").await;

    app.request(
        Method::PUT,
        &format!("/api/stores/reserve/{}", item_id),
        Some(json!({ "storeId": store_id })),
        Some(&customer),
    )
    .await;

    assert_eq!(search(&app, "?status=Available").await, vec!["Raincoat"]);
    assert_eq!(search(&app, "?status=Reserved").await, vec!["Trench coat"]);
}
