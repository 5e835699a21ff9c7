mod common;

use axum::http::{Method, StatusCode};
use common::{body_json, error_message, TestApp};
use serde_json::json;
use thrift_market_api::entities::user::UserRole;

async fn item_status(app: &TestApp, item_id: &str) -> String {
    let response = app
        .request(Method::GET, &format!("/api/items/{}", item_id), None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"]["status"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn set_status(app: &TestApp, token: &str, reservation_id: &str, status: &str) -> axum::response::Response {
    app.request(
        Method::PUT,
        &format!("/api/stores/reservations/{}", reservation_id),
        Some(json!({ "status": status })),
        Some(token),
    )
    .await
}

async fn reserve(app: &TestApp, token: &str, item_id: &str, store_id: &str) -> axum::response::Response {
    app.request(
        Method::PUT,
        &format!("/api/stores/reserve/{}", item_id),
        Some(json!({ "storeId": store_id })),
        Some(token),
    )
    .await
}

#[tokio::test]
async fn reserving_an_item_marks_it_reserved_and_messages_the_owner() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Denim jacket").await;

    let response = reserve(&app, &customer, &item_id, &store_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["data"]["status"], "Pending");
    assert_eq!(body["data"]["userId"], "customer-1");
    assert_eq!(body["data"]["storeId"], store_id.as_str());

    assert_eq!(item_status(&app, &item_id).await, "Reserved");

    let response = app
        .request(Method::GET, "/api/stores/chats", None, Some(&owner))
        .await;
    let chats = body_json(response).await["data"].clone();
    assert_eq!(chats.as_array().unwrap().len(), 1);
    assert_eq!(chats[0]["otherUserId"], "customer-1");
    assert_eq!(
        chats[0]["lastMessage"],
        "Hi! I just reserved your item \"Denim jacket\"."
    );
    assert_eq!(chats[0]["unreadCount"], 1);
}

#[tokio::test]
async fn reserve_via_post_requires_item_and_store() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Scarf").await;

    let response = app
        .request(
            Method::POST,
            "/api/stores/reservations",
            Some(json!({ "storeId": store_id })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "itemId is required");

    let response = app
        .request(
            Method::POST,
            "/api/stores/reservations",
            Some(json!({ "itemId": item_id, "storeId": store_id })),
            Some(&customer),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn reserved_items_cannot_be_reserved_again() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let first = app.create_user("customer-1", UserRole::Customer).await;
    let second = app.create_user("customer-2", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Boots").await;

    assert_eq!(
        reserve(&app, &first, &item_id, &store_id).await.status(),
        StatusCode::CREATED
    );

    let response = reserve(&app, &second, &item_id, &store_id).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Item is not available for reservation"
    );
}

#[tokio::test]
async fn reserve_rejects_wrong_store_and_missing_item() {
    let app = TestApp::new().await;
    let (owner, _store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let (_other_owner, other_store) = app.create_owner_with_store("owner-2", "Loft").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Belt").await;

    let response = reserve(&app, &customer, &item_id, &other_store).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Item does not belong to this store"
    );
    assert_eq!(item_status(&app, &item_id).await, "Available");

    let response = reserve(&app, &customer, "no-such-item", &other_store).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(error_message(response).await, "Item not found");
}

#[tokio::test]
async fn concurrent_reservations_only_one_wins() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let first = app.create_user("customer-1", UserRole::Customer).await;
    let second = app.create_user("customer-2", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Coat").await;

    let (a, b) = tokio::join!(
        reserve(&app, &first, &item_id, &store_id),
        reserve(&app, &second, &item_id, &store_id)
    );

    let mut statuses = vec![a.status(), b.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let response = app
        .request(Method::GET, "/api/stores/reservations", None, Some(&owner))
        .await;
    let reservations = body_json(response).await["data"].clone();
    assert_eq!(reservations.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn owner_moves_reservation_through_confirmed_to_sold() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Cardigan").await;

    let response = reserve(&app, &customer, &item_id, &store_id).await;
    let reservation_id = body_json(response).await["data"]["reservationId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = set_status(&app, &owner, &reservation_id, "Confirmed").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "Confirmed");
    assert_eq!(item_status(&app, &item_id).await, "Reserved");

    let response = set_status(&app, &owner, &reservation_id, "Sold").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(item_status(&app, &item_id).await, "Sold");

    let response = set_status(&app, &owner, &reservation_id, "Cancelled").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Cannot change reservation status from Sold to Cancelled"
    );
    assert_eq!(item_status(&app, &item_id).await, "Sold");
}

#[tokio::test]
async fn cancelling_releases_the_item() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let first = app.create_user("customer-1", UserRole::Customer).await;
    let second = app.create_user("customer-2", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Blazer").await;

    let response = reserve(&app, &first, &item_id, &store_id).await;
    let reservation_id = body_json(response).await["data"]["reservationId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = set_status(&app, &owner, &reservation_id, "Cancelled").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(item_status(&app, &item_id).await, "Available");

    assert_eq!(
        reserve(&app, &second, &item_id, &store_id).await.status(),
        StatusCode::CREATED
    );
}

#[tokio::test]
async fn only_the_store_owner_changes_status() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let (other_owner, _) = app.create_owner_with_store("owner-2", "Loft").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Hat").await;

    let response = reserve(&app, &customer, &item_id, &store_id).await;
    let reservation_id = body_json(response).await["data"]["reservationId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = set_status(&app, &customer, &reservation_id, "Sold").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = set_status(&app, &other_owner, &reservation_id, "Sold").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        error_message(response).await,
        "Unauthorized to update this reservation"
    );

    let response = set_status(&app, &owner, &reservation_id, "Completed").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        error_message(response).await,
        "Only the customer can complete a reservation"
    );

    let response = set_status(&app, &owner, &reservation_id, "Shipped").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Invalid status");

    let response = set_status(&app, &owner, "missing", "Sold").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn reservation_lists_depend_on_role() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let first = app.create_user("customer-1", UserRole::Customer).await;
    let second = app.create_user("customer-2", UserRole::Customer).await;
    let jacket = app.create_simple_item(&owner, "Jacket").await;
    let skirt = app.create_simple_item(&owner, "Skirt").await;

    reserve(&app, &first, &jacket, &store_id).await;
    reserve(&app, &second, &skirt, &store_id).await;

    let response = app
        .request(Method::GET, "/api/stores/reservations", None, Some(&owner))
        .await;
    let owner_view = body_json(response).await["data"].clone();
    assert_eq!(owner_view.as_array().unwrap().len(), 2);

    let response = app
        .request(Method::GET, "/api/stores/reservations", None, Some(&first))
        .await;
    let customer_view = body_json(response).await["data"].clone();
    let rows = customer_view.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["itemId"], jacket.as_str());
    assert_eq!(rows[0]["itemName"], "Jacket");
    assert!(rows[0]["itemImageUrl"].is_null());
}

#[tokio::test]
async fn reservation_routes_require_a_token() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/stores/reservations", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(
            Method::GET,
            "/api/stores/reservations",
            None,
            Some("not-a-token"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn items_with_open_reservations_cannot_be_deleted() {
    let app = TestApp::new().await;
    let (owner, store_id) = app.create_owner_with_store("owner-1", "Attic").await;
    let customer = app.create_user("customer-1", UserRole::Customer).await;
    let item_id = app.create_simple_item(&owner, "Trench coat").await;
    let uri = format!("/api/stores/items/{}", item_id);

    let response = reserve(&app, &customer, &item_id, &store_id).await;
    let reservation_id = body_json(response).await["data"]["reservationId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.request(Method::DELETE, &uri, None, Some(&owner)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(response).await, "Item has an active reservation");
    assert_eq!(item_status(&app, &item_id).await, "Reserved");

    let response = set_status(&app, &owner, &reservation_id, "Cancelled").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.request(Method::DELETE, &uri, None, Some(&owner)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}
