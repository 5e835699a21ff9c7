use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Thrift Market API",
        version = "1.0.0",
        description = r#"
# Thrift Market API

Backend for a second-hand marketplace.

- **Stores**: store owners run one storefront each and list items with up to five images per upload
- **Search**: public item search by category, style, department, status, store, price range and free text
- **Reservations**: customers reserve an item; the store owner moves the reservation to Confirmed, Sold or Cancelled and the item status follows
- **Reviews**: customers rate Sold reservations; confirming the purchase refreshes the store rating
- **Chat**: one conversation per pair of users, with a Server-Sent Events stream for live messages
- **Outfits**: customers save nine-slot outfit boards

## Authentication

Protected endpoints take an ID token from the configured identity provider:

```
Authorization: Bearer <id-token>
```

## Responses

Successful calls return `{ "success": true, "data": ... }`. Errors return
`{ "error": ..., "requestId": ..., "timestamp": ... }` with the matching HTTP status.
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "auth", description = "Account signup"),
        (name = "users", description = "Caller profile"),
        (name = "stores", description = "Storefronts"),
        (name = "items", description = "Listings, images and search"),
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "reviews", description = "Store reviews"),
        (name = "chat", description = "Direct messages and live stream"),
        (name = "outfits", description = "Outfit boards")
    ),
    paths(
        crate::handlers::auth::signup,
        crate::handlers::auth::signup_google,

        crate::handlers::users::get_me,
        crate::handlers::users::update_me,

        crate::handlers::stores::list_stores,
        crate::handlers::stores::create_store,
        crate::handlers::stores::my_store,
        crate::handlers::stores::update_my_store,
        crate::handlers::stores::get_store,
        crate::handlers::stores::store_items,

        crate::handlers::items::search_items,
        crate::handlers::items::get_item,
        crate::handlers::items::create_item,
        crate::handlers::items::create_item_with_images,
        crate::handlers::items::update_item,
        crate::handlers::items::set_primary_image,
        crate::handlers::items::delete_item,

        crate::handlers::reservations::reserve_item,
        crate::handlers::reservations::create_reservation,
        crate::handlers::reservations::list_reservations,
        crate::handlers::reservations::update_reservation_status,
        crate::handlers::reservations::confirm_reservation,

        crate::handlers::reviews::create_review,
        crate::handlers::reviews::store_reviews,

        crate::handlers::chat::list_chats,
        crate::handlers::chat::create_chat,
        crate::handlers::chat::chat_messages,
        crate::handlers::chat::send_message,
        crate::handlers::chat::mark_chat_read,
        crate::handlers::chat::chat_stream,

        crate::handlers::outfits::create_outfit,
        crate::handlers::outfits::list_outfits,
        crate::handlers::outfits::get_outfit,
        crate::handlers::outfits::delete_outfit,
    ),
    components(
        schemas(
            crate::entities::user::Model,
            crate::entities::store::Model,
            crate::entities::item::Model,
            crate::entities::reservation::Model,
            crate::entities::review::Model,
            crate::entities::message::Model,
            crate::entities::outfit::Model,
            crate::services::items::ItemView,
            crate::services::items::ItemImageView,
            crate::services::chat::ChatSummary,
            crate::services::chat::ChatView,
            crate::services::reservations::ReservationView,
            crate::services::reservations::ConfirmedReservation,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths.
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
