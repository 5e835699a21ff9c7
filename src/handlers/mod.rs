pub mod auth;
pub mod chat;
pub mod common;
pub mod items;
pub mod outfits;
pub mod reservations;
pub mod reviews;
pub mod stores;
pub mod users;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::SharedIdentityProvider;
use crate::services::{
    chat::{ChatHub, ChatService},
    items::ItemService,
    outfits::OutfitService,
    reservations::ReservationService,
    reviews::ReviewService,
    stores::StoreService,
    users::UserService,
};
use crate::storage::SharedBlobStore;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub users: Arc<UserService>,
    pub stores: Arc<StoreService>,
    pub items: Arc<ItemService>,
    pub reservations: Arc<ReservationService>,
    pub reviews: Arc<ReviewService>,
    pub chat: Arc<ChatService>,
    pub outfits: Arc<OutfitService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        identity: SharedIdentityProvider,
        blobs: SharedBlobStore,
        chat_hub: ChatHub,
    ) -> Self {
        Self {
            users: Arc::new(UserService::new(
                db_pool.clone(),
                identity,
                blobs.clone(),
            )),
            stores: Arc::new(StoreService::new(db_pool.clone(), blobs.clone())),
            items: Arc::new(ItemService::new(db_pool.clone(), blobs)),
            reservations: Arc::new(ReservationService::new(db_pool.clone(), chat_hub.clone())),
            reviews: Arc::new(ReviewService::new(db_pool.clone())),
            chat: Arc::new(ChatService::new(db_pool.clone(), chat_hub)),
            outfits: Arc::new(OutfitService::new(db_pool)),
        }
    }
}
