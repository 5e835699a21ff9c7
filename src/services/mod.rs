//! Business logic behind the HTTP handlers. Each service owns a handle to the
//! database pool plus whatever external clients its workflow needs.

pub mod chat;
pub mod items;
pub mod outfits;
pub mod reservations;
pub mod reviews;
pub mod search;
pub mod stores;
pub mod users;

use tracing::warn;

use crate::storage::SharedBlobStore;

/// Best-effort blob cleanup once the rows pointing at them are gone.
pub(crate) async fn discard_blobs(blobs: &SharedBlobStore, public_ids: &[String]) {
    for public_id in public_ids {
        if let Err(e) = blobs.delete(public_id).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete image blob");
        }
    }
}

/// Trims and drops empty strings.
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use crate::entities::{
        item::{self, ItemStatus},
        store,
        user::{self, UserRole},
    };

    pub async fn memory_db() -> DatabaseConnection {
        let db = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".into(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&db).await.unwrap();
        db
    }

    pub async fn user(db: &DatabaseConnection, uid: &str, role: UserRole) {
        let now = Utc::now();
        user::ActiveModel {
            uid: Set(uid.into()),
            email: Set(format!("{}@example.com", uid)),
            name: Set(uid.into()),
            role: Set(role),
            profile_image_url: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
    }

    /// Owner `owner`, store `store-1` and one available item `item-1`.
    pub async fn listed_item(db: &DatabaseConnection) -> item::Model {
        let now = Utc::now();
        user(db, "owner", UserRole::StoreOwner).await;
        store::ActiveModel {
            store_id: Set("store-1".into()),
            owner_id: Set("owner".into()),
            name: Set("Second Look".into()),
            description: Set(None),
            address: Set(None),
            latitude: Set(None),
            longitude: Set(None),
            profile_image_url: Set(None),
            average_rating: Set(0.0),
            review_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap();
        item::ActiveModel {
            item_id: Set("item-1".into()),
            store_id: Set("store-1".into()),
            name: Set("Denim jacket".into()),
            description: Set(None),
            category: Set(None),
            style: Set(None),
            department: Set(None),
            size: Set(None),
            price: Set(dec!(20.00)),
            quantity: Set(1),
            status: Set(ItemStatus::Available),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .unwrap()
    }
}
