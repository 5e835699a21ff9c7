use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::non_empty;
use crate::{
    entities::outfit::{self, OutfitSlots, OUTFIT_SLOTS},
    errors::ServiceError,
};

#[derive(Clone)]
pub struct OutfitService {
    db_pool: Arc<DatabaseConnection>,
}

impl OutfitService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, slots), fields(uid = %uid))]
    pub async fn create(
        &self,
        uid: &str,
        name: Option<String>,
        slots: Vec<Option<String>>,
    ) -> Result<outfit::Model, ServiceError> {
        let db = &*self.db_pool;
        let slots = OutfitSlots::new(
            slots
                .into_iter()
                .map(non_empty)
                .collect(),
        )
        .ok_or_else(|| {
            ServiceError::InvalidInput(format!("An outfit must have exactly {} slots", OUTFIT_SLOTS))
        })?;

        let now = Utc::now();
        let outfit = outfit::ActiveModel {
            outfit_id: Set(Uuid::new_v4().to_string()),
            user_id: Set(uid.to_string()),
            name: Set(non_empty(name)),
            slots: Set(slots),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(outfit_id = %outfit.outfit_id, items = outfit.slots.item_ids().count(), "Outfit saved");
        Ok(outfit)
    }

    /// The caller's outfits, newest first.
    #[instrument(skip(self))]
    pub async fn list(&self, uid: &str) -> Result<Vec<outfit::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(outfit::Entity::find()
            .filter(outfit::Column::UserId.eq(uid))
            .order_by_desc(outfit::Column::CreatedAt)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, outfit_id: &str) -> Result<outfit::Model, ServiceError> {
        let db = &*self.db_pool;
        outfit::Entity::find_by_id(outfit_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Outfit"))
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, uid: &str, outfit_id: &str) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        let outfit = self.get(outfit_id).await?;
        if outfit.user_id != uid {
            return Err(ServiceError::Forbidden(
                "Unauthorized to delete this outfit".to_string(),
            ));
        }
        outfit::Entity::delete_by_id(outfit.outfit_id).exec(db).await?;
        info!(outfit_id = %outfit_id, "Outfit deleted");
        Ok(())
    }
}
