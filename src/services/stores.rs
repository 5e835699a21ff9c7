use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{discard_blobs, non_empty};
use crate::{
    entities::{
        review, store,
        user::{self, UserRole},
    },
    errors::ServiceError,
    storage::{SharedBlobStore, Upload},
};

#[derive(Debug, Clone, Default)]
pub struct NewStore {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub profile_image: Option<Upload>,
}

/// Storefront profiles. Each store owner has at most one store.
#[derive(Clone)]
pub struct StoreService {
    db_pool: Arc<DatabaseConnection>,
    blobs: SharedBlobStore,
}

impl StoreService {
    pub fn new(db_pool: Arc<DatabaseConnection>, blobs: SharedBlobStore) -> Self {
        Self { db_pool, blobs }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<store::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(store::Entity::find()
            .order_by_asc(store::Column::Name)
            .all(db)
            .await?)
    }

    #[instrument(skip(self))]
    pub async fn get(&self, store_id: &str) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;
        store::Entity::find_by_id(store_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Store"))
    }

    #[instrument(skip(self))]
    pub async fn find_for_owner(&self, owner_id: &str) -> Result<Option<store::Model>, ServiceError> {
        let db = &*self.db_pool;
        Ok(store::Entity::find()
            .filter(store::Column::OwnerId.eq(owner_id))
            .one(db)
            .await?)
    }

    pub async fn my_store(&self, owner_id: &str) -> Result<store::Model, ServiceError> {
        self.find_for_owner(owner_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Store"))
    }

    #[instrument(skip(self, input), fields(owner_id = %owner_id))]
    pub async fn create(&self, owner_id: &str, input: NewStore) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;

        let owner = user::Entity::find_by_id(owner_id.to_string()).one(db).await?;
        if !matches!(owner, Some(ref u) if u.role == UserRole::StoreOwner) {
            return Err(ServiceError::Forbidden(
                "Only store owners can create a store".to_string(),
            ));
        }
        if self.find_for_owner(owner_id).await?.is_some() {
            return Err(ServiceError::InvalidInput(
                "Store already exists for this user".to_string(),
            ));
        }
        let name = non_empty(input.name)
            .ok_or_else(|| ServiceError::InvalidInput("Store name is required".to_string()))?;
        validate_coordinates(input.latitude, input.longitude)?;

        let now = Utc::now();
        let store = store::ActiveModel {
            store_id: Set(Uuid::new_v4().to_string()),
            owner_id: Set(owner_id.to_string()),
            name: Set(name),
            description: Set(non_empty(input.description)),
            address: Set(non_empty(input.address)),
            latitude: Set(input.latitude),
            longitude: Set(input.longitude),
            profile_image_url: Set(None),
            average_rating: Set(0.0),
            review_count: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(store_id = %store.store_id, "Store created");
        Ok(store)
    }

    #[instrument(skip(self, update), fields(owner_id = %owner_id))]
    pub async fn update_my_store(
        &self,
        owner_id: &str,
        update: StoreUpdate,
    ) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.my_store(owner_id).await?;
        validate_coordinates(update.latitude, update.longitude)?;

        let uploaded = match update.profile_image {
            Some(upload) => Some(self.blobs.upload(upload).await?),
            None => None,
        };

        let mut active: store::ActiveModel = existing.into();
        if let Some(name) = non_empty(update.name) {
            active.name = Set(name);
        }
        if let Some(description) = non_empty(update.description) {
            active.description = Set(Some(description));
        }
        if let Some(address) = non_empty(update.address) {
            active.address = Set(Some(address));
        }
        if update.latitude.is_some() {
            active.latitude = Set(update.latitude);
        }
        if update.longitude.is_some() {
            active.longitude = Set(update.longitude);
        }
        if let Some(blob) = uploaded.as_ref() {
            active.profile_image_url = Set(Some(blob.url.clone()));
        }
        active.updated_at = Set(Utc::now());

        match active.update(db).await {
            Ok(store) => {
                info!(store_id = %store.store_id, "Store updated");
                Ok(store)
            }
            Err(e) => {
                if let Some(blob) = uploaded {
                    discard_blobs(&self.blobs, &[blob.public_id]).await;
                }
                Err(e.into())
            }
        }
    }
}

fn validate_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<(), ServiceError> {
    if latitude.is_some_and(|lat| !(-90.0..=90.0).contains(&lat)) {
        return Err(ServiceError::InvalidInput(
            "Latitude must be between -90 and 90".to_string(),
        ));
    }
    if longitude.is_some_and(|lng| !(-180.0..=180.0).contains(&lng)) {
        return Err(ServiceError::InvalidInput(
            "Longitude must be between -180 and 180".to_string(),
        ));
    }
    Ok(())
}

/// Unweighted mean rounded to one decimal place; `0.0` when there are no ratings.
pub fn average_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|&r| i64::from(r)).sum();
    let mean = sum as f64 / ratings.len() as f64;
    (mean * 10.0).round() / 10.0
}

/// Recomputes `average_rating` and `review_count` from every review of the store.
/// Runs on whatever connection it is given so it can join a transaction.
pub async fn update_store_rating<C: ConnectionTrait>(
    conn: &C,
    store_id: &str,
) -> Result<(f64, i32), ServiceError> {
    let ratings: Vec<i32> = review::Entity::find()
        .select_only()
        .column(review::Column::Rating)
        .filter(review::Column::StoreId.eq(store_id))
        .into_tuple()
        .all(conn)
        .await?;

    let average = average_rating(&ratings);
    let count = i32::try_from(ratings.len())
        .map_err(|_| ServiceError::InternalError("Review count overflow".to_string()))?;

    let updated = store::Entity::update_many()
        .col_expr(store::Column::AverageRating, Expr::value(average))
        .col_expr(store::Column::ReviewCount, Expr::value(count))
        .col_expr(store::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(store::Column::StoreId.eq(store_id))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        return Err(ServiceError::not_found("Store"));
    }

    info!(store_id = %store_id, average_rating = average, review_count = count, "Store rating updated");
    Ok((average, count))
}
