use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{discard_blobs, non_empty, search::ItemFilters};
use crate::{
    entities::{
        item::{self, ItemStatus},
        item_image, reservation, store,
    },
    errors::ServiceError,
    storage::{SharedBlobStore, StoredBlob, Upload},
};

pub const MAX_IMAGES_PER_UPLOAD: usize = 5;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemImageView {
    pub image_id: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    pub is_primary: bool,
}

impl From<item_image::Model> for ItemImageView {
    fn from(model: item_image::Model) -> Self {
        Self {
            image_id: model.image_id,
            image_url: model.image_url,
            is_primary: model.is_primary,
        }
    }
}

/// Item with its images in display order.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemView {
    #[serde(flatten)]
    pub item: item::Model,
    pub images: Vec<ItemImageView>,
}

#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub style: Option<String>,
    pub department: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub style: Option<String>,
    pub department: Option<String>,
    pub size: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i32>,
    pub status: Option<ItemStatus>,
    pub remove_image_ids: Vec<String>,
}

fn validate_price(price: Decimal) -> Result<(), ServiceError> {
    if price <= Decimal::ZERO {
        return Err(ServiceError::InvalidInput(
            "Price must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> Result<(), ServiceError> {
    if quantity < 0 {
        return Err(ServiceError::InvalidInput(
            "Quantity cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_upload_count(count: usize) -> Result<(), ServiceError> {
    if count > MAX_IMAGES_PER_UPLOAD {
        return Err(ServiceError::InvalidInput(format!(
            "You can upload at most {} images at a time",
            MAX_IMAGES_PER_UPLOAD
        )));
    }
    Ok(())
}

/// Listing CRUD. Writes are restricted to the owner of the item's store.
#[derive(Clone)]
pub struct ItemService {
    db_pool: Arc<DatabaseConnection>,
    blobs: SharedBlobStore,
}

impl ItemService {
    pub fn new(db_pool: Arc<DatabaseConnection>, blobs: SharedBlobStore) -> Self {
        Self { db_pool, blobs }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, item_id: &str) -> Result<ItemView, ServiceError> {
        let db = &*self.db_pool;
        let item = item::Entity::find_by_id(item_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item"))?;
        let images = images_for(db, &item.item_id).await?;
        Ok(ItemView {
            item,
            images: images.into_iter().map(ItemImageView::from).collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn search(&self, filters: ItemFilters) -> Result<Vec<ItemView>, ServiceError> {
        let db = &*self.db_pool;
        let items: Vec<item::Model> = item::Entity::find()
            .filter(filters.condition())
            .order_by_desc(item::Column::CreatedAt)
            .all(db)
            .await?
            .into_iter()
            .filter(|item| filters.matches_text(item))
            .collect();

        self.with_images(items).await
    }

    #[instrument(skip(self))]
    pub async fn list_for_store(&self, store_id: &str) -> Result<Vec<ItemView>, ServiceError> {
        let db = &*self.db_pool;
        if store::Entity::find_by_id(store_id.to_string())
            .one(db)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Store"));
        }

        self.search(ItemFilters {
            store_id: Some(store_id.to_string()),
            ..Default::default()
        })
        .await
    }

    async fn with_images(&self, items: Vec<item::Model>) -> Result<Vec<ItemView>, ServiceError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let db = &*self.db_pool;
        let ids: Vec<String> = items.iter().map(|i| i.item_id.clone()).collect();
        let mut grouped: HashMap<String, Vec<ItemImageView>> = HashMap::new();
        for image in item_image::Entity::find()
            .filter(item_image::Column::ItemId.is_in(ids))
            .order_by_asc(item_image::Column::Position)
            .order_by_asc(item_image::Column::CreatedAt)
            .all(db)
            .await?
        {
            grouped
                .entry(image.item_id.clone())
                .or_default()
                .push(image.into());
        }

        Ok(items
            .into_iter()
            .map(|item| {
                let images = grouped.remove(&item.item_id).unwrap_or_default();
                ItemView { item, images }
            })
            .collect())
    }

    /// Store owned by `owner_id`, or `Forbidden` when the caller has none.
    async fn owner_store(&self, owner_id: &str) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;
        store::Entity::find()
            .filter(store::Column::OwnerId.eq(owner_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::Forbidden("You need a store to manage items".to_string()))
    }

    /// Loads the item and checks it belongs to the caller's store.
    async fn owned_item(&self, owner_id: &str, item_id: &str) -> Result<item::Model, ServiceError> {
        let db = &*self.db_pool;
        let item = item::Entity::find_by_id(item_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item"))?;

        let owns_item = store::Entity::find()
            .filter(store::Column::OwnerId.eq(owner_id))
            .filter(store::Column::StoreId.eq(item.store_id.as_str()))
            .one(db)
            .await?
            .is_some();
        if !owns_item {
            return Err(ServiceError::Forbidden(
                "You do not have permission to modify this item".to_string(),
            ));
        }
        Ok(item)
    }

    async fn upload_all(&self, uploads: Vec<Upload>) -> Result<Vec<StoredBlob>, ServiceError> {
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.blobs.upload(upload).await {
                Ok(blob) => stored.push(blob),
                Err(e) => {
                    let ids: Vec<String> = stored.into_iter().map(|b| b.public_id).collect();
                    discard_blobs(&self.blobs, &ids).await;
                    return Err(e.into());
                }
            }
        }
        Ok(stored)
    }

    /// Creates a listing in the caller's store. The first upload becomes the primary image.
    #[instrument(skip(self, input, uploads), fields(owner_id = %owner_id, images = uploads.len()))]
    pub async fn create(
        &self,
        owner_id: &str,
        input: NewItem,
        uploads: Vec<Upload>,
    ) -> Result<ItemView, ServiceError> {
        let store = self.owner_store(owner_id).await?;

        let name = non_empty(input.name)
            .ok_or_else(|| ServiceError::InvalidInput("Item name is required".to_string()))?;
        let price = input.price.ok_or_else(|| {
            ServiceError::InvalidInput("Price must be greater than 0".to_string())
        })?;
        validate_price(price)?;
        let quantity = input.quantity.unwrap_or(1);
        validate_quantity(quantity)?;
        validate_upload_count(uploads.len())?;

        let blobs = self.upload_all(uploads).await?;
        let blob_ids: Vec<String> = blobs.iter().map(|b| b.public_id.clone()).collect();

        let now = Utc::now();
        let item_id = Uuid::new_v4().to_string();
        let model = item::ActiveModel {
            item_id: Set(item_id.clone()),
            store_id: Set(store.store_id.clone()),
            name: Set(name),
            description: Set(non_empty(input.description)),
            category: Set(non_empty(input.category)),
            style: Set(non_empty(input.style)),
            department: Set(non_empty(input.department)),
            size: Set(non_empty(input.size)),
            price: Set(price),
            quantity: Set(quantity),
            status: Set(ItemStatus::Available.for_quantity(quantity)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let result = async {
            let txn = self.db_pool.begin().await?;
            model.insert(&txn).await?;
            insert_images(&txn, &item_id, blobs, 0, true).await?;
            txn.commit().await?;
            Ok::<_, ServiceError>(())
        }
        .await;

        if let Err(e) = result {
            discard_blobs(&self.blobs, &blob_ids).await;
            return Err(e);
        }

        info!(item_id = %item_id, store_id = %store.store_id, "Item listed");
        self.get(&item_id).await
    }

    #[instrument(skip(self, update, uploads), fields(owner_id = %owner_id, images = uploads.len()))]
    pub async fn update(
        &self,
        owner_id: &str,
        item_id: &str,
        update: ItemUpdate,
        uploads: Vec<Upload>,
    ) -> Result<ItemView, ServiceError> {
        let db = &*self.db_pool;
        let existing = self.owned_item(owner_id, item_id).await?;

        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(quantity) = update.quantity {
            validate_quantity(quantity)?;
        }
        validate_upload_count(uploads.len())?;
        if let Some(status) = update.status {
            if !matches!(status, ItemStatus::Available | ItemStatus::OutOfStock) {
                return Err(ServiceError::InvalidInput(
                    "Status can only be set to Available or Out of Stock".to_string(),
                ));
            }
            if matches!(existing.status, ItemStatus::Reserved | ItemStatus::Sold)
                && status != existing.status
            {
                return Err(ServiceError::InvalidState(
                    "Item status is managed by its reservation".to_string(),
                ));
            }
        }

        let current_images = images_for(db, item_id).await?;
        let remove: HashSet<&str> = update.remove_image_ids.iter().map(String::as_str).collect();
        if let Some(unknown) = remove
            .iter()
            .find(|id| !current_images.iter().any(|img| img.image_id == **id))
        {
            return Err(ServiceError::InvalidInput(format!(
                "Image {} does not belong to this item",
                unknown
            )));
        }
        let removed_blobs: Vec<String> = current_images
            .iter()
            .filter(|img| remove.contains(img.image_id.as_str()))
            .map(|img| img.public_id.clone())
            .collect();
        let next_position = current_images
            .iter()
            .map(|img| img.position + 1)
            .max()
            .unwrap_or(0);

        let blobs = self.upload_all(uploads).await?;
        let new_blob_ids: Vec<String> = blobs.iter().map(|b| b.public_id.clone()).collect();

        let quantity_changed = update.quantity.is_some();
        let mut status = update.status.unwrap_or(existing.status);
        let quantity = update.quantity.unwrap_or(existing.quantity);
        if quantity_changed {
            status = status.for_quantity(quantity);
        }

        let result = async {
            let txn = self.db_pool.begin().await?;
            write_item(&txn, &existing, &update, quantity, status).await?;
            if !update.remove_image_ids.is_empty() {
                item_image::Entity::delete_many()
                    .filter(item_image::Column::ItemId.eq(item_id))
                    .filter(item_image::Column::ImageId.is_in(update.remove_image_ids.clone()))
                    .exec(&txn)
                    .await?;
            }
            insert_images(&txn, item_id, blobs, next_position, false).await?;
            ensure_primary(&txn, item_id).await?;
            txn.commit().await?;
            Ok::<_, ServiceError>(())
        }
        .await;

        if let Err(e) = result {
            discard_blobs(&self.blobs, &new_blob_ids).await;
            return Err(e);
        }
        discard_blobs(&self.blobs, &removed_blobs).await;

        info!(item_id = %item_id, removed = removed_blobs.len(), added = new_blob_ids.len(), "Item updated");
        self.get(item_id).await
    }

    #[instrument(skip(self))]
    pub async fn set_primary_image(
        &self,
        owner_id: &str,
        item_id: &str,
        image_id: &str,
    ) -> Result<ItemView, ServiceError> {
        self.owned_item(owner_id, item_id).await?;

        let txn = self.db_pool.begin().await?;
        let image = item_image::Entity::find_by_id(image_id.to_string())
            .filter(item_image::Column::ItemId.eq(item_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Image"))?;

        item_image::Entity::update_many()
            .col_expr(item_image::Column::IsPrimary, Expr::value(false))
            .filter(item_image::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await?;
        item_image::Entity::update_many()
            .col_expr(item_image::Column::IsPrimary, Expr::value(true))
            .filter(item_image::Column::ImageId.eq(image.image_id.as_str()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(item_id = %item_id, image_id = %image_id, "Primary image changed");
        self.get(item_id).await
    }

    /// Deletes the item, its image rows and the blobs behind them. Items with
    /// a reservation still in progress stay put.
    #[instrument(skip(self))]
    pub async fn delete(&self, owner_id: &str, item_id: &str) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.owned_item(owner_id, item_id).await?;
        let reserved = reservation::Entity::find()
            .filter(reservation::Column::ItemId.eq(item_id))
            .all(db)
            .await?
            .iter()
            .any(|r| r.status.is_active());
        if reserved {
            return Err(ServiceError::InvalidState(
                "Item has an active reservation".to_string(),
            ));
        }
        let blob_ids: Vec<String> = images_for(db, item_id)
            .await?
            .into_iter()
            .map(|img| img.public_id)
            .collect();

        let txn = self.db_pool.begin().await?;
        item_image::Entity::delete_many()
            .filter(item_image::Column::ItemId.eq(item_id))
            .exec(&txn)
            .await?;
        item::Entity::delete_by_id(item_id.to_string())
            .exec(&txn)
            .await?;
        txn.commit().await?;

        discard_blobs(&self.blobs, &blob_ids).await;
        info!(item_id = %item_id, images = blob_ids.len(), "Item deleted");
        Ok(())
    }
}

/// Writes the edited columns of `existing`. Status is written only when it
/// changes, and only while the row still has the status it was read with, so
/// a reservation committed in the meantime is never overwritten.
pub(crate) async fn write_item<C: ConnectionTrait>(
    conn: &C,
    existing: &item::Model,
    update: &ItemUpdate,
    quantity: i32,
    status: ItemStatus,
) -> Result<(), ServiceError> {
    let mut query = item::Entity::update_many()
        .col_expr(item::Column::Quantity, Expr::value(quantity))
        .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(item::Column::ItemId.eq(existing.item_id.as_str()));

    let text_columns = [
        (item::Column::Name, &update.name),
        (item::Column::Description, &update.description),
        (item::Column::Category, &update.category),
        (item::Column::Style, &update.style),
        (item::Column::Department, &update.department),
        (item::Column::Size, &update.size),
    ];
    for (column, value) in text_columns {
        if let Some(value) = non_empty(value.clone()) {
            query = query.col_expr(column, Expr::value(value));
        }
    }
    if let Some(price) = update.price {
        query = query.col_expr(item::Column::Price, Expr::value(price));
    }
    if status != existing.status {
        query = query
            .col_expr(item::Column::Status, Expr::value(status))
            .filter(item::Column::Status.eq(existing.status));
    }

    let result = query.exec(conn).await?;
    if result.rows_affected == 0 {
        warn!(item_id = %existing.item_id, "Item changed while it was being updated");
        return Err(ServiceError::InvalidState(
            "Item status changed while it was being updated, please retry".to_string(),
        ));
    }
    Ok(())
}

async fn images_for<C: ConnectionTrait>(
    conn: &C,
    item_id: &str,
) -> Result<Vec<item_image::Model>, ServiceError> {
    Ok(item_image::Entity::find()
        .filter(item_image::Column::ItemId.eq(item_id))
        .order_by_asc(item_image::Column::Position)
        .order_by_asc(item_image::Column::CreatedAt)
        .all(conn)
        .await?)
}

async fn insert_images<C: ConnectionTrait>(
    conn: &C,
    item_id: &str,
    blobs: Vec<StoredBlob>,
    first_position: i32,
    first_is_primary: bool,
) -> Result<(), ServiceError> {
    let now = Utc::now();
    for (offset, blob) in (0i32..).zip(blobs) {
        item_image::ActiveModel {
            image_id: Set(Uuid::new_v4().to_string()),
            item_id: Set(item_id.to_string()),
            image_url: Set(blob.url),
            public_id: Set(blob.public_id),
            is_primary: Set(first_is_primary && offset == 0),
            position: Set(first_position + offset),
            created_at: Set(now),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

/// Once an item has images exactly one of them is primary. When none is,
/// the earliest remaining image is promoted.
async fn ensure_primary<C: ConnectionTrait>(conn: &C, item_id: &str) -> Result<(), ServiceError> {
    let images = images_for(conn, item_id).await?;
    let primaries: Vec<&item_image::Model> = images.iter().filter(|img| img.is_primary).collect();

    let keep = match primaries.first() {
        Some(first) => first.image_id.clone(),
        None => match images.first() {
            Some(earliest) => earliest.image_id.clone(),
            None => return Ok(()),
        },
    };

    if primaries.len() == 1 {
        return Ok(());
    }
    if primaries.len() > 1 {
        warn!(item_id = %item_id, count = primaries.len(), "Multiple primary images, keeping one");
    }

    item_image::Entity::update_many()
        .col_expr(item_image::Column::IsPrimary, Expr::value(false))
        .filter(item_image::Column::ItemId.eq(item_id))
        .exec(conn)
        .await?;
    item_image::Entity::update_many()
        .col_expr(item_image::Column::IsPrimary, Expr::value(true))
        .filter(item_image::Column::ImageId.eq(keep))
        .exec(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{listed_item, memory_db};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn flip_to_reserved(db: &DatabaseConnection, item_id: &str) {
        item::Entity::update_many()
            .col_expr(item::Column::Status, Expr::value(ItemStatus::Reserved))
            .filter(item::Column::ItemId.eq(item_id))
            .exec(db)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn stale_edit_keeps_a_reservation_made_after_the_read() {
        let db = memory_db().await;
        let snapshot = listed_item(&db).await;
        flip_to_reserved(&db, &snapshot.item_id).await;

        let update = ItemUpdate {
            price: Some(dec!(12.50)),
            ..Default::default()
        };
        write_item(&db, &snapshot, &update, snapshot.quantity, snapshot.status)
            .await
            .unwrap();

        let stored = item::Entity::find_by_id(snapshot.item_id.clone())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ItemStatus::Reserved);
        assert_eq!(stored.price, dec!(12.50));
    }

    #[tokio::test]
    async fn stale_status_change_is_rejected() {
        let db = memory_db().await;
        let snapshot = listed_item(&db).await;
        flip_to_reserved(&db, &snapshot.item_id).await;

        let update = ItemUpdate {
            quantity: Some(0),
            ..Default::default()
        };
        let result = write_item(&db, &snapshot, &update, 0, ItemStatus::OutOfStock).await;
        assert_matches!(result, Err(ServiceError::InvalidState(_)));

        let stored = item::Entity::find_by_id(snapshot.item_id.clone())
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ItemStatus::Reserved);
        assert_eq!(stored.quantity, 1);
    }

    #[test]
    fn price_must_be_positive() {
        assert!(validate_price(dec!(0.01)).is_ok());
        assert!(validate_price(Decimal::ZERO).is_err());
        assert!(validate_price(dec!(-3)).is_err());
    }

    #[test]
    fn quantity_may_be_zero_but_not_negative() {
        assert!(validate_quantity(0).is_ok());
        assert!(validate_quantity(-1).is_err());
    }

    #[test]
    fn at_most_five_images_per_upload() {
        assert!(validate_upload_count(5).is_ok());
        assert!(validate_upload_count(6).is_err());
    }
}
