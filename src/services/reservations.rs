use chrono::Utc;
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{chat::{append_message, ChatHub}, stores::update_store_rating};
use crate::{
    entities::{
        item::{self, ItemStatus},
        item_image,
        reservation::{self, ReservationStatus},
        store,
        user::{self, UserRole},
    },
    errors::ServiceError,
};

/// Reservation plus enough of the item to render a list row.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationView {
    #[serde(flatten)]
    pub reservation: reservation::Model,
    pub item_name: Option<String>,
    pub item_image_url: Option<String>,
}

/// Result of a customer confirming a sale.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedReservation {
    pub reservation: reservation::Model,
    pub average_rating: f64,
    pub review_count: i32,
}

fn reservation_message(item_name: &str) -> String {
    format!("Hi! I just reserved your item \"{}\".", item_name)
}

/// The reservation workflow: reserve, owner status changes, customer confirmation.
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DatabaseConnection>,
    hub: ChatHub,
}

impl ReservationService {
    pub fn new(db_pool: Arc<DatabaseConnection>, hub: ChatHub) -> Self {
        Self { db_pool, hub }
    }

    /// Reserves an available item for the caller and notifies the store owner
    /// through chat. The item flips to Reserved only if it is still Available
    /// when the update runs.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn reserve(
        &self,
        uid: &str,
        item_id: &str,
        store_id: &str,
    ) -> Result<reservation::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let item = item::Entity::find_by_id(item_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Item"))?;
        if item.status != ItemStatus::Available {
            return Err(ServiceError::InvalidState(
                "Item is not available for reservation".to_string(),
            ));
        }
        if item.store_id != store_id {
            return Err(ServiceError::InvalidStore(
                "Item does not belong to this store".to_string(),
            ));
        }

        claim_item(&txn, item_id).await?;

        let store = store::Entity::find_by_id(store_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Store"))?;

        let now = Utc::now();
        let reservation = reservation::ActiveModel {
            reservation_id: Set(Uuid::new_v4().to_string()),
            item_id: Set(item.item_id.clone()),
            user_id: Set(uid.to_string()),
            store_id: Set(store.store_id.clone()),
            status: Set(ReservationStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let message = append_message(&txn, uid, &store.owner_id, &reservation_message(&item.name)).await?;
        txn.commit().await?;

        counter!("thrift_market.reservations.created", 1);
        self.hub.publish(message);
        info!(
            reservation_id = %reservation.reservation_id,
            item_id = %item_id,
            store_id = %store_id,
            "Item reserved"
        );
        Ok(reservation)
    }

    /// Store owners see their store's reservations, everyone else their own.
    #[instrument(skip(self))]
    pub async fn list_for(&self, uid: &str) -> Result<Vec<ReservationView>, ServiceError> {
        let db = &*self.db_pool;
        let role = user::Entity::find_by_id(uid.to_string())
            .one(db)
            .await?
            .map(|u| u.role);

        let owned_store = match role {
            Some(UserRole::StoreOwner) => store::Entity::find()
                .filter(store::Column::OwnerId.eq(uid))
                .one(db)
                .await?,
            _ => None,
        };

        let query = match &owned_store {
            Some(store) => reservation::Entity::find()
                .filter(reservation::Column::StoreId.eq(store.store_id.as_str())),
            None => reservation::Entity::find().filter(reservation::Column::UserId.eq(uid)),
        };
        let reservations = query
            .order_by_desc(reservation::Column::CreatedAt)
            .all(db)
            .await?;

        let item_ids: Vec<String> = reservations.iter().map(|r| r.item_id.clone()).collect();
        let names: HashMap<String, String> = item::Entity::find()
            .filter(item::Column::ItemId.is_in(item_ids.clone()))
            .all(db)
            .await?
            .into_iter()
            .map(|i| (i.item_id, i.name))
            .collect();
        let images: HashMap<String, String> = item_image::Entity::find()
            .filter(item_image::Column::ItemId.is_in(item_ids))
            .filter(item_image::Column::IsPrimary.eq(true))
            .all(db)
            .await?
            .into_iter()
            .map(|img| (img.item_id, img.image_url))
            .collect();

        Ok(reservations
            .into_iter()
            .map(|reservation| ReservationView {
                item_name: names.get(&reservation.item_id).cloned(),
                item_image_url: images.get(&reservation.item_id).cloned(),
                reservation,
            })
            .collect())
    }

    /// Owner-driven status change. Sold marks the item sold, Cancelled releases it.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn update_status(
        &self,
        uid: &str,
        reservation_id: &str,
        status: &str,
    ) -> Result<reservation::Model, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let current = reservation::Entity::find_by_id(reservation_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation"))?;

        let owns_store = store::Entity::find_by_id(current.store_id.clone())
            .one(&txn)
            .await?
            .is_some_and(|s| s.owner_id == uid);
        if !owns_store {
            return Err(ServiceError::Forbidden(
                "Unauthorized to update this reservation".to_string(),
            ));
        }

        let next = match ReservationStatus::parse(status) {
            Some(ReservationStatus::Completed) => {
                return Err(ServiceError::InvalidInput(
                    "Only the customer can complete a reservation".to_string(),
                ))
            }
            Some(next) => next,
            None => return Err(ServiceError::InvalidInput("Invalid status".to_string())),
        };

        if !current.status.owner_can_transition_to(next) {
            return Err(ServiceError::InvalidState(format!(
                "Cannot change reservation status from {} to {}",
                current.status, next
            )));
        }

        let updated = reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value(next))
            .col_expr(reservation::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(reservation::Column::ReservationId.eq(reservation_id))
            .filter(reservation::Column::Status.eq(current.status))
            .exec(&txn)
            .await?;
        if updated.rows_affected == 0 {
            return Err(ServiceError::InvalidState(
                "Reservation was modified concurrently".to_string(),
            ));
        }

        let item_status = match next {
            ReservationStatus::Sold => Some(ItemStatus::Sold),
            ReservationStatus::Cancelled => Some(ItemStatus::Available),
            _ => None,
        };
        if let Some(item_status) = item_status {
            let touched = item::Entity::update_many()
                .col_expr(item::Column::Status, Expr::value(item_status))
                .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(item::Column::ItemId.eq(current.item_id.as_str()))
                .exec(&txn)
                .await?;
            if touched.rows_affected == 0 {
                warn!(item_id = %current.item_id, "Reserved item no longer exists");
            }
        }

        let reservation = reservation::Entity::find_by_id(reservation_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation"))?;
        txn.commit().await?;

        counter!("thrift_market.reservations.status_changed", 1, "status" => next.as_str());
        info!(
            reservation_id = %reservation_id,
            from = %current.status,
            to = %next,
            "Reservation status updated"
        );
        Ok(reservation)
    }

    /// Customer confirmation of a sale. Completes the reservation and
    /// refreshes the store rating.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn confirm(
        &self,
        uid: &str,
        reservation_id: &str,
    ) -> Result<ConfirmedReservation, ServiceError> {
        let txn = self.db_pool.begin().await?;

        let current = reservation::Entity::find_by_id(reservation_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation"))?;
        if current.user_id != uid {
            return Err(ServiceError::Forbidden(
                "Unauthorized to confirm this reservation".to_string(),
            ));
        }
        if current.status != ReservationStatus::Sold {
            return Err(ServiceError::InvalidState(
                "Only sold reservations can be confirmed".to_string(),
            ));
        }

        let mut active: reservation::ActiveModel = current.into();
        active.status = Set(ReservationStatus::Completed);
        active.updated_at = Set(Utc::now());
        let reservation = active.update(&txn).await?;

        let (average_rating, review_count) = update_store_rating(&txn, &reservation.store_id).await?;
        txn.commit().await?;

        counter!("thrift_market.reservations.completed", 1);
        info!(reservation_id = %reservation_id, "Reservation completed");
        Ok(ConfirmedReservation {
            reservation,
            average_rating,
            review_count,
        })
    }
}

/// Flips the item from Available to Reserved. Fails when another request got
/// there first, whatever the caller read earlier.
pub(crate) async fn claim_item<C: ConnectionTrait>(
    conn: &C,
    item_id: &str,
) -> Result<(), ServiceError> {
    let flipped = item::Entity::update_many()
        .col_expr(item::Column::Status, Expr::value(ItemStatus::Reserved))
        .col_expr(item::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(item::Column::ItemId.eq(item_id))
        .filter(item::Column::Status.eq(ItemStatus::Available))
        .exec(conn)
        .await?;
    if flipped.rows_affected == 0 {
        warn!(item_id = %item_id, "Item was reserved concurrently");
        return Err(ServiceError::InvalidState(
            "Item is not available for reservation".to_string(),
        ));
    }
    Ok(())
}
