use chrono::Utc;
use metrics::counter;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        reservation::{self, ReservationStatus},
        review, store,
    },
    errors::ServiceError,
};

const RATING_ERROR: &str = "Rating must be between 1 and 5";

/// Review input as received. Fields stay loosely typed so a bad rating is
/// reported before anything else.
#[derive(Debug, Clone, Default)]
pub struct ReviewInput {
    pub reservation_id: Option<Value>,
    pub rating: Option<Value>,
    pub review: Option<Value>,
}

/// Accepts whole numbers 1 through 5, as JSON integers or integral floats.
pub fn parse_rating(value: Option<&Value>) -> Option<i32> {
    let Value::Number(number) = value? else {
        return None;
    };
    let rating = match number.as_i64() {
        Some(n) => n,
        None => {
            let f = number.as_f64()?;
            if f.fract() != 0.0 {
                return None;
            }
            f as i64
        }
    };
    (1..=5).contains(&rating).then_some(rating as i32)
}

#[derive(Clone)]
pub struct ReviewService {
    db_pool: Arc<DatabaseConnection>,
}

impl ReviewService {
    pub fn new(db_pool: Arc<DatabaseConnection>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(uid = %uid))]
    pub async fn create(&self, uid: &str, input: ReviewInput) -> Result<review::Model, ServiceError> {
        let db = &*self.db_pool;

        let rating = parse_rating(input.rating.as_ref())
            .ok_or_else(|| ServiceError::InvalidInput(RATING_ERROR.to_string()))?;
        let reservation_id = input
            .reservation_id
            .as_ref()
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ServiceError::InvalidInput("reservationId is required".to_string()))?;
        let text = match input.review {
            Some(Value::String(text)) => text.trim().to_string(),
            _ => String::new(),
        };

        let reservation = reservation::Entity::find_by_id(reservation_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Reservation"))?;
        if reservation.user_id != uid {
            return Err(ServiceError::Forbidden(
                "Unauthorized to review this reservation".to_string(),
            ));
        }
        if reservation.status != ReservationStatus::Sold {
            return Err(ServiceError::InvalidState(
                "Only sold reservations can be reviewed".to_string(),
            ));
        }

        let already_reviewed = review::Entity::find()
            .filter(review::Column::ReservationId.eq(reservation_id))
            .one(db)
            .await?
            .is_some();
        if already_reviewed {
            return Err(already_reviewed_error());
        }

        let review = review::ActiveModel {
            review_id: Set(Uuid::new_v4().to_string()),
            reservation_id: Set(reservation.reservation_id.clone()),
            item_id: Set(reservation.item_id.clone()),
            store_id: Set(reservation.store_id.clone()),
            user_id: Set(uid.to_string()),
            rating: Set(rating),
            review: Set(text),
            created_at: Set(Utc::now()),
        }
        .insert(db)
        .await
        .map_err(duplicate_review_as_input_error)?;

        counter!("thrift_market.reviews.created", 1);
        info!(review_id = %review.review_id, store_id = %review.store_id, rating, "Review created");
        Ok(review)
    }

    /// Reviews of one store, newest first.
    #[instrument(skip(self))]
    pub async fn list_for_store(&self, store_id: &str) -> Result<Vec<review::Model>, ServiceError> {
        let db = &*self.db_pool;
        if store::Entity::find_by_id(store_id.to_string())
            .one(db)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Store"));
        }
        Ok(review::Entity::find()
            .filter(review::Column::StoreId.eq(store_id))
            .order_by_desc(review::Column::CreatedAt)
            .all(db)
            .await?)
    }
}

fn already_reviewed_error() -> ServiceError {
    ServiceError::InvalidInput("This reservation has already been reviewed".to_string())
}

/// A concurrent review of the same reservation trips the unique key on
/// `reservation_id`; report it like the up-front duplicate check does.
fn duplicate_review_as_input_error(err: DbErr) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => already_reviewed_error(),
        _ => err.into(),
    }
}
