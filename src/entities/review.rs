use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "reviews")]
#[serde(rename_all = "camelCase")]
#[schema(as = Review)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub review_id: String,
    #[sea_orm(unique)]
    pub reservation_id: String,
    pub item_id: String,
    pub store_id: String,
    pub user_id: String,
    /// 1 to 5 inclusive
    pub rating: i32,
    #[sea_orm(column_type = "Text")]
    pub review: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
