use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const OUTFIT_SLOTS: usize = 9;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "outfits")]
#[serde(rename_all = "camelCase")]
#[schema(as = Outfit)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub outfit_id: String,
    pub user_id: String,
    #[sea_orm(nullable)]
    pub name: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub slots: OutfitSlots,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Nine item references, `None` for an empty slot.
#[derive(
    Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult, ToSchema,
)]
#[serde(transparent)]
pub struct OutfitSlots(pub Vec<Option<String>>);

impl OutfitSlots {
    pub fn new(slots: Vec<Option<String>>) -> Option<Self> {
        (slots.len() == OUTFIT_SLOTS).then_some(Self(slots))
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|slot| slot.as_deref())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
