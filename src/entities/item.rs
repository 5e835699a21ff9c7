use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A listed piece of clothing. Images live in `item_image`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "items")]
#[serde(rename_all = "camelCase")]
#[schema(as = Item)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: String,
    pub store_id: String,
    pub name: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    #[sea_orm(nullable)]
    pub category: Option<String>,
    #[sea_orm(nullable)]
    pub style: Option<String>,
    #[sea_orm(nullable)]
    pub department: Option<String>,
    #[sea_orm(nullable)]
    pub size: Option<String>,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub quantity: i32,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::StoreId"
    )]
    Store,
    #[sea_orm(has_many = "super::item_image::Entity")]
    Images,
}

impl Related<super::store::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Store.def()
    }
}

impl Related<super::item_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ItemStatus {
    #[sea_orm(string_value = "Available")]
    Available,
    #[sea_orm(string_value = "Reserved")]
    Reserved,
    #[sea_orm(string_value = "Sold")]
    Sold,
    #[sea_orm(string_value = "Out of Stock")]
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl ItemStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Available" => Some(Self::Available),
            "Reserved" => Some(Self::Reserved),
            "Sold" => Some(Self::Sold),
            "Out of Stock" => Some(Self::OutOfStock),
            _ => None,
        }
    }

    /// Status after a quantity change. Only the Available/Out of Stock pair
    /// follows stock; reservation-driven states are left alone.
    pub fn for_quantity(self, quantity: i32) -> Self {
        match self {
            Self::Available if quantity == 0 => Self::OutOfStock,
            Self::OutOfStock if quantity > 0 => Self::Available,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ItemStatus::Available, 0 => ItemStatus::OutOfStock)]
    #[test_case(ItemStatus::Available, 3 => ItemStatus::Available)]
    #[test_case(ItemStatus::OutOfStock, 2 => ItemStatus::Available)]
    #[test_case(ItemStatus::OutOfStock, 0 => ItemStatus::OutOfStock)]
    #[test_case(ItemStatus::Reserved, 0 => ItemStatus::Reserved)]
    #[test_case(ItemStatus::Sold, 5 => ItemStatus::Sold)]
    fn quantity_drives_stock_status(status: ItemStatus, quantity: i32) -> ItemStatus {
        status.for_quantity(quantity)
    }

    #[test]
    fn out_of_stock_round_trips_through_json() {
        let json = serde_json::to_string(&ItemStatus::OutOfStock).unwrap();
        assert_eq!(json, "\"Out of Stock\"");
        assert_eq!(ItemStatus::parse("Out of Stock"), Some(ItemStatus::OutOfStock));
        assert_eq!(ItemStatus::parse("available"), None);
    }
}
