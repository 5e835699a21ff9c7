use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, Condition};

use crate::entities::item::{self, ItemStatus};

/// Listing filters. Equality filters and the price range are pushed down to
/// the database; the free-text query is matched in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFilters {
    pub category: Option<String>,
    pub style: Option<String>,
    pub department: Option<String>,
    pub status: Option<ItemStatus>,
    pub store_id: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub q: Option<String>,
}

impl ItemFilters {
    pub fn condition(&self) -> Condition {
        let mut condition = Condition::all();
        if let Some(category) = &self.category {
            condition = condition.add(item::Column::Category.eq(category.as_str()));
        }
        if let Some(style) = &self.style {
            condition = condition.add(item::Column::Style.eq(style.as_str()));
        }
        if let Some(department) = &self.department {
            condition = condition.add(item::Column::Department.eq(department.as_str()));
        }
        if let Some(status) = self.status {
            condition = condition.add(item::Column::Status.eq(status));
        }
        if let Some(store_id) = &self.store_id {
            condition = condition.add(item::Column::StoreId.eq(store_id.as_str()));
        }
        if let Some(min) = self.min_price {
            condition = condition.add(item::Column::Price.gte(min));
        }
        if let Some(max) = self.max_price {
            condition = condition.add(item::Column::Price.lte(max));
        }
        condition
    }

    /// Case-insensitive substring match of `q` over name and description.
    pub fn matches_text(&self, item: &item::Model) -> bool {
        let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
            return true;
        };
        let needle = q.to_lowercase();
        item.name.to_lowercase().contains(&needle)
            || item
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle))
    }
}
