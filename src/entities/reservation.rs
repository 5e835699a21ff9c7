use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[sea_orm(table_name = "reservations")]
#[serde(rename_all = "camelCase")]
#[schema(as = Reservation)]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub reservation_id: String,
    pub item_id: String,
    pub user_id: String,
    pub store_id: String,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Reservation lifecycle.
///
/// ```text
/// Pending ──► Confirmed ──► Sold ──► Completed
///    │            │          ▲
///    │            └──► Cancelled
///    └──────────────────┘ (Pending may go straight to Sold or Cancelled)
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
pub enum ReservationStatus {
    #[sea_orm(string_value = "Pending")]
    Pending,
    #[sea_orm(string_value = "Confirmed")]
    Confirmed,
    #[sea_orm(string_value = "Sold")]
    Sold,
    #[sea_orm(string_value = "Completed")]
    Completed,
    #[sea_orm(string_value = "Cancelled")]
    Cancelled,
}

impl ReservationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Pending" => Some(Self::Pending),
            "Confirmed" => Some(Self::Confirmed),
            "Sold" => Some(Self::Sold),
            "Completed" => Some(Self::Completed),
            "Cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Confirmed => "Confirmed",
            Self::Sold => "Sold",
            Self::Completed => "Completed",
            Self::Cancelled => "Cancelled",
        }
    }

    /// Transitions a store owner may request. `Completed` is reached only
    /// through customer confirmation.
    pub fn owner_can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed)
                | (Self::Pending, Self::Sold)
                | (Self::Pending, Self::Cancelled)
                | (Self::Confirmed, Self::Sold)
                | (Self::Confirmed, Self::Cancelled)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn is_active(self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::ReservationStatus::{self, *};
    use rstest::rstest;

    #[rstest]
    #[case(Pending, Confirmed, true)]
    #[case(Pending, Sold, true)]
    #[case(Pending, Cancelled, true)]
    #[case(Confirmed, Sold, true)]
    #[case(Confirmed, Cancelled, true)]
    #[case(Pending, Completed, false)]
    #[case(Confirmed, Completed, false)]
    #[case(Confirmed, Pending, false)]
    #[case(Sold, Cancelled, false)]
    #[case(Sold, Completed, false)]
    #[case(Sold, Confirmed, false)]
    #[case(Completed, Cancelled, false)]
    #[case(Cancelled, Pending, false)]
    #[case(Cancelled, Sold, false)]
    #[case(Pending, Pending, false)]
    fn owner_transition_table(
        #[case] from: ReservationStatus,
        #[case] to: ReservationStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.owner_can_transition_to(to), allowed);
    }

    #[test]
    fn terminal_states() {
        assert!(Completed.is_terminal());
        assert!(Cancelled.is_terminal());
        assert!(Pending.is_active());
        assert!(Sold.is_active());
    }

    #[test]
    fn parse_is_case_sensitive() {
        assert_eq!(ReservationStatus::parse("Sold"), Some(Sold));
        assert_eq!(ReservationStatus::parse("sold"), None);
        assert_eq!(Cancelled.to_string(), "Cancelled");
    }
}
