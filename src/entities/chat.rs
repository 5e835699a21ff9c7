use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Two-party conversation. `chat_id` is derived from the participants, see [`chat_id`].
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "chats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub chat_id: String,
    /// Lexicographically smaller participant
    pub participant_a: String,
    pub participant_b: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_message: Option<String>,
    #[sea_orm(nullable)]
    pub last_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::message::Entity")]
    Messages,
}

impl Related<super::message::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when this chat belongs to exactly the given pair, in either order.
    pub fn is_between(&self, a: &str, b: &str) -> bool {
        let (first, second) = ordered_pair(a, b);
        self.participant_a == first && self.participant_b == second
    }

    pub fn has_participant(&self, uid: &str) -> bool {
        self.participant_a == uid || self.participant_b == uid
    }

    pub fn other_participant(&self, uid: &str) -> &str {
        if self.participant_a == uid {
            &self.participant_b
        } else {
            &self.participant_a
        }
    }
}

/// Sorts the two uids and joins them with `_`, so both sides resolve to the same chat.
///
/// Inside each uid `~` becomes `~~` and `_` becomes `~u`, which leaves the
/// joining `_` as the only bare underscore. Distinct pairs therefore never
/// share an id, and plain alphanumeric uids keep the readable `alice_bob` form.
pub fn chat_id(a: &str, b: &str) -> String {
    let (first, second) = ordered_pair(a, b);
    format!("{}_{}", escape_uid(first), escape_uid(second))
}

fn escape_uid(uid: &str) -> String {
    let mut escaped = String::with_capacity(uid.len());
    for ch in uid.chars() {
        match ch {
            '~' => escaped.push_str("~~"),
            '_' => escaped.push_str("~u"),
            other => escaped.push(other),
        }
    }
    escaped
}

pub fn ordered_pair<'a>(a: &'a str, b: &'a str) -> (&'a str, &'a str) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
