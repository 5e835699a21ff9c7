use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait,
    DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entities::{
        chat::{self, chat_id, ordered_pair},
        message, user,
    },
    errors::ServiceError,
};

/// Fan-out of newly stored messages to live subscribers.
#[derive(Debug, Clone)]
pub struct ChatHub {
    sender: broadcast::Sender<message::Model>,
}

impl ChatHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes a stored message. Having nobody listening is not an error.
    pub fn publish(&self, message: message::Model) {
        let receivers = self.sender.send(message).unwrap_or(0);
        debug!(receivers, "Chat message published");
    }

    pub fn subscribe(&self) -> broadcast::Receiver<message::Model> {
        self.sender.subscribe()
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub chat_id: String,
    pub participants: Vec<String>,
    pub other_user_id: String,
    pub other_user_name: Option<String>,
    pub last_message: Option<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
    /// Messages addressed to the caller that are still unread
    pub unread_count: u64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatView {
    pub chat_id: String,
    pub participants: Vec<String>,
    pub last_message: Option<String>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<chat::Model> for ChatView {
    fn from(model: chat::Model) -> Self {
        Self {
            participants: vec![model.participant_a, model.participant_b],
            chat_id: model.chat_id,
            last_message: model.last_message,
            last_timestamp: model.last_timestamp,
            created_at: model.created_at,
        }
    }
}

/// Buyer/seller conversations.
#[derive(Clone)]
pub struct ChatService {
    db_pool: Arc<DatabaseConnection>,
    hub: ChatHub,
}

impl ChatService {
    pub fn new(db_pool: Arc<DatabaseConnection>, hub: ChatHub) -> Self {
        Self { db_pool, hub }
    }

    /// Chats the caller takes part in, most recent activity first.
    #[instrument(skip(self))]
    pub async fn list_chats(&self, uid: &str) -> Result<Vec<ChatSummary>, ServiceError> {
        let db = &*self.db_pool;
        let mut chats = chat::Entity::find()
            .filter(
                Condition::any()
                    .add(chat::Column::ParticipantA.eq(uid))
                    .add(chat::Column::ParticipantB.eq(uid)),
            )
            .all(db)
            .await?;
        chats.sort_by(|a, b| {
            b.last_timestamp
                .cmp(&a.last_timestamp)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        let others: Vec<String> = chats
            .iter()
            .map(|c| c.other_participant(uid).to_string())
            .collect();
        let names: HashMap<String, String> = user::Entity::find()
            .filter(user::Column::Uid.is_in(others))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.uid, u.name))
            .collect();

        let mut summaries = Vec::with_capacity(chats.len());
        for chat in chats {
            let unread_count = message::Entity::find()
                .filter(message::Column::ChatId.eq(chat.chat_id.as_str()))
                .filter(message::Column::ReceiverId.eq(uid))
                .filter(message::Column::Read.eq(false))
                .count(db)
                .await?;
            let other_user_id = chat.other_participant(uid).to_string();
            summaries.push(ChatSummary {
                other_user_name: names.get(&other_user_id).cloned(),
                participants: vec![chat.participant_a, chat.participant_b],
                chat_id: chat.chat_id,
                other_user_id,
                last_message: chat.last_message,
                last_timestamp: chat.last_timestamp,
                unread_count,
                created_at: chat.created_at,
            });
        }
        Ok(summaries)
    }

    #[instrument(skip(self))]
    pub async fn get_or_create(
        &self,
        uid: &str,
        other_user_id: &str,
    ) -> Result<chat::Model, ServiceError> {
        let db = &*self.db_pool;
        let other_user_id = other_user_id.trim();
        if other_user_id.is_empty() {
            return Err(ServiceError::InvalidInput("otherUserId is required".to_string()));
        }
        if other_user_id == uid {
            return Err(ServiceError::InvalidInput(
                "You cannot start a chat with yourself".to_string(),
            ));
        }
        if user::Entity::find_by_id(other_user_id.to_string())
            .one(db)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("User"));
        }

        get_or_create_chat(db, uid, other_user_id).await
    }

    /// Loads the chat and checks the caller is one of its two participants.
    async fn participant_chat(&self, uid: &str, chat_id: &str) -> Result<chat::Model, ServiceError> {
        let db = &*self.db_pool;
        let chat = chat::Entity::find_by_id(chat_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Chat"))?;
        if !chat.has_participant(uid) {
            return Err(ServiceError::Forbidden(
                "You are not a participant in this chat".to_string(),
            ));
        }
        Ok(chat)
    }

    /// Messages of one chat, oldest first.
    #[instrument(skip(self))]
    pub async fn messages(
        &self,
        uid: &str,
        chat_id: &str,
    ) -> Result<Vec<message::Model>, ServiceError> {
        let db = &*self.db_pool;
        self.participant_chat(uid, chat_id).await?;
        Ok(message::Entity::find()
            .filter(message::Column::ChatId.eq(chat_id))
            .order_by_asc(message::Column::Timestamp)
            .all(db)
            .await?)
    }

    #[instrument(skip(self, text))]
    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        text: &str,
    ) -> Result<message::Model, ServiceError> {
        let receiver_id = receiver_id.trim();
        let text = text.trim();
        if receiver_id.is_empty() {
            return Err(ServiceError::InvalidInput("receiverId is required".to_string()));
        }
        if text.is_empty() {
            return Err(ServiceError::InvalidInput("Message text is required".to_string()));
        }
        if receiver_id == sender_id {
            return Err(ServiceError::InvalidInput(
                "You cannot message yourself".to_string(),
            ));
        }
        if user::Entity::find_by_id(receiver_id.to_string())
            .one(&*self.db_pool)
            .await?
            .is_none()
        {
            return Err(ServiceError::not_found("Recipient"));
        }

        let txn = self.db_pool.begin().await?;
        let message = append_message(&txn, sender_id, receiver_id, text).await?;
        txn.commit().await?;

        counter!("thrift_market.messages.sent", 1);
        self.hub.publish(message.clone());
        Ok(message)
    }

    /// Marks every unread message addressed to the caller as read. Returns how many flipped.
    #[instrument(skip(self))]
    pub async fn mark_read(&self, uid: &str, chat_id: &str) -> Result<u64, ServiceError> {
        let db = &*self.db_pool;
        self.participant_chat(uid, chat_id).await?;
        let result = message::Entity::update_many()
            .col_expr(message::Column::Read, Expr::value(true))
            .filter(message::Column::ChatId.eq(chat_id))
            .filter(message::Column::ReceiverId.eq(uid))
            .filter(message::Column::Read.eq(false))
            .exec(db)
            .await?;
        debug!(chat_id = %chat_id, marked = result.rows_affected, "Messages marked read");
        Ok(result.rows_affected)
    }

    /// Live feed for one chat; the caller must be a participant.
    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        uid: &str,
        chat_id: &str,
    ) -> Result<broadcast::Receiver<message::Model>, ServiceError> {
        self.participant_chat(uid, chat_id).await?;
        Ok(self.hub.subscribe())
    }
}

pub(crate) async fn get_or_create_chat<C: ConnectionTrait>(
    conn: &C,
    a: &str,
    b: &str,
) -> Result<chat::Model, ServiceError> {
    let id = chat_id(a, b);
    if let Some(existing) = chat::Entity::find_by_id(id.clone()).one(conn).await? {
        if !existing.is_between(a, b) {
            error!(chat_id = %id, "Chat id resolves to a different pair of participants");
            return Err(ServiceError::InternalError(
                "Chat participants do not match".to_string(),
            ));
        }
        return Ok(existing);
    }

    let (first, second) = ordered_pair(a, b);
    let chat = chat::ActiveModel {
        chat_id: Set(id),
        participant_a: Set(first.to_string()),
        participant_b: Set(second.to_string()),
        last_message: Set(None),
        last_timestamp: Set(None),
        created_at: Set(Utc::now()),
    }
    .insert(conn)
    .await?;
    info!(chat_id = %chat.chat_id, "Chat created");
    Ok(chat)
}

/// Stores a message in the sender/receiver chat, creating the chat when
/// needed, and bumps the chat's last message. Publishing is left to the
/// caller once its transaction commits.
pub(crate) async fn append_message<C: ConnectionTrait>(
    conn: &C,
    sender_id: &str,
    receiver_id: &str,
    text: &str,
) -> Result<message::Model, ServiceError> {
    let chat = get_or_create_chat(conn, sender_id, receiver_id).await?;
    let now = Utc::now();

    let message = message::ActiveModel {
        message_id: Set(Uuid::new_v4().to_string()),
        chat_id: Set(chat.chat_id.clone()),
        sender_id: Set(sender_id.to_string()),
        receiver_id: Set(receiver_id.to_string()),
        text: Set(text.to_string()),
        read: Set(false),
        timestamp: Set(now),
    }
    .insert(conn)
    .await?;

    chat::Entity::update_many()
        .col_expr(chat::Column::LastMessage, Expr::value(text))
        .col_expr(chat::Column::LastTimestamp, Expr::value(now))
        .filter(chat::Column::ChatId.eq(chat.chat_id.as_str()))
        .exec(conn)
        .await?;

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(chat_id: &str) -> message::Model {
        message::Model {
            message_id: "m1".into(),
            chat_id: chat_id.into(),
            sender_id: "a".into(),
            receiver_id: "b".into(),
            text: "hello".into(),
            read: false,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn hub_delivers_to_every_subscriber() {
        let hub = ChatHub::new(8);
        let mut first = hub.subscribe();
        let mut second = hub.subscribe();

        hub.publish(message("a_b"));

        assert_eq!(first.recv().await.unwrap().chat_id, "a_b");
        assert_eq!(second.recv().await.unwrap().chat_id, "a_b");
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        ChatHub::new(1).publish(message("a_b"));
    }

    #[tokio::test]
    async fn slow_subscribers_lag_instead_of_blocking() {
        let hub = ChatHub::new(2);
        let mut rx = hub.subscribe();
        for _ in 0..4 {
            hub.publish(message("a_b"));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert!(rx.recv().await.is_ok());
    }

    #[test]
    fn chat_view_lists_both_participants() {
        let view = ChatView::from(chat::Model {
            chat_id: "a_b".into(),
            participant_a: "a".into(),
            participant_b: "b".into(),
            last_message: None,
            last_timestamp: None,
            created_at: Utc::now(),
        });
        assert_eq!(view.participants, vec!["a".to_string(), "b".to_string()]);
    }
}
