use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::chat_messages;

/// A persisted chat message. Rows are append-only.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = chat_messages)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMessage {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub message_text: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_messages)]
pub struct NewChatMessage<'a> {
    pub chat_id: i64,
    pub user_id: i64,
    pub message_text: &'a str,
    pub sent_at: DateTime<Utc>,
}

/// Message as returned by history endpoints, with the sender's username resolved.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageView {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub username: Option<String>,
    pub message_text: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageView {
    pub fn new(message: ChatMessage, username: Option<String>) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            user_id: message.user_id,
            username,
            message_text: message.message_text,
            sent_at: message.sent_at,
        }
    }
}
