use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::chat_members;

#[derive(Debug, Clone, Queryable, Selectable, Serialize, ToSchema)]
#[diesel(table_name = chat_members)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ChatMember {
    pub id: i64,
    pub chat_id: i64,
    pub user_id: i64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = chat_members)]
pub struct NewChatMember {
    pub chat_id: i64,
    pub user_id: i64,
}

/// Member listing entry. `username` is absent when the user row is gone.
#[derive(Debug, Serialize, ToSchema)]
pub struct Participant {
    pub user_id: i64,
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
}
