use diesel::prelude::*;
use diesel::result::OptionalExtension;

use crate::db::pool::DbPool;
use crate::db::schema::{chat_members, chats};
use crate::error::ApiError;
use crate::models::chat::Chat;

/// Load a chat by id, or 404.
pub async fn find_chat(pool: &DbPool, chat_id: i64) -> Result<Chat, ApiError> {
    let mut conn = pool.get().await?;

    diesel_async::RunQueryDsl::get_result(
        chats::table.find(chat_id).select(Chat::as_select()),
        &mut conn,
    )
    .await
    .optional()?
    .ok_or_else(|| ApiError::not_found("Chat not found"))
}

/// Check if a user belongs to a chat.
pub async fn is_member(pool: &DbPool, chat_id: i64, user_id: i64) -> Result<bool, ApiError> {
    let mut conn = pool.get().await?;

    let count: i64 = diesel_async::RunQueryDsl::get_result(
        chat_members::table
            .filter(chat_members::chat_id.eq(chat_id))
            .filter(chat_members::user_id.eq(user_id))
            .count(),
        &mut conn,
    )
    .await?;

    Ok(count > 0)
}

/// Resolve the chat and require that `user_id` is one of its members.
///
/// Missing chats are 404; non-members get 403.
pub async fn require_member(pool: &DbPool, chat_id: i64, user_id: i64) -> Result<Chat, ApiError> {
    let chat = find_chat(pool, chat_id).await?;

    if !is_member(pool, chat_id, user_id).await? {
        return Err(ApiError::forbidden("You are not a member of this chat"));
    }

    Ok(chat)
}

/// User ids of every member of a chat, in join order.
pub async fn member_ids(pool: &DbPool, chat_id: i64) -> Result<Vec<i64>, ApiError> {
    let mut conn = pool.get().await?;

    let ids = diesel_async::RunQueryDsl::load(
        chat_members::table
            .filter(chat_members::chat_id.eq(chat_id))
            .order((chat_members::joined_at.asc(), chat_members::id.asc()))
            .select(chat_members::user_id),
        &mut conn,
    )
    .await?;

    Ok(ids)
}
