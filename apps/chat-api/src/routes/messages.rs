//! Message send and history endpoints.

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::db::schema::{chat_members, chat_messages, users};
use crate::delivery;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::membership;
use crate::models::chat_message::{ChatMessage, MessageView};
use crate::AppState;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 100;
const MAX_MESSAGE_LEN: usize = 4000;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/messages", post(send_message).get(list_grouped_messages))
        .route("/chats/{chat_id}/messages", get(list_messages))
}

// ---------------------------------------------------------------------------
// POST /api/v1/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub chat_id: i64,
    pub message_text: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SendMessageResponse {
    pub message: String,
    pub data: ChatMessage,
}

/// Store a message, push it to connected members, and notify everyone else in the chat.
#[utoipa::path(
    post,
    path = "/api/v1/messages",
    tag = "Messages",
    request_body = SendMessageRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Message stored and delivered", body = SendMessageResponse),
        (status = 400, description = "Invalid request", body = ApiErrorBody),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Caller is not a member", body = ApiErrorBody),
        (status = 404, description = "Chat not found", body = ApiErrorBody),
        (status = 500, description = "Storage or notification failure", body = ApiErrorBody),
    ),
)]
pub async fn send_message(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<Json<SendMessageResponse>, ApiError> {
    let Json(body) = body?;

    if body.message_text.trim().is_empty() {
        return Err(ApiError::validation(vec![FieldError {
            field: "message_text".to_string(),
            message: "Message text is required".to_string(),
        }]));
    }
    if body.message_text.chars().count() > MAX_MESSAGE_LEN {
        return Err(ApiError::validation(vec![FieldError {
            field: "message_text".to_string(),
            message: format!("Message text must be {MAX_MESSAGE_LEN} characters or fewer"),
        }]));
    }

    let message = delivery::ingest_message(&state, &auth, body.chat_id, &body.message_text).await?;

    Ok(Json(SendMessageResponse {
        message: "message sent successfully".to_string(),
        data: message,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chats/{chat_id}/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMessagesQuery {
    /// Page size, 1-100 (default 50).
    pub limit: Option<i64>,
    /// Only return messages with an id lower than this.
    pub before: Option<i64>,
}

/// One page of a chat's history, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/chats/{chat_id}/messages",
    tag = "Messages",
    params(("chat_id" = i64, Path, description = "Chat id"), ListMessagesQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Messages", body = Vec<MessageView>),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Caller is not a member", body = ApiErrorBody),
        (status = 404, description = "Chat not found", body = ApiErrorBody),
    ),
)]
pub async fn list_messages(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    query: Result<Query<ListMessagesQuery>, QueryRejection>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let Query(query) = query?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    membership::require_member(&state.db, chat_id, auth.user_id).await?;

    let mut conn = state.db.get().await?;

    let mut q = chat_messages::table
        .left_join(users::table)
        .filter(chat_messages::chat_id.eq(chat_id))
        .select((ChatMessage::as_select(), users::username.nullable()))
        .order((chat_messages::sent_at.desc(), chat_messages::id.desc()))
        .limit(limit)
        .into_boxed();
    if let Some(before) = query.before {
        q = q.filter(chat_messages::id.lt(before));
    }

    let mut rows: Vec<(ChatMessage, Option<String>)> =
        diesel_async::RunQueryDsl::load(q, &mut conn).await?;
    rows.reverse();

    Ok(Json(
        rows.into_iter()
            .map(|(message, username)| MessageView::new(message, username))
            .collect(),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/v1/messages
// ---------------------------------------------------------------------------

/// Every message in every chat the caller belongs to, keyed by chat id.
#[utoipa::path(
    get,
    path = "/api/v1/messages",
    tag = "Messages",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Messages grouped by chat id", body = BTreeMap<String, Vec<MessageView>>),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
    ),
)]
pub async fn list_grouped_messages(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<i64, Vec<MessageView>>>, ApiError> {
    let mut conn = state.db.get().await?;

    let rows: Vec<(ChatMessage, Option<String>)> = diesel_async::RunQueryDsl::load(
        chat_messages::table
            .inner_join(
                chat_members::table.on(chat_members::chat_id
                    .eq(chat_messages::chat_id)
                    .and(chat_members::user_id.eq(auth.user_id))),
            )
            .left_join(users::table.on(users::id.eq(chat_messages::user_id)))
            .order((
                chat_messages::chat_id.asc(),
                chat_messages::sent_at.asc(),
                chat_messages::id.asc(),
            ))
            .select((ChatMessage::as_select(), users::username.nullable())),
        &mut conn,
    )
    .await?;

    let mut grouped: BTreeMap<i64, Vec<MessageView>> = BTreeMap::new();
    for (message, username) in rows {
        grouped
            .entry(message.chat_id)
            .or_default()
            .push(MessageView::new(message, username));
    }

    Ok(Json(grouped))
}
