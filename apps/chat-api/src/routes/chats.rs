//! Chat creation and membership endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, OptionalExtension};
use diesel_async::AsyncConnection;
use scoped_futures::ScopedFutureExt;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::middleware::AuthUser;
use crate::db::schema::{chat_members, chats, users};
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::membership;
use crate::models::chat::{Chat, NewChat};
use crate::models::chat_member::{ChatMember, NewChatMember, Participant};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chats", post(create_chat).get(list_chats))
        .route(
            "/chats/{chat_id}/members",
            post(add_member).get(list_members),
        )
}

fn is_unique_violation(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _)
    )
}

// ---------------------------------------------------------------------------
// POST /api/v1/chats
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateChatRequest {
    pub name: String,
}

/// Create a chat owned by the caller. The caller becomes its first member.
#[utoipa::path(
    post,
    path = "/api/v1/chats",
    tag = "Chats",
    request_body = CreateChatRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Chat created", body = Chat),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 409, description = "Chat name already taken", body = ApiErrorBody),
    ),
)]
pub async fn create_chat(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<CreateChatRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Chat>), ApiError> {
    let Json(body) = body?;

    let name = body.name.trim().to_string();
    if name.is_empty() || name.chars().count() > 100 {
        return Err(ApiError::validation(vec![FieldError {
            field: "name".to_string(),
            message: "Chat name must be 1-100 characters".to_string(),
        }]));
    }

    let mut conn = state.db.get().await?;

    let taken: i64 = diesel_async::RunQueryDsl::get_result(
        chats::table.filter(chats::name.eq(&name)).count(),
        &mut conn,
    )
    .await?;
    if taken > 0 {
        return Err(ApiError::conflict("Chat name already taken"));
    }

    let owner_id = auth.user_id;
    let chat = conn
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let chat: Chat = diesel_async::RunQueryDsl::get_result(
                    diesel::insert_into(chats::table)
                        .values(NewChat {
                            name: &name,
                            owner_id,
                        })
                        .returning(Chat::as_returning()),
                    conn,
                )
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        ApiError::conflict("Chat name already taken")
                    } else {
                        ApiError::from(e)
                    }
                })?;

                diesel_async::RunQueryDsl::execute(
                    diesel::insert_into(chat_members::table).values(NewChatMember {
                        chat_id: chat.id,
                        user_id: owner_id,
                    }),
                    conn,
                )
                .await?;

                Ok(chat)
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(chat_id = chat.id, owner_id, "chat created");

    Ok((StatusCode::CREATED, Json(chat)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chats
// ---------------------------------------------------------------------------

/// Chats the caller belongs to, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/chats",
    tag = "Chats",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's chats", body = Vec<Chat>),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
    ),
)]
pub async fn list_chats(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Chat>>, ApiError> {
    let mut conn = state.db.get().await?;

    let list: Vec<Chat> = diesel_async::RunQueryDsl::load(
        chats::table
            .inner_join(chat_members::table)
            .filter(chat_members::user_id.eq(auth.user_id))
            .order((chats::created_at.asc(), chats::id.asc()))
            .select(Chat::as_select()),
        &mut conn,
    )
    .await?;

    Ok(Json(list))
}

// ---------------------------------------------------------------------------
// POST /api/v1/chats/{chat_id}/members
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddMemberRequest {
    pub username: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddMemberResponse {
    pub message: String,
    pub member: ChatMember,
}

/// Add a user to a chat by username. Only the chat owner may do this.
#[utoipa::path(
    post,
    path = "/api/v1/chats/{chat_id}/members",
    tag = "Chats",
    params(("chat_id" = i64, Path, description = "Chat id")),
    request_body = AddMemberRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Member added", body = AddMemberResponse),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Caller does not own the chat", body = ApiErrorBody),
        (status = 404, description = "Chat or user not found", body = ApiErrorBody),
        (status = 409, description = "User is already a member", body = ApiErrorBody),
    ),
)]
pub async fn add_member(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
    body: Result<Json<AddMemberRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AddMemberResponse>), ApiError> {
    let Json(body) = body?;

    let chat = membership::find_chat(&state.db, chat_id).await?;
    if chat.owner_id != auth.user_id {
        return Err(ApiError::forbidden("Only the chat owner can add members"));
    }

    let mut conn = state.db.get().await?;

    let user_id: i64 = diesel_async::RunQueryDsl::get_result(
        users::table
            .filter(users::username.eq(body.username.trim()))
            .select(users::id),
        &mut conn,
    )
    .await
    .optional()?
    .ok_or_else(|| ApiError::not_found("User not found"))?;

    let member: ChatMember = diesel_async::RunQueryDsl::get_result(
        diesel::insert_into(chat_members::table)
            .values(NewChatMember { chat_id, user_id })
            .returning(ChatMember::as_returning()),
        &mut conn,
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict("User is already a member of this chat")
        } else {
            ApiError::from(e)
        }
    })?;

    tracing::info!(chat_id, user_id, added_by = auth.user_id, "member added");

    Ok((
        StatusCode::CREATED,
        Json(AddMemberResponse {
            message: "user added to chat".to_string(),
            member,
        }),
    ))
}

// ---------------------------------------------------------------------------
// GET /api/v1/chats/{chat_id}/members
// ---------------------------------------------------------------------------

/// Members of a chat in join order. Visible to members only.
#[utoipa::path(
    get,
    path = "/api/v1/chats/{chat_id}/members",
    tag = "Chats",
    params(("chat_id" = i64, Path, description = "Chat id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Chat members", body = Vec<Participant>),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
        (status = 403, description = "Caller is not a member", body = ApiErrorBody),
        (status = 404, description = "Chat not found", body = ApiErrorBody),
    ),
)]
pub async fn list_members(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(chat_id): Path<i64>,
) -> Result<Json<Vec<Participant>>, ApiError> {
    membership::require_member(&state.db, chat_id, auth.user_id).await?;

    let mut conn = state.db.get().await?;

    let rows: Vec<(i64, Option<String>, chrono::DateTime<chrono::Utc>)> =
        diesel_async::RunQueryDsl::load(
            chat_members::table
                .left_join(users::table)
                .filter(chat_members::chat_id.eq(chat_id))
                .order((chat_members::joined_at.asc(), chat_members::id.asc()))
                .select((
                    chat_members::user_id,
                    users::username.nullable(),
                    chat_members::joined_at,
                )),
            &mut conn,
        )
        .await?;

    let participants = rows
        .into_iter()
        .map(|(user_id, username, joined_at)| Participant {
            user_id,
            username,
            joined_at,
        })
        .collect();

    Ok(Json(participants))
}
