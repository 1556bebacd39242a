//! Append and fetch-and-clear endpoints for the per-user inbox.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use diesel::prelude::*;
use diesel_async::AsyncConnection;
use scoped_futures::ScopedFutureExt;
use serde::Serialize;
use utoipa::ToSchema;

use penguin_common::NewNotification;

use crate::db::schema::notifications;
use crate::error::{ApiError, ApiErrorBody};
use crate::models::notification::{NewNotificationRow, Notification};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/addNotification", post(add_notification))
        .route("/notifications/{user_id}", get(fetch_notifications))
}

// ---------------------------------------------------------------------------
// POST /addNotification
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, ToSchema)]
pub struct AddNotificationResponse {
    pub status: String,
}

/// Append one notification to a user's inbox.
#[utoipa::path(
    post,
    path = "/addNotification",
    tag = "Notifications",
    request_body = NewNotification,
    responses(
        (status = 200, description = "Notification stored", body = AddNotificationResponse),
        (status = 400, description = "Malformed body", body = ApiErrorBody),
        (status = 500, description = "Storage failure", body = ApiErrorBody),
    ),
)]
pub async fn add_notification(
    State(state): State<AppState>,
    body: Result<Json<NewNotification>, JsonRejection>,
) -> Result<Json<AddNotificationResponse>, ApiError> {
    let Json(body) = body?;

    let mut conn = state.db.get().await?;
    diesel_async::RunQueryDsl::execute(
        diesel::insert_into(notifications::table).values(NewNotificationRow::from(&body)),
        &mut conn,
    )
    .await?;

    tracing::debug!(user_id = body.user_id, "notification stored");

    Ok(Json(AddNotificationResponse {
        status: "ok".to_string(),
    }))
}

// ---------------------------------------------------------------------------
// GET /notifications/{user_id}
// ---------------------------------------------------------------------------

/// Return the user's unread notifications and mark them read.
///
/// Rows are returned as they were before the update, so every entry has
/// `is_new = true`. A second fetch with nothing new in between is empty.
#[utoipa::path(
    get,
    path = "/notifications/{user_id}",
    tag = "Notifications",
    params(("user_id" = i64, Path, description = "Recipient user id")),
    responses(
        (status = 200, description = "Unread notifications, oldest first", body = Vec<Notification>),
        (status = 400, description = "User id is not an integer", body = ApiErrorBody),
        (status = 500, description = "Storage failure", body = ApiErrorBody),
    ),
)]
pub async fn fetch_notifications(
    State(state): State<AppState>,
    user_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let Path(user_id) = user_id?;

    let mut conn = state.db.get().await?;

    let unread = conn
        .transaction::<_, ApiError, _>(|conn| {
            async move {
                let rows: Vec<Notification> = diesel_async::RunQueryDsl::load(
                    notifications::table
                        .filter(notifications::user_id.eq(user_id))
                        .filter(notifications::is_new.eq(true))
                        .order((notifications::created_at.asc(), notifications::id.asc()))
                        .select(Notification::as_select())
                        .for_update(),
                    conn,
                )
                .await?;

                if !rows.is_empty() {
                    let ids: Vec<i64> = rows.iter().map(|n| n.id).collect();
                    diesel_async::RunQueryDsl::execute(
                        diesel::update(notifications::table.filter(notifications::id.eq_any(ids)))
                            .set(notifications::is_new.eq(false)),
                        conn,
                    )
                    .await?;
                }

                Ok(rows)
            }
            .scope_boxed()
        })
        .await?;

    tracing::debug!(user_id, count = unread.len(), "inbox fetched");

    Ok(Json(unread))
}
