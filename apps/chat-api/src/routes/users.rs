//! Directory of registered usernames, used when picking chat members.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use diesel::prelude::*;

use crate::auth::middleware::AuthUser;
use crate::db::schema::users;
use crate::error::{ApiError, ApiErrorBody};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/users", get(list_usernames))
}

/// `GET /api/v1/users`: all usernames, alphabetical.
#[utoipa::path(
    get,
    path = "/api/v1/users",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Usernames", body = Vec<String>),
        (status = 401, description = "Not authenticated", body = ApiErrorBody),
    ),
)]
pub async fn list_usernames(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let mut conn = state.db.get().await?;

    let names: Vec<String> = diesel_async::RunQueryDsl::load(
        users::table.select(users::username).order(users::username.asc()),
        &mut conn,
    )
    .await?;

    Ok(Json(names))
}
