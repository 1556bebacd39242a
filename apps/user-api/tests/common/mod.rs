#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use user_api::config::Config;
use user_api::db::pool::DbPool;
use user_api::AppState;

/// Build an [`AppState`] connected to the test database.
///
/// Reads connection strings from the `.env` file at `CARGO_MANIFEST_DIR`.
pub async fn test_state() -> AppState {
    // Load .env from the user-api crate root so tests work from any cwd.
    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(env_path);

    let mut config = Config::from_env();
    config.database_url = with_test_db_suffix(&config.database_url);
    let db = user_api::db::pool::connect(&config.database_url).await;

    AppState {
        db,
        config: Arc::new(config),
    }
}

fn with_test_db_suffix(database_url: &str) -> String {
    let (base, query) = match database_url.split_once('?') {
        Some((base, query)) => (base, Some(query)),
        None => (database_url, None),
    };

    let Some((prefix, db_name)) = base.rsplit_once('/') else {
        return database_url.to_string();
    };
    if db_name.is_empty() || db_name.ends_with("_test") {
        return database_url.to_string();
    }

    let mut updated = format!("{prefix}/{db_name}_test");
    if let Some(query) = query {
        updated.push('?');
        updated.push_str(query);
    }
    updated
}

/// Build the full application [`Router`] wired to the test state.
pub async fn test_app() -> (Router, AppState) {
    let state = test_state().await;
    let app = user_api::routes::router().with_state(state.clone());
    (app, state)
}

/// A unique username/email pair so tests don't clash.
pub fn unique_identity(tag: &str) -> (String, String) {
    let suffix: u32 = rand::random();
    (format!("{tag}_{suffix}"), format!("{tag}_{suffix}@example.com"))
}

/// Delete a user by username.
pub async fn cleanup_user(db: &DbPool, username: &str) {
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;
    use user_api::db::schema::users;

    let mut conn = db.get().await.expect("pool");
    diesel::delete(users::table.filter(users::username.eq(username)))
        .execute(&mut conn)
        .await
        .ok();
}
