#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use notification_api::config::Config;
use notification_api::db::pool::DbPool;
use notification_api::AppState;

/// Build an [`AppState`] connected to the test database.
pub async fn test_state() -> AppState {
    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(env_path);

    let mut config = Config::from_env();
    config.database_url = with_test_db_suffix(&config.database_url);
    let db = notification_api::db::pool::connect(&config.database_url).await;

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
    let app = notification_api::routes::router().with_state(state.clone());
    (app, state)
}

/// A recipient id no other test will use.
pub fn unique_user_id() -> i64 {
    let n: u32 = rand::random();
    i64::from(n) + 1_000_000_000
}

/// Remove every notification for a recipient.
pub async fn cleanup_inbox(db: &DbPool, user_id: i64) {
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;
    use notification_api::db::schema::notifications;

    let mut conn = db.get().await.expect("pool");
    diesel::delete(notifications::table.filter(notifications::user_id.eq(user_id)))
        .execute(&mut conn)
        .await
        .ok();
}
