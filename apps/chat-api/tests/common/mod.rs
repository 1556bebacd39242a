#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use reqwest::StatusCode;

use chat_api::config::Config;
use chat_api::db::pool::DbPool;
use chat_api::gateway::hub::{Hub, RoomId};
use chat_api::notifier::{Notifier, NotifyError};
use chat_api::AppState;

/// Notifier that records every call instead of talking to the notification API.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(i64, String)>>,
    fail_for: Mutex<Option<i64>>,
}

impl RecordingNotifier {
    /// Make every notification to `recipient` fail with a 503.
    pub fn fail_for(&self, recipient: i64) {
        *self.fail_for.lock().unwrap() = Some(recipient);
    }

    pub fn sent(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, recipient: i64) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter(|(r, _)| *r == recipient)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, recipient: i64, text: &str) -> Result<(), NotifyError> {
        if *self.fail_for.lock().unwrap() == Some(recipient) {
            return Err(NotifyError::Status(StatusCode::SERVICE_UNAVAILABLE));
        }
        self.sent.lock().unwrap().push((recipient, text.to_string()));
        Ok(())
    }
}

/// Build an [`AppState`] connected to the test database with a recording notifier.
///
/// The `users` table comes from the user-api migrations, so run
/// `cargo run -p user-api --bin user-migrate -- --test` before these tests.
pub async fn test_state() -> (AppState, Arc<RecordingNotifier>) {
    let env_path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    let _ = dotenvy::from_path(env_path);

    let mut config = Config::from_env();
    config.database_url = with_test_db_suffix(&config.database_url);
    let db = chat_api::db::pool::connect(&config.database_url).await;

    let notifier = Arc::new(RecordingNotifier::default());
    let hub = Hub::spawn(config.hub_queue_capacity);

    let state = AppState {
        db,
        config: Arc::new(config),
        hub,
        notifier: notifier.clone(),
    };

    (state, notifier)
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

/// Build the full application router wired to the test state.
pub async fn test_app() -> (Router, AppState, Arc<RecordingNotifier>) {
    let (state, notifier) = test_state().await;
    let app = chat_api::routes::router().with_state(state.clone());
    (app, state, notifier)
}

/// A registered user with a valid access token.
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub username: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

#[derive(diesel::QueryableByName)]
struct InsertedId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    id: i64,
}

/// Insert a row into the shared `users` table and mint a token for it.
pub async fn create_user(state: &AppState, tag: &str) -> TestUser {
    use diesel::sql_types::Text;
    use diesel_async::RunQueryDsl;

    let suffix: u32 = rand::random();
    let username = format!("{tag}_{suffix}");
    let email = format!("{username}@example.com");

    let mut conn = state.db.get().await.expect("pool");
    let row: InsertedId = diesel::sql_query(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, 'unused') RETURNING id",
    )
    .bind::<Text, _>(&username)
    .bind::<Text, _>(&email)
    .get_result(&mut conn)
    .await
    .expect("insert test user");

    let token = penguin_common::jwt::issue_token(
        &state.config.jwt_secret,
        row.id,
        &username,
        penguin_common::DEFAULT_TOKEN_TTL_SECS,
    )
    .expect("mint token");

    TestUser {
        id: row.id,
        username,
        token,
    }
}

/// A name no other test run will pick.
pub fn unique_chat_name(tag: &str) -> String {
    let suffix: u32 = rand::random();
    format!("{tag}-{suffix}")
}

/// Delete a user row.
pub async fn cleanup_user(db: &DbPool, user_id: i64) {
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    let mut conn = db.get().await.expect("pool");
    diesel::delete(chat_api::db::schema::users::table.find(user_id))
        .execute(&mut conn)
        .await
        .ok();
}

/// Delete a chat (CASCADE handles members and messages).
pub async fn cleanup_chat(db: &DbPool, chat_id: i64) {
    use diesel::prelude::*;
    use diesel_async::RunQueryDsl;

    let mut conn = db.get().await.expect("pool");
    diesel::delete(chat_api::db::schema::chats::table.find(chat_id))
        .execute(&mut conn)
        .await
        .ok();
}

/// Create a chat as `owner` and return its id.
pub async fn create_chat(server: &axum_test::TestServer, owner: &TestUser, tag: &str) -> i64 {
    let resp = server
        .post("/api/v1/chats")
        .add_header(axum::http::header::AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "name": unique_chat_name(tag) }))
        .await;
    resp.assert_status(axum::http::StatusCode::CREATED);
    resp.json::<serde_json::Value>()["id"].as_i64().unwrap()
}

/// Add `member` to `chat_id` on behalf of `owner`.
pub async fn add_member(
    server: &axum_test::TestServer,
    owner: &TestUser,
    chat_id: i64,
    member: &TestUser,
) {
    server
        .post(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(axum::http::header::AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "username": member.username }))
        .await
        .assert_status(axum::http::StatusCode::CREATED);
}

/// Wait until the hub reports `expected` connections in `room`.
pub async fn wait_for_room_size(hub: &Hub, room: RoomId, expected: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let size = hub.room_size(room).await.expect("hub running");
        if size == expected {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "room {room} has {size} connections, expected {expected}"
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}
