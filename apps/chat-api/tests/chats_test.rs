mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::TestServer;

// ---------------------------------------------------------------------------
// POST /api/v1/chats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_chat_makes_caller_owner_and_member() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "chat_owner").await;
    let name = common::unique_chat_name("general");

    let resp = server
        .post("/api/v1/chats")
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "name": name }))
        .await;

    resp.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = resp.json();
    let chat_id = body["id"].as_i64().unwrap();
    assert_eq!(body["name"], name.as_str());
    assert_eq!(body["owner_id"], owner.id);
    assert!(body["created_at"].is_string());

    let members: serde_json::Value = server
        .get(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, owner.bearer())
        .await
        .json();
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0]["user_id"], owner.id);
    assert_eq!(members[0]["username"], owner.username.as_str());

    common::cleanup_chat(&state.db, chat_id).await;
    common::cleanup_user(&state.db, owner.id).await;
}

#[tokio::test]
async fn create_chat_duplicate_name_conflicts() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "dup_owner").await;
    let name = common::unique_chat_name("dup");

    let first = server
        .post("/api/v1/chats")
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "name": name }))
        .await;
    first.assert_status(StatusCode::CREATED);
    let chat_id = first.json::<serde_json::Value>()["id"].as_i64().unwrap();

    let resp = server
        .post("/api/v1/chats")
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "name": name }))
        .await;
    resp.assert_status(StatusCode::CONFLICT);
    assert_eq!(resp.json::<serde_json::Value>()["error"]["code"], "CONFLICT");

    common::cleanup_chat(&state.db, chat_id).await;
    common::cleanup_user(&state.db, owner.id).await;
}

#[tokio::test]
async fn create_chat_rejects_blank_name() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "blank_owner").await;

    let resp = server
        .post("/api/v1/chats")
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "name": "   " }))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["details"][0]["field"], "name");

    common::cleanup_user(&state.db, owner.id).await;
}

#[tokio::test]
async fn create_chat_requires_auth() {
    let (app, _state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();

    let resp = server
        .post("/api/v1/chats")
        .json(&serde_json::json!({ "name": "anon" }))
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);

    let resp = server
        .post("/api/v1/chats")
        .add_header(AUTHORIZATION, "Bearer not-a-token")
        .json(&serde_json::json!({ "name": "anon" }))
        .await;
    resp.assert_status(StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// GET /api/v1/chats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_chats_returns_only_joined_chats() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let alice = common::create_user(&state, "list_alice").await;
    let bob = common::create_user(&state, "list_bob").await;

    let shared = common::create_chat(&server, &alice, "shared").await;
    let private = common::create_chat(&server, &alice, "private").await;
    common::add_member(&server, &alice, shared, &bob).await;

    let body: serde_json::Value = server
        .get("/api/v1/chats")
        .add_header(AUTHORIZATION, bob.bearer())
        .await
        .json();
    let ids: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![shared]);

    let body: serde_json::Value = server
        .get("/api/v1/chats")
        .add_header(AUTHORIZATION, alice.bearer())
        .await
        .json();
    assert_eq!(body.as_array().unwrap().len(), 2);

    common::cleanup_chat(&state.db, shared).await;
    common::cleanup_chat(&state.db, private).await;
    common::cleanup_user(&state.db, alice.id).await;
    common::cleanup_user(&state.db, bob.id).await;
}

// ---------------------------------------------------------------------------
// POST /api/v1/chats/{chat_id}/members
// ---------------------------------------------------------------------------

#[tokio::test]
async fn owner_adds_member_by_username() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "add_owner").await;
    let guest = common::create_user(&state, "add_guest").await;
    let chat_id = common::create_chat(&server, &owner, "add").await;

    let resp = server
        .post(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "username": guest.username }))
        .await;
    resp.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = resp.json();
    assert_eq!(body["member"]["chat_id"], chat_id);
    assert_eq!(body["member"]["user_id"], guest.id);

    // The new member can see the member list.
    let members: serde_json::Value = server
        .get(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, guest.bearer())
        .await
        .json();
    let ids: Vec<i64> = members
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["user_id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![owner.id, guest.id]);

    common::cleanup_chat(&state.db, chat_id).await;
    common::cleanup_user(&state.db, owner.id).await;
    common::cleanup_user(&state.db, guest.id).await;
}

#[tokio::test]
async fn adding_existing_member_conflicts() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "twice_owner").await;
    let guest = common::create_user(&state, "twice_guest").await;
    let chat_id = common::create_chat(&server, &owner, "twice").await;
    common::add_member(&server, &owner, chat_id, &guest).await;

    let resp = server
        .post(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "username": guest.username }))
        .await;
    resp.assert_status(StatusCode::CONFLICT);

    common::cleanup_chat(&state.db, chat_id).await;
    common::cleanup_user(&state.db, owner.id).await;
    common::cleanup_user(&state.db, guest.id).await;
}

#[tokio::test]
async fn only_owner_can_add_members() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "perm_owner").await;
    let member = common::create_user(&state, "perm_member").await;
    let outsider = common::create_user(&state, "perm_outsider").await;
    let chat_id = common::create_chat(&server, &owner, "perm").await;
    common::add_member(&server, &owner, chat_id, &member).await;

    let resp = server
        .post(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, member.bearer())
        .json(&serde_json::json!({ "username": outsider.username }))
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(resp.json::<serde_json::Value>()["error"]["code"], "FORBIDDEN");

    common::cleanup_chat(&state.db, chat_id).await;
    for user in [&owner, &member, &outsider] {
        common::cleanup_user(&state.db, user.id).await;
    }
}

#[tokio::test]
async fn adding_unknown_user_is_not_found() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "ghost_owner").await;
    let chat_id = common::create_chat(&server, &owner, "ghost").await;

    let resp = server
        .post(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "username": "no_such_user_anywhere" }))
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);

    common::cleanup_chat(&state.db, chat_id).await;
    common::cleanup_user(&state.db, owner.id).await;
}

#[tokio::test]
async fn adding_to_missing_chat_is_not_found() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "nochat_owner").await;

    let resp = server
        .post("/api/v1/chats/999999999/members")
        .add_header(AUTHORIZATION, owner.bearer())
        .json(&serde_json::json!({ "username": owner.username }))
        .await;
    resp.assert_status(StatusCode::NOT_FOUND);

    common::cleanup_user(&state.db, owner.id).await;
}

// ---------------------------------------------------------------------------
// GET /api/v1/chats/{chat_id}/members
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_member_cannot_list_members() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let owner = common::create_user(&state, "vis_owner").await;
    let outsider = common::create_user(&state, "vis_outsider").await;
    let chat_id = common::create_chat(&server, &owner, "vis").await;

    let resp = server
        .get(&format!("/api/v1/chats/{chat_id}/members"))
        .add_header(AUTHORIZATION, outsider.bearer())
        .await;
    resp.assert_status(StatusCode::FORBIDDEN);

    common::cleanup_chat(&state.db, chat_id).await;
    common::cleanup_user(&state.db, owner.id).await;
    common::cleanup_user(&state.db, outsider.id).await;
}

// ---------------------------------------------------------------------------
// GET /api/v1/users
// ---------------------------------------------------------------------------

#[tokio::test]
async fn list_usernames_includes_registered_users() {
    let (app, state, _) = common::test_app().await;
    let server = TestServer::new(app).unwrap();
    let user = common::create_user(&state, "dir_user").await;

    let resp = server
        .get("/api/v1/users")
        .add_header(AUTHORIZATION, user.bearer())
        .await;
    resp.assert_status_ok();
    let names: Vec<String> = resp.json();
    assert!(names.contains(&user.username));

    server.get("/api/v1/users").await.assert_status(StatusCode::UNAUTHORIZED);

    common::cleanup_user(&state.db, user.id).await;
}
