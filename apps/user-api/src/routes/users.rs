use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderName, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use penguin_common::jwt;

use crate::auth::middleware::AuthUser;
use crate::auth::password::{hash_password, verify_password};
use crate::db::schema::users;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::models::user::{NewUser, User, UserResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/users/@me", get(get_me))
}

// =========================================================================
// POST /api/v1/register: Create an account
// =========================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserResponse,
}

fn validate_registration(body: &RegisterRequest) -> Vec<FieldError> {
    let mut errors = Vec::new();

    // Username: 2-32 chars, alphanumeric + _ . -
    let username = body.username.trim();
    if username.len() < 2 || username.len() > 32 {
        errors.push(FieldError {
            field: "username".into(),
            message: "Username must be 2-32 characters".into(),
        });
    } else if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-')
    {
        errors.push(FieldError {
            field: "username".into(),
            message: "Username may only contain letters, digits, underscores, dots, and hyphens"
                .into(),
        });
    }

    let email = body.email.trim();
    if !email.contains('@') || email.len() < 3 {
        errors.push(FieldError {
            field: "email".into(),
            message: "Invalid email address".into(),
        });
    }

    if body.password.len() < 8 {
        errors.push(FieldError {
            field: "password".into(),
            message: "Password must be at least 8 characters".into(),
        });
    }

    errors
}

/// `POST /api/v1/register`: Register a new user.
#[utoipa::path(
    post,
    path = "/api/v1/register",
    tag = "Users",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created", body = RegisterResponse),
        (status = 400, description = "Validation error", body = ApiErrorBody),
        (status = 409, description = "Username or email already in use", body = ApiErrorBody),
    ),
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let Json(body) = body?;

    let errors = validate_registration(&body);
    if !errors.is_empty() {
        return Err(ApiError::validation(errors));
    }

    let username = body.username.trim();
    let email = body.email.trim().to_lowercase();

    let mut conn = state.db.get().await?;

    let taken: i64 = users::table
        .filter(users::username.eq(username).or(users::email.eq(&email)))
        .count()
        .get_result(&mut conn)
        .await?;
    if taken > 0 {
        return Err(ApiError::conflict("Username or email already in use"));
    }

    let password_hash = hash_password(&body.password)?;

    // A concurrent registration can still race past the pre-check.
    let user: User = diesel::insert_into(users::table)
        .values(NewUser {
            username,
            email: &email,
            password_hash: &password_hash,
        })
        .returning(User::as_returning())
        .get_result(&mut conn)
        .await
        .map_err(|e| match e {
            diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ) => ApiError::conflict("Username or email already in use"),
            other => ApiError::from(other),
        })?;

    tracing::info!(user_id = user.id, username = %user.username, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "user created successfully".to_string(),
            user: UserResponse::from(user),
        }),
    ))
}

// =========================================================================
// POST /api/v1/login: Exchange credentials for an access token
// =========================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user: UserResponse,
}

/// `POST /api/v1/login`: Verify credentials and issue a bearer token.
///
/// The token is also set as an `HttpOnly` cookie for browser clients.
#[utoipa::path(
    post,
    path = "/api/v1/login",
    tag = "Users",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Malformed body", body = ApiErrorBody),
        (status = 401, description = "Invalid credentials", body = ApiErrorBody),
    ),
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<([(HeaderName, String); 1], Json<LoginResponse>), ApiError> {
    let Json(body) = body?;
    let mut conn = state.db.get().await?;

    let user: Option<User> = users::table
        .filter(users::username.eq(body.username.trim()))
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()?;

    let user = match user {
        Some(u) if verify_password(&body.password, &u.password_hash) => u,
        _ => return Err(ApiError::unauthorized("Invalid credentials")),
    };

    let ttl = state.config.token_ttl_secs;
    let token = jwt::issue_token(&state.config.jwt_secret, user.id, &user.username, ttl)
        .map_err(|e| {
            tracing::error!(?e, "failed to sign access token");
            ApiError::internal("Token signing failed")
        })?;

    tracing::info!(user_id = user.id, "user logged in");

    let cookie = format!("token={token}; Max-Age={ttl}; Path=/; HttpOnly; SameSite=Lax");

    Ok((
        [(SET_COOKIE, cookie)],
        Json(LoginResponse {
            access_token: token,
            token_type: "Bearer".to_string(),
            expires_in: ttl,
            user: UserResponse::from(user),
        }),
    ))
}

// =========================================================================
// GET /api/v1/users/@me: Current authenticated user
// =========================================================================

/// `GET /api/v1/users/@me`: Return the current user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/@me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 404, description = "User no longer exists", body = ApiErrorBody),
    ),
)]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let mut conn = state.db.get().await?;

    let user: User = users::table
        .find(auth.user_id)
        .select(User::as_select())
        .first(&mut conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(Json(UserResponse::from(user)))
}
