//! Bearer token extraction for chat routes and the realtime endpoint.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use penguin_common::jwt;

use crate::AppState;

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub username: String,
}

/// Rejection returned when the bearer token is missing or invalid.
#[derive(Debug)]
pub struct AuthError {
    message: &'static str,
}

impl AuthError {
    pub const MISSING: AuthError = AuthError {
        message: "Missing Authorization header",
    };
    pub const INVALID_TOKEN: AuthError = AuthError {
        message: "Invalid or expired token",
    };
    pub const MALFORMED_HEADER: AuthError = AuthError {
        message: "Invalid Authorization header format",
    };
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": {
                "code": "UNAUTHORIZED",
                "message": self.message
            }
        });
        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Pull the raw token out of an `Authorization: Bearer` header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AuthError> {
    let Some(header) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header
        .to_str()
        .map_err(|_| AuthError::MALFORMED_HEADER)?;
    header
        .strip_prefix("Bearer ")
        .map(Some)
        .ok_or(AuthError::MALFORMED_HEADER)
}

/// Verify a signed access token and resolve the caller.
pub fn authenticate(secret: &str, token: &str) -> Result<AuthUser, AuthError> {
    let claims = jwt::verify_token(secret, token).map_err(|err| {
        tracing::debug!(%err, "rejected access token");
        AuthError::INVALID_TOKEN
    })?;
    let user_id = claims.user_id().map_err(|_| AuthError::INVALID_TOKEN)?;

    Ok(AuthUser {
        user_id,
        username: claims.username,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?.ok_or(AuthError::MISSING)?;
        authenticate(&state.config.jwt_secret, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn valid_token_resolves_the_caller() {
        let token = jwt::issue_token(SECRET, 42, "alice", 60).unwrap();
        let user = authenticate(SECRET, &token).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.username, "alice");
    }

    #[test]
    fn bad_tokens_share_one_rejection() {
        let signed_elsewhere = jwt::issue_token("other-secret", 42, "alice", 60).unwrap();
        for token in ["garbage", signed_elsewhere.as_str()] {
            let err = authenticate(SECRET, token).unwrap_err();
            assert_eq!(err.message, AuthError::INVALID_TOKEN.message);
        }
    }

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(bearer_token(&headers).unwrap().is_none());

        headers.insert(AUTHORIZATION, "Bearer abc".parse().unwrap());
        assert_eq!(bearer_token(&headers).unwrap(), Some("abc"));

        headers.insert(AUTHORIZATION, "Basic abc".parse().unwrap());
        let err = bearer_token(&headers).unwrap_err();
        assert_eq!(err.message, AuthError::MALFORMED_HEADER.message);
    }
}
