//! Bearer credentials shared by the user and chat services.
//!
//! The user service signs tokens with the shared `JWT_SECRET`; the chat
//! service verifies them with the same secret. Tokens are HS256 JWTs whose
//! subject is the numeric user id.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the user's numeric id, rendered as a string.
    pub sub: String,
    pub username: String,
    /// Issued-at (unix timestamp).
    pub iat: i64,
    /// Expiration (unix timestamp).
    pub exp: i64,
}

impl Claims {
    /// Parse the subject back into the numeric user id.
    pub fn user_id(&self) -> Result<i64, TokenError> {
        self.sub.parse().map_err(|_| TokenError::InvalidSubject)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("invalid token")]
    Invalid,
    #[error("token subject is not a user id")]
    InvalidSubject,
    #[error("failed to sign token: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

/// Sign an access token for `user_id` valid for `ttl_secs` seconds.
pub fn issue_token(
    secret: &str,
    user_id: i64,
    username: &str,
    ttl_secs: i64,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ttl_secs)).timestamp(),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(TokenError::Signing)
}

/// Verify signature and expiry, returning the embedded claims.
pub fn verify_token(secret: &str, token: &str) -> Result<Claims, TokenError> {
    use jsonwebtoken::errors::ErrorKind;

    let validation = Validation::new(Algorithm::HS256);
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
            TokenError::Malformed
        }
        _ => TokenError::Invalid,
    })?;

    // Reject tokens whose subject is not a user id up front.
    data.claims.user_id()?;
    Ok(data.claims)
}
