pub mod jwt;
pub mod notification;

pub use jwt::{Claims, TokenError};
pub use notification::NewNotification;

/// Default bearer-token lifetime: 24 hours.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 24 * 3600;
