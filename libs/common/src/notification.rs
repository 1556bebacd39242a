//! Wire format of the notification append call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Body of `POST /addNotification`, sent by the chat service's fan-out client
/// and accepted by the notification service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct NewNotification {
    pub user_id: i64,
    pub message: String,
    #[serde(default = "default_is_new")]
    pub is_new: bool,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

fn default_is_new() -> bool {
    true
}

impl NewNotification {
    /// A fresh, unread notification stamped with the current time.
    pub fn unread(user_id: i64, message: impl Into<String>) -> Self {
        Self {
            user_id,
            message: message.into(),
            is_new: true,
            timestamp: Utc::now(),
        }
    }
}
