//! Client for the notification API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use penguin_common::NewNotification;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification service responded with status {0}")]
    Status(StatusCode),
}

/// Delivers a single notice to a single recipient.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, recipient: i64, text: &str) -> Result<(), NotifyError>;
}

/// HTTP notifier backed by `POST {base}/addNotification`.
#[derive(Debug, Clone)]
pub struct NotificationClient {
    http: reqwest::Client,
    endpoint: String,
}

impl NotificationClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, NotifyError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/addNotification", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Notifier for NotificationClient {
    async fn notify(&self, recipient: i64, text: &str) -> Result<(), NotifyError> {
        let body = NewNotification::unread(recipient, text);
        let resp = self.http.post(&self.endpoint).json(&body).send().await?;

        if resp.status() != StatusCode::OK {
            return Err(NotifyError::Status(resp.status()));
        }

        tracing::debug!(recipient, "notification delivered");
        Ok(())
    }
}
