pub mod health;
pub mod notifications;

use axum::Router;
use utoipa::OpenApi;

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(notifications::router())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        notifications::add_notification,
        notifications::fetch_notifications,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::models::notification::Notification,
            penguin_common::NewNotification,
            health::HealthResponse,
            notifications::AddNotificationResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Notifications", description = "Per-user notification inbox"),
    )
)]
pub struct ApiDoc;
