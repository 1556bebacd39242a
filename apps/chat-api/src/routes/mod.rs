pub mod chats;
pub mod health;
pub mod messages;
pub mod users;

use axum::http::Request;
use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::gateway::server::router())
        .nest(
            "/api/v1",
            chats::router()
                .merge(messages::router())
                .merge(users::router()),
        )
}

/// Span for the HTTP trace layer. Records the path only, since the query
/// string of `/ws` may carry an access token.
pub fn request_span<B>(request: &Request<B>) -> tracing::Span {
    tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    )
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        // Chats
        chats::create_chat,
        chats::list_chats,
        chats::add_member,
        chats::list_members,
        // Messages
        messages::send_message,
        messages::list_messages,
        messages::list_grouped_messages,
        // Users
        users::list_usernames,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::ApiErrorDetail,
            crate::error::FieldError,
            crate::models::chat::Chat,
            crate::models::chat_member::ChatMember,
            crate::models::chat_member::Participant,
            crate::models::chat_message::ChatMessage,
            crate::models::chat_message::MessageView,
            health::HealthResponse,
            chats::CreateChatRequest,
            chats::AddMemberRequest,
            chats::AddMemberResponse,
            messages::SendMessageRequest,
            messages::SendMessageResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Chats", description = "Chats and membership"),
        (name = "Messages", description = "Sending and reading messages"),
        (name = "Users", description = "User directory"),
    )
)]
pub struct ApiDoc;
