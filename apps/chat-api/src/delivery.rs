//! Message ingestion: persist, broadcast to the live room, notify members.

use chrono::Utc;
use diesel::prelude::*;

use crate::auth::middleware::AuthUser;
use crate::db::schema::chat_messages;
use crate::error::ApiError;
use crate::gateway::events::ChatFrame;
use crate::membership;
use crate::models::chat_message::{ChatMessage, NewChatMessage};
use crate::notifier::{Notifier, NotifyError};
use crate::AppState;

/// Fan-out stopped at `recipient`; members after it were not attempted.
#[derive(Debug, thiserror::Error)]
#[error("failed to notify user {recipient}: {source}")]
pub struct FanOutError {
    pub recipient: i64,
    #[source]
    pub source: NotifyError,
}

/// Notice text delivered to every member except the sender.
pub fn notice_text(chat_id: i64, sender: &str, text: &str) -> String {
    format!("New message in chat {chat_id} from {sender}: {text}")
}

/// Persist a message from `sender` into `chat_id` and deliver it.
///
/// Order of effects: membership check, insert, live broadcast, then one
/// notification per other member. A notification failure is reported to the
/// caller but does not undo the stored message or the broadcast.
pub async fn ingest_message(
    state: &AppState,
    sender: &AuthUser,
    chat_id: i64,
    text: &str,
) -> Result<ChatMessage, ApiError> {
    membership::require_member(&state.db, chat_id, sender.user_id).await?;

    let mut conn = state.db.get().await?;
    let message: ChatMessage = diesel_async::RunQueryDsl::get_result(
        diesel::insert_into(chat_messages::table)
            .values(NewChatMessage {
                chat_id,
                user_id: sender.user_id,
                message_text: text,
                sent_at: Utc::now(),
            })
            .returning(ChatMessage::as_returning()),
        &mut conn,
    )
    .await?;
    drop(conn);

    tracing::info!(
        message_id = message.id,
        chat_id,
        user_id = sender.user_id,
        "message stored"
    );

    let members = membership::member_ids(&state.db, chat_id).await?;

    let frame = ChatFrame::stored(&message, &sender.username);
    let payload = serde_json::to_string(&frame).map_err(|err| {
        tracing::error!(?err, "failed to encode chat frame");
        ApiError::internal("An internal error occurred")
    })?;
    let report = state.hub.broadcast(chat_id, payload).await?;
    tracing::debug!(
        chat_id,
        delivered = report.delivered,
        pruned = report.pruned,
        "message broadcast"
    );

    let notice = notice_text(chat_id, &sender.username, text);
    fan_out(state.notifier.as_ref(), &members, sender.user_id, &notice)
        .await
        .map_err(|err| {
            tracing::error!(chat_id, message_id = message.id, %err, "notification fan-out failed");
            ApiError::delivery(format!("Failed to notify user {}", err.recipient))
        })?;

    Ok(message)
}

/// Notify every member except `sender`, in order, stopping at the first failure.
///
/// Returns how many notifications were delivered.
pub async fn fan_out(
    notifier: &dyn Notifier,
    members: &[i64],
    sender: i64,
    notice: &str,
) -> Result<usize, FanOutError> {
    let mut sent = 0;
    for &recipient in members.iter().filter(|&&m| m != sender) {
        notifier
            .notify(recipient, notice)
            .await
            .map_err(|source| FanOutError { recipient, source })?;
        sent += 1;
    }
    Ok(sent)
}
