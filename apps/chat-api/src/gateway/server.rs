//! WebSocket upgrade handler and per-connection reader loop.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::auth::middleware::{authenticate, bearer_token, AuthError, AuthUser};
use crate::membership;
use crate::AppState;

use super::connection::Connection;
use super::events::{interpret_inbound, Inbound};
use super::hub::{Hub, HubError, RoomId};
use super::sink::WsSink;

/// Close codes (4000-range for application-level).
pub const CLOSE_INTERNAL_ERROR: u16 = 4000;
pub const CLOSE_NOT_MEMBER: u16 = 4003;
pub const CLOSE_INVALID_ROOM: u16 = 4400;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    /// Room to join. Kept as text so a bad value can be reported on the socket.
    #[serde(alias = "chatID")]
    pub chat_id: Option<String>,
    /// Access token for clients that cannot set headers on the upgrade request.
    pub token: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/ws", get(ws_upgrade))
}

async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<WsParams>,
) -> Response {
    let token = match bearer_token(&headers) {
        Ok(Some(token)) => Some(token.to_string()),
        Ok(None) => params.token.clone(),
        Err(err) => return err.into_response(),
    };
    let Some(token) = token else {
        return AuthError::MISSING.into_response();
    };
    let user = match authenticate(&state.config.jwt_secret, &token) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    ws.on_upgrade(move |socket| handle_connection(socket, state, user, params.chat_id))
}

fn parse_room(raw: Option<&str>) -> Option<RoomId> {
    raw.and_then(|v| v.trim().parse::<RoomId>().ok())
}

async fn handle_connection(
    socket: WebSocket,
    state: AppState,
    user: AuthUser,
    raw_room: Option<String>,
) {
    let mut conn = Connection::new(user.user_id, user.username);
    let (ws_tx, ws_rx) = socket.split();
    let mut sink = WsSink::new(ws_tx);

    let Some(room) = parse_room(raw_room.as_deref()) else {
        tracing::debug!(conn = %conn.id, raw = ?raw_room, "rejecting connection with invalid chat_id");
        sink.close_with(CLOSE_INVALID_ROOM, "Invalid chat_id").await;
        let _ = conn.closed();
        return;
    };

    match membership::is_member(&state.db, room, conn.user_id).await {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(conn = %conn.id, user_id = conn.user_id, room, "rejecting non-member");
            sink.close_with(CLOSE_NOT_MEMBER, "Not a member of this chat")
                .await;
            let _ = conn.closed();
            return;
        }
        Err(err) => {
            tracing::error!(conn = %conn.id, room, code = %err.code, "membership lookup failed");
            sink.close_with(CLOSE_INTERNAL_ERROR, "Internal error").await;
            let _ = conn.closed();
            return;
        }
    }

    if let Err(err) = state.hub.join(conn.id, room, Box::new(sink)).await {
        tracing::error!(conn = %conn.id, room, %err, "failed to join room");
        let _ = conn.closed();
        return;
    }
    if let Err(err) = conn.joined(room) {
        tracing::warn!(conn = %conn.id, %err, "unexpected connection state");
    }

    tracing::info!(
        conn = %conn.id,
        user_id = conn.user_id,
        username = %conn.username,
        room,
        "realtime connection established"
    );

    read_loop(&state.hub, &conn, room, ws_rx).await;

    let _ = conn.closing();
    match state.hub.leave(conn.id).await {
        Ok(_) | Err(HubError::Unavailable) => {}
        Err(err) => tracing::warn!(conn = %conn.id, %err, "leave failed"),
    }
    let _ = conn.closed();

    tracing::info!(conn = %conn.id, room, "realtime connection closed");
}

/// Relay inbound frames into the connection's room until the peer goes away.
async fn read_loop(hub: &Hub, conn: &Connection, room: RoomId, mut ws_rx: SplitStream<WebSocket>) {
    while let Some(msg) = ws_rx.next().await {
        let text = match msg {
            Ok(Message::Text(t)) => t,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(conn = %conn.id, ?e, "ws read error");
                break;
            }
        };

        let frame = match interpret_inbound(room, text.as_str()) {
            Inbound::Relay(frame) => frame.from_sender(conn.user_id, &conn.username),
            Inbound::Dropped { claimed } => {
                tracing::warn!(conn = %conn.id, room, claimed, "dropping frame addressed to another room");
                continue;
            }
        };

        let payload = match serde_json::to_string(&frame) {
            Ok(p) => p,
            Err(err) => {
                tracing::error!(conn = %conn.id, ?err, "failed to encode chat frame");
                continue;
            }
        };

        match hub.broadcast(room, payload).await {
            Ok(report) => {
                tracing::debug!(conn = %conn.id, room, delivered = report.delivered, pruned = report.pruned, "relayed frame");
            }
            Err(err) => {
                tracing::error!(conn = %conn.id, %err, "hub unavailable, closing reader");
                break;
            }
        }
    }
}
