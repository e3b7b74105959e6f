//! The WebSocket endpoint: authentication, the frame ↔ event boundary, and
//! the per-connection pump between the socket and the hub.
//!
//! Auth happens before the upgrade; an unknown token is refused with a 401
//! and no session is ever created. After the upgrade the connection runs
//! two tasks: one forwarding hub events to the socket, one parsing inbound
//! frames into hub calls. Whichever side ends first tears the session down.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use parley_realtime::{ClientEvent, ErrorKind, RealtimeError, RealtimeResult, ServerEvent, SessionId};
use parley_store::{FileInfo, UserIdentity};

use crate::error::{GatewayError, GatewayResult};
use crate::state::GatewayState;

#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    token: Option<String>,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<ConnectQuery>,
) -> GatewayResult<Response> {
    let identity = authenticate(&state, query.token).await?;
    Ok(ws.on_upgrade(move |socket| run_session(socket, state, identity)))
}

async fn authenticate(
    state: &GatewayState,
    token: Option<String>,
) -> GatewayResult<UserIdentity> {
    let token =
        token.ok_or_else(|| GatewayError::AuthenticationFailed("missing token".to_string()))?;

    state
        .identity
        .resolve_token(&token)
        .await?
        .ok_or_else(|| GatewayError::AuthenticationFailed("unknown token".to_string()))
}

async fn run_session(socket: WebSocket, state: Arc<GatewayState>, identity: UserIdentity) {
    let user_id = identity.user_id.clone();
    let (session_id, mut events) = state.hub.connect(identity).await;
    let (mut sink, mut stream) = socket.split();

    // Hub → socket. Ends when the session's channel closes (displacement)
    // or the peer goes away.
    let mut outbound = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Ok(text) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    // Socket → hub.
    let inbound_state = state.clone();
    let inbound_user = user_id.clone();
    let mut inbound = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => {
                    dispatch(&inbound_state, session_id, &inbound_user, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut outbound => inbound.abort(),
        _ = &mut inbound => outbound.abort(),
    }

    state.hub.disconnect(session_id).await;
    tracing::debug!(%user_id, session_id, "websocket closed");
}

/// Parse one inbound frame and route it to the hub. Failures of any kind
/// are reported only to this session as an `error` event; the room never
/// sees them.
async fn dispatch(state: &GatewayState, session_id: SessionId, user_id: &str, text: &str) {
    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            state
                .hub
                .notify(
                    session_id,
                    ServerEvent::Error {
                        kind: ErrorKind::InvalidPayload,
                        message: format!("malformed event: {err}"),
                    },
                )
                .await;
            return;
        }
    };

    let result = match event {
        ClientEvent::JoinRooms { rooms } => join_rooms(state, session_id, user_id, rooms).await,
        ClientEvent::MessageSend {
            room_id,
            content,
            message_type,
            reply_to,
        } => state
            .hub
            .send_message(session_id, room_id, content, message_type, reply_to)
            .await
            .map(|_| ()),
        ClientEvent::TypingStart { room_id } => state.hub.typing_start(session_id, &room_id).await,
        ClientEvent::TypingStop { room_id } => state.hub.typing_stop(session_id, &room_id).await,
        ClientEvent::MessageReact { message_id, emoji } => state
            .hub
            .toggle_reaction(session_id, &message_id, &emoji)
            .await
            .map(|_| ()),
        ClientEvent::FileUpload {
            room_id,
            file_name,
            file_type,
            file_size,
            file_url,
        } => state
            .hub
            .send_file(
                session_id,
                room_id,
                FileInfo {
                    name: file_name,
                    mime_type: file_type,
                    size: file_size,
                    url: file_url,
                },
            )
            .await
            .map(|_| ()),
    };

    if let Err(err) = result {
        tracing::debug!(%user_id, session_id, error = %err, "client event rejected");
        state
            .hub
            .notify(
                session_id,
                ServerEvent::Error {
                    kind: err.kind(),
                    message: err.to_string(),
                },
            )
            .await;
    }
}

/// Filter the requested room ids down to actual memberships before the hub
/// sees them. Unauthorized ids are dropped silently; joining is idempotent
/// and clients routinely re-request their full room list.
async fn join_rooms(
    state: &GatewayState,
    session_id: SessionId,
    user_id: &str,
    rooms: Vec<String>,
) -> RealtimeResult<()> {
    let allowed = state
        .members
        .authorized_rooms(user_id, &rooms)
        .await
        .map_err(RealtimeError::from)?;

    if allowed.len() < rooms.len() {
        tracing::debug!(
            %user_id,
            requested = rooms.len(),
            allowed = allowed.len(),
            "dropped unauthorized room joins"
        );
    }

    state.hub.join_rooms(session_id, allowed).await;
    Ok(())
}
