//! Presence over REST, for surfaces that do not hold a WebSocket.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use parley_realtime::OnlineUser;

use crate::state::GatewayState;

/// The same snapshot the `users:online` event carries.
pub async fn online_users(State(state): State<Arc<GatewayState>>) -> Json<Vec<OnlineUser>> {
    Json(state.hub.online_users().await)
}
