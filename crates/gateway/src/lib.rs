//! # Parley Gateway Crate
//!
//! The edge of the system: it upgrades WebSocket connections, authenticates
//! them, translates wire frames into hub calls, and exposes a small REST
//! surface for health and presence.
//!
//! Everything stateful lives in the realtime hub and the store; the gateway
//! itself only carries the [`GatewayState`] handle.

pub mod error;
pub mod rest;
pub mod state;
pub mod ws;

pub use error::{GatewayError, GatewayResult};
pub use state::GatewayState;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;

/// Build the application router: REST routes plus the `/ws` upgrade
/// endpoint.
pub fn build_router(state: GatewayState) -> Router {
    Router::new()
        .merge(rest::routes())
        .route("/ws", get(ws::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}
