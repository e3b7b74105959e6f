//! REST endpoints for the gateway.

pub mod health;
pub mod presence;

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::state::GatewayState;

pub fn routes() -> Router<Arc<GatewayState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/users/online", get(presence::online_users))
}
