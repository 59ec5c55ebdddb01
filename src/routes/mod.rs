//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router binds the websocket gateway and a small read-only HTTP
//! surface. CORS is wide open: the server holds no credentials and the
//! HTTP routes mutate nothing.

pub mod rooms;
pub mod ws;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use tower_http::cors::{Any, CorsLayer};

use crate::state::AppState;

/// Websocket gateway plus read-only room routes under one router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .route("/api/rooms", get(rooms::list_rooms_rest))
        .route("/api/rooms/{room_id}/history", get(rooms::room_history))
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
