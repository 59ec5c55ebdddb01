//! Read-only room routes.
//!
//! DESIGN
//! ======
//! These mirror what the gateway already pushes over the socket: the room
//! overview list and the bounded history view. Nothing here mutates state.
//! Reading an absent room's history returns an empty list without bringing
//! the room into existence.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;

use crate::services::{op, room};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct HistoryQuery {
    limit: Option<usize>,
}

/// `GET /api/rooms` — list live rooms with member and operation counts.
pub async fn list_rooms_rest(State(state): State<AppState>) -> Json<serde_json::Value> {
    let rooms = room::list_rooms(&state).await;
    Json(json!({ "rooms": rooms }))
}

/// `GET /api/rooms/{room_id}/history?limit=N` — bounded recent history,
/// the same view a joining client receives. `limit` defaults to the
/// configured history limit.
pub async fn room_history(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Json<serde_json::Value> {
    let limit = params.limit.unwrap_or(state.config.history_limit);
    let ops = op::history(&state, &room_id, limit).await;
    Json(json!({ "roomId": room_id, "ops": ops }))
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
