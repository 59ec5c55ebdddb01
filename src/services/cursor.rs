//! Cursor service — ephemeral cursor position relay.
//!
//! DESIGN
//! ======
//! Cursor positions are purely ephemeral: relayed to room peers and
//! immediately forgotten. They never touch the operation log, never
//! count toward sequence numbers, and never create a room.

use uuid::Uuid;

use crate::frame::ServerFrame;
use crate::services::room::{fan_out, lookup_room};
use crate::state::AppState;

/// Relay a cursor position to every room member except the sender.
/// Cursor traffic for an unknown room is dropped rather than
/// instantiating a room nobody has joined.
pub async fn broadcast_cursor(state: &AppState, room_id: &str, client_id: Uuid, x: f64, y: f64) {
    let Some(room) = lookup_room(state, room_id).await else {
        return;
    };
    let room = room.lock().await;
    fan_out(&room, &ServerFrame::PeerCursor { client_id, x, y }, Some(client_id));
}

#[cfg(test)]
#[path = "cursor_test.rs"]
mod tests;
