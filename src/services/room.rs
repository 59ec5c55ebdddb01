//! Room service — membership, presence, and fan-out.
//!
//! DESIGN
//! ======
//! Rooms are created on first reference and never evicted; a room keeps its
//! log after the last member leaves so reconnecting clients can recover
//! history. Join and leave mutate membership and broadcast the member list
//! under the same room lock: no stale list ever goes out.
//!
//! Fan-out is best-effort `try_send`. A slow client whose buffer fills
//! drops frames for itself only; the room is never stalled by one socket.

use std::sync::Arc;

use rand::Rng;
use tokio::sync::{Mutex, mpsc};
use tracing::info;
use uuid::Uuid;

use crate::frame::{RoomMember, ServerFrame};
use crate::oplog::Operation;
use crate::state::{AppState, RoomState, SharedRoom};

/// Presence colors handed to members that do not pick their own.
const PALETTE: [&str; 8] = [
    "#D94B4B", "#4B7DD9", "#3E8F5A", "#C98A2D", "#8A5BC9", "#2DA8A8", "#C95B9A", "#6B6B5E",
];

/// Snapshot handed to a joining client.
#[derive(Debug)]
pub struct JoinSnapshot {
    /// Members present before the join. Excludes the joiner.
    pub peers: Vec<RoomMember>,
    /// Bounded recent history with current active flags.
    pub history: Vec<Operation>,
}

/// Per-room counters for the read-only HTTP surface.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOverview {
    pub room_id: String,
    pub members: usize,
    pub ops: usize,
}

// =============================================================================
// REGISTRY
// =============================================================================

/// Fetch a room's handle, creating the room on first reference.
pub async fn ensure_room(state: &AppState, room_id: &str) -> SharedRoom {
    {
        let rooms = state.rooms.read().await;
        if let Some(room) = rooms.get(room_id) {
            return room.clone();
        }
    }

    let mut rooms = state.rooms.write().await;
    // Re-check under the write lock: another task may have won the race.
    if let Some(room) = rooms.get(room_id) {
        return room.clone();
    }
    let room = Arc::new(Mutex::new(RoomState::new(room_id)));
    rooms.insert(room_id.to_string(), room.clone());
    info!(%room_id, "room created");
    room
}

/// Fetch a room's handle without creating it.
pub async fn lookup_room(state: &AppState, room_id: &str) -> Option<SharedRoom> {
    let rooms = state.rooms.read().await;
    rooms.get(room_id).cloned()
}

/// Snapshot of every live room, sorted by room id.
pub async fn list_rooms(state: &AppState) -> Vec<RoomOverview> {
    let handles: Vec<(String, SharedRoom)> = {
        let rooms = state.rooms.read().await;
        rooms.iter().map(|(id, room)| (id.clone(), room.clone())).collect()
    };

    let mut out = Vec::with_capacity(handles.len());
    for (room_id, room) in handles {
        let room = room.lock().await;
        out.push(RoomOverview { room_id, members: room.members.len(), ops: room.log.len() });
    }
    out.sort_by(|a, b| a.room_id.cmp(&b.room_id));
    out
}

// =============================================================================
// JOIN / LEAVE
// =============================================================================

/// Join a room, creating it on first reference.
///
/// Registers the client's outbound sender, broadcasts the fresh member list
/// to every member (joiner included), and returns the join snapshot. All of
/// it happens under one room lock.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    username: &str,
    color: Option<String>,
    tx: mpsc::Sender<ServerFrame>,
) -> JoinSnapshot {
    let color = color.unwrap_or_else(assign_color);
    let room = ensure_room(state, room_id).await;
    let mut room = room.lock().await;

    let peers = room.member_list();
    room.members
        .insert(client_id, RoomMember { client_id, username: username.to_owned(), color });
    room.clients.insert(client_id, tx);

    let history = room.log.recent(state.config.history_limit).to_vec();
    let members = room.member_list();
    fan_out(&room, &ServerFrame::Members { room_id: room_id.to_owned(), members }, None);

    info!(%room_id, %client_id, members = room.members.len(), "client joined room");
    JoinSnapshot { peers, history }
}

/// Leave a room. Idempotent: returns `true` only when the client was
/// actually a member, and broadcasts the post-removal member list to the
/// remaining members only in that case. The room itself stays.
pub async fn leave_room(state: &AppState, room_id: &str, client_id: Uuid) -> bool {
    let Some(room) = lookup_room(state, room_id).await else {
        return false;
    };
    let mut room = room.lock().await;

    let was_member = room.members.remove(&client_id).is_some();
    room.clients.remove(&client_id);
    if !was_member {
        return false;
    }

    let members = room.member_list();
    fan_out(&room, &ServerFrame::Members { room_id: room_id.to_owned(), members }, None);

    info!(%room_id, %client_id, remaining = room.members.len(), "client left room");
    true
}

/// Current members of a room. Empty when the room has never been created.
pub async fn list_members(state: &AppState, room_id: &str) -> Vec<RoomMember> {
    let Some(room) = lookup_room(state, room_id).await else {
        return Vec::new();
    };
    let room = room.lock().await;
    room.member_list()
}

// =============================================================================
// FAN-OUT
// =============================================================================

/// Send a frame to every client in the room, optionally excluding one.
///
/// Callers hold the room lock, so delivery order into each client's channel
/// matches the order of state changes. Best-effort: a full channel drops
/// the frame for that client only.
pub fn fan_out(room: &RoomState, frame: &ServerFrame, exclude: Option<Uuid>) {
    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        let _ = tx.try_send(frame.clone());
    }
}

/// Pick a palette color for a member that supplied none.
#[must_use]
pub fn assign_color() -> String {
    let mut rng = rand::rng();
    let idx = rng.random_range(0..PALETTE.len());
    PALETTE[idx].to_string()
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
