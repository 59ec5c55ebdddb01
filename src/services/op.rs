//! Operation service — the append path and history reads.
//!
//! DESIGN
//! ======
//! `append_operation` is the only write path into a room's log. One room
//! lock spans stamp → resolve → append → fan-out, so every member's channel
//! receives operations in log order and two concurrent undos can never
//! select the same target. The lock covers no I/O: fan-out is non-blocking
//! `try_send`.

use tracing::debug;
use uuid::Uuid;

use crate::frame::ServerFrame;
use crate::oplog::{OpKind, Operation};
use crate::services::room::{ensure_room, fan_out, lookup_room};
use crate::state::AppState;

/// Stamp one operation into a room's log and fan it out to every member,
/// the submitter included. Creates the room on first reference. Never
/// fails: unresolvable undo/redo targets are recorded as no-op markers.
pub async fn append_operation(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    kind: OpKind,
    payload: serde_json::Value,
) -> Operation {
    let room = ensure_room(state, room_id).await;
    let mut room = room.lock().await;

    let op = room.log.apply(client_id, kind, payload);
    fan_out(&room, &ServerFrame::Op(op.clone()), None);

    debug!(%room_id, %client_id, seq = op.seq, kind = ?op.kind, "operation appended");
    op
}

/// Bounded recent history for a room. An absent room reads as empty
/// without being created.
pub async fn history(state: &AppState, room_id: &str, limit: usize) -> Vec<Operation> {
    let Some(room) = lookup_room(state, room_id).await else {
        return Vec::new();
    };
    let room = room.lock().await;
    room.log.recent(limit).to_vec()
}

#[cfg(test)]
#[path = "op_test.rs"]
mod tests;
