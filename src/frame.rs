//! Wire protocol — the JSON frames exchanged with drawing clients.
//!
//! ARCHITECTURE
//! ============
//! Every WebSocket message is one JSON envelope: `{"event": <name>,
//! "data": {...}}`. Clients send `ClientFrame`s, the server answers and
//! broadcasts `ServerFrame`s. The envelope tag is `event`, not `type`, so
//! an operation's own `type` field travels untouched inside `data`.
//!
//! DESIGN
//! ======
//! - Field keys are camelCase on the wire (`roomId`, `clientId`).
//! - Unknown keys inside `data` are ignored; unknown `event` names fail to
//!   parse and the gateway drops the frame.
//! - Frames carry no sequence numbers of their own. Ordering lives in the
//!   stamped operations, where it survives reconnects.

#[cfg(test)]
#[path = "frame_test.rs"]
mod frame_test;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::oplog::{OpKind, Operation};

// =============================================================================
// MEMBERS
// =============================================================================

/// A room member as presented to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMember {
    pub client_id: Uuid,
    pub username: String,
    /// Presence color, server-assigned when the client supplies none.
    pub color: String,
}

// =============================================================================
// CLIENT FRAMES
// =============================================================================

/// Messages clients send.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Enter a room, creating it on first reference. A connection is in at
    /// most one room; joining another leaves the previous one first.
    #[serde(rename_all = "camelCase")]
    JoinRoom {
        room_id: String,
        username: String,
        #[serde(default)]
        color: Option<String>,
    },
    /// Leave a room. No-op when the client is not a member.
    #[serde(rename_all = "camelCase")]
    LeaveRoom { room_id: String },
    /// Submit a drawing action for stamping. Routed by the frame's own
    /// `roomId`, not by the connection's current room.
    #[serde(rename_all = "camelCase")]
    Op {
        room_id: String,
        #[serde(rename = "type")]
        kind: OpKind,
        payload: serde_json::Value,
    },
    /// Ephemeral cursor position. Relayed, never logged.
    #[serde(rename_all = "camelCase")]
    Cursor { room_id: String, x: f64, y: f64 },
}

// =============================================================================
// SERVER FRAMES
// =============================================================================

/// Messages the server sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Join acknowledgment. `peers` excludes the joiner.
    #[serde(rename_all = "camelCase")]
    Joined {
        client_id: Uuid,
        room_id: String,
        peers: Vec<RoomMember>,
    },
    /// Bounded recent history, pushed once per join, after `joined`.
    History { ops: Vec<Operation> },
    /// One stamped operation, broadcast to every member, sender included.
    Op(Operation),
    /// Full member list, broadcast on every membership change.
    #[serde(rename_all = "camelCase")]
    Members {
        room_id: String,
        members: Vec<RoomMember>,
    },
    /// A peer's cursor. Never sent back to the peer that moved it.
    #[serde(rename_all = "camelCase")]
    PeerCursor { client_id: Uuid, x: f64, y: f64 },
}
