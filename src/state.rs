//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the room map and the startup config. Each room is an independent
//! aggregate behind its own mutex: the outer `RwLock` is held only long
//! enough to fetch or insert a room's `Arc`, the room mutex for the whole
//! stamp/resolve/append/fan-out step. Different rooms never contend.
//!
//! Rooms are created on first reference and never evicted. A room that
//! drops to zero members keeps its log, so a reconnecting client can still
//! pull history. Unbounded growth over the process lifetime is the accepted
//! cost (there is no persistence tier to hydrate evicted rooms from).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock, mpsc};
use uuid::Uuid;

use crate::config::Config;
use crate::frame::{RoomMember, ServerFrame};
use crate::oplog::OpLog;

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state: the operation log plus connection bookkeeping.
///
/// `members` and `clients` always hold the same key set; join and leave
/// update both under the room mutex.
pub struct RoomState {
    /// The room's canonical operation log.
    pub log: OpLog,
    /// Presence entries keyed by client id.
    pub members: HashMap<Uuid, RoomMember>,
    /// Connected clients: `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<ServerFrame>>,
}

impl RoomState {
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self { log: OpLog::new(room_id), members: HashMap::new(), clients: HashMap::new() }
    }

    /// Current members in stable (client id) order.
    #[must_use]
    pub fn member_list(&self) -> Vec<RoomMember> {
        let mut members: Vec<RoomMember> = self.members.values().cloned().collect();
        members.sort_by(|a, b| a.client_id.cmp(&b.client_id));
        members
    }
}

/// A room handle. Cloned out of the map so the map lock drops before the
/// room mutex is taken.
pub type SharedRoom = Arc<Mutex<RoomState>>;

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    /// Live rooms keyed by room id.
    pub rooms: Arc<RwLock<HashMap<String, SharedRoom>>>,
    pub config: Config,
}

impl AppState {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), config }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;
