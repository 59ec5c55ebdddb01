//! Operation log — ordering authority and undo history for one room.
//!
//! DESIGN
//! ======
//! Every room owns one `OpLog`. The log is that room's single source of
//! truth: an append-only sequence of stamped operations plus an opId index.
//! `apply` is the only mutation and runs stamp → resolve → append as one
//! step, so sequence numbers stay gapless and no caller can race an undo
//! scan against an append.
//!
//! The log doubles as the undo history: a targetless undo walks backward
//! for the newest active stroke instead of consulting a separate stack.
//! Unresolvable targets are recorded as no-op markers, never errors —
//! replay needs the full intent stream, including intents that resolved to
//! nothing.

#[cfg(test)]
#[path = "oplog_test.rs"]
mod oplog_test;

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload key naming an undo/redo target. Resolution always leaves this
/// key present on stored undo/redo payloads.
pub const TARGET_KEY: &str = "targetOpId";

// =============================================================================
// OPERATION
// =============================================================================

/// The kind of a logged operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpKind {
    /// A drawing action. The only kind replay composites.
    Stroke,
    /// Deactivates one stroke: explicit target, or newest-active scan.
    Undo,
    /// Reactivates one stroke. Explicit target only.
    Redo,
}

/// A stamped operation, as stored in the log and sent on the wire.
///
/// Immutable once stamped, with one exception: a stroke's `active` flag is
/// toggled by later undo/redo resolution. Undo and redo operations keep
/// `active = true` forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    /// Position in the room's total order. Gapless, starts at 1.
    pub seq: u64,
    /// `"{roomId}:{seq}"`. Maps to exactly one operation, never reused.
    pub op_id: String,
    /// Connection that submitted the operation.
    pub client_id: Uuid,
    #[serde(rename = "type")]
    pub kind: OpKind,
    /// Client data. Stroke payloads round-trip verbatim (unknown fields
    /// survive replay); undo/redo payloads carry a resolved `targetOpId`.
    pub payload: serde_json::Value,
    /// Whether a stroke contributes to replay.
    pub active: bool,
    /// Stamping time, milliseconds since Unix epoch. Informational only.
    pub timestamp: i64,
}

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// OP LOG
// =============================================================================

/// Append-only operation log for one room.
///
/// Owns the room's sequence counter and identifier index. Nothing is ever
/// removed or reordered; the history bound applies to the `recent` view,
/// not the log itself.
pub struct OpLog {
    room_id: String,
    ops: Vec<Operation>,
    /// opId -> position in `ops`.
    index: HashMap<String, usize>,
    last_seq: u64,
}

impl OpLog {
    /// Create an empty log for a room.
    #[must_use]
    pub fn new(room_id: impl Into<String>) -> Self {
        Self { room_id: room_id.into(), ops: Vec::new(), index: HashMap::new(), last_seq: 0 }
    }

    /// Stamp, resolve, and append one operation, returning the stored form.
    ///
    /// The only mutation entry point. Never fails: an undo/redo whose target
    /// resolves to nothing is appended as a no-op marker.
    pub fn apply(&mut self, client_id: Uuid, kind: OpKind, payload: serde_json::Value) -> Operation {
        self.last_seq += 1;
        let seq = self.last_seq;
        let op_id = format!("{}:{seq}", self.room_id);

        let payload = match kind {
            OpKind::Stroke => payload,
            OpKind::Undo => self.resolve_undo(payload),
            OpKind::Redo => self.resolve_redo(payload),
        };

        let op = Operation {
            seq,
            op_id: op_id.clone(),
            client_id,
            kind,
            payload,
            active: true,
            timestamp: now_ms(),
        };
        self.index.insert(op_id, self.ops.len());
        self.ops.push(op.clone());
        op
    }

    /// Look up an operation by opId. Scoped to this room's log: a foreign
    /// room's opId is simply not found.
    #[must_use]
    pub fn get(&self, op_id: &str) -> Option<&Operation> {
        self.index.get(op_id).map(|&i| &self.ops[i])
    }

    /// The last `limit` operations in log order, with current flags.
    #[must_use]
    pub fn recent(&self, limit: usize) -> &[Operation] {
        let start = self.ops.len().saturating_sub(limit);
        &self.ops[start..]
    }

    /// Total number of logged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns `true` if nothing has been logged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    // =========================================================================
    // UNDO / REDO RESOLUTION
    // =========================================================================

    /// Resolve an undo payload, deactivating at most one stroke.
    fn resolve_undo(&mut self, payload: serde_json::Value) -> serde_json::Value {
        let mut payload = ensure_object(payload);
        let supplied = payload.get(TARGET_KEY).filter(|v| !v.is_null()).cloned();
        if let Some(target) = supplied {
            // The client's value is stored verbatim even when it resolves
            // to nothing (dangling id, non-stroke target, wrong type).
            if let Some(id) = target.as_str() {
                self.set_stroke_active(id, false);
            }
        } else {
            let found = self.newest_active_stroke().map(|op| op.op_id.clone());
            if let Some(ref id) = found {
                self.set_stroke_active(id, false);
            }
            set_target(&mut payload, found);
        }
        payload
    }

    /// Resolve a redo payload, reactivating at most one stroke.
    ///
    /// Asymmetric with undo: a redo without an explicit target never
    /// searches for the most recently undone stroke. It records `null` and
    /// touches nothing.
    fn resolve_redo(&mut self, payload: serde_json::Value) -> serde_json::Value {
        let mut payload = ensure_object(payload);
        let supplied = payload.get(TARGET_KEY).filter(|v| !v.is_null()).cloned();
        if let Some(target) = supplied {
            if let Some(id) = target.as_str() {
                self.set_stroke_active(id, true);
            }
        } else {
            set_target(&mut payload, None);
        }
        payload
    }

    /// Newest operation with `kind = stroke` and `active = true`, if any.
    fn newest_active_stroke(&self) -> Option<&Operation> {
        self.ops.iter().rev().find(|op| op.kind == OpKind::Stroke && op.active)
    }

    /// Flip one stroke's active flag. Unknown ids and non-stroke targets
    /// are left untouched.
    fn set_stroke_active(&mut self, op_id: &str, active: bool) {
        let Some(&i) = self.index.get(op_id) else {
            return;
        };
        let op = &mut self.ops[i];
        if op.kind == OpKind::Stroke {
            op.active = active;
        }
    }
}

/// Wrap non-object undo/redo payloads so the resolved target has a home.
fn ensure_object(payload: serde_json::Value) -> serde_json::Value {
    if payload.is_object() { payload } else { serde_json::json!({}) }
}

/// Write the resolved target into the payload: the opId when resolution
/// found a stroke, explicit `null` when it found nothing.
fn set_target(payload: &mut serde_json::Value, target: Option<String>) {
    if let Some(map) = payload.as_object_mut() {
        let value = target.map_or(serde_json::Value::Null, serde_json::Value::String);
        map.insert(TARGET_KEY.to_string(), value);
    }
}
