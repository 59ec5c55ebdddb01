//! WebSocket gateway — the realtime entry point.
//!
//! DESIGN
//! ======
//! On upgrade, the connection gets a fresh client ID and a private mpsc
//! channel, then enters a `select!` loop:
//! - Incoming client frames → parse + dispatch by event
//! - Broadcast frames from room peers → forward to the socket
//!
//! `process_client_text` is the transport-free seam: it parses one inbound
//! text payload, mutates state through the services, and returns the frames
//! owed directly to the sender (the join acknowledgment and the history
//! snapshot). Peer traffic always travels through the per-connection
//! channels, so a client sees broadcasts in log order.
//!
//! Malformed input is logged at warn and dropped: a bad frame never gets a
//! reply, never stamps an operation, and never takes a room down.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → fresh `client_id` + per-connection channel
//! 2. Client frames → dispatch → services mutate state and broadcast
//! 3. Close or socket error → leave current room → members broadcast

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{ClientFrame, ServerFrame};
use crate::services::{cursor, op, room};
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel carrying frames broadcast by room peers.
    let (client_tx, mut client_rx) = mpsc::channel::<ServerFrame>(256);

    info!(%client_id, "ws: client connected");

    // The room this connection has joined, if any. One room per connection.
    let mut current_room: Option<String> = None;

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_text(&state, &mut socket, &mut current_room, client_id, &client_tx, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Leaving broadcasts the updated member list, but only if this client
    // was actually a member.
    if let Some(room_id) = current_room {
        room::leave_room(&state, &room_id, client_id).await;
    }
    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Process one inbound text payload and write the sender-directed frames
/// straight to the socket.
async fn dispatch_text(
    state: &AppState,
    socket: &mut WebSocket,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<ServerFrame>,
    text: &str,
) {
    let sender_frames = process_client_text(state, current_room, client_id, client_tx, text).await;
    for frame in sender_frames {
        let _ = send_frame(socket, &frame).await;
    }
}

/// Parse and process one inbound text payload and return the frames owed
/// directly to the sender.
///
/// This keeps the websocket transport separate from frame handling, so
/// tests can drive the gateway without a live socket.
async fn process_client_text(
    state: &AppState,
    current_room: &mut Option<String>,
    client_id: Uuid,
    client_tx: &mpsc::Sender<ServerFrame>,
    text: &str,
) -> Vec<ServerFrame> {
    let frame: ClientFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return Vec::new();
        }
    };

    match frame {
        ClientFrame::JoinRoom { room_id, username, color } => {
            // One room per connection: joining leaves the previous room first.
            if let Some(old_room) = current_room.take() {
                room::leave_room(state, &old_room, client_id).await;
            }

            let snapshot =
                room::join_room(state, &room_id, client_id, &username, color, client_tx.clone()).await;
            *current_room = Some(room_id.clone());

            vec![
                ServerFrame::Joined { client_id, room_id, peers: snapshot.peers },
                ServerFrame::History { ops: snapshot.history },
            ]
        }
        ClientFrame::LeaveRoom { room_id } => {
            if current_room.as_deref() == Some(room_id.as_str()) {
                *current_room = None;
            }
            room::leave_room(state, &room_id, client_id).await;
            Vec::new()
        }
        ClientFrame::Op { room_id, kind, payload } => {
            op::append_operation(state, &room_id, client_id, kind, payload).await;
            Vec::new()
        }
        ClientFrame::Cursor { room_id, x, y } => {
            cursor::broadcast_cursor(state, &room_id, client_id, x, y).await;
            Vec::new()
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
