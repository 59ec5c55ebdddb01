use std::sync::Arc;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use uuid::Uuid;

use super::*;
use crate::oplog::OpKind;
use crate::state::test_helpers;

async fn join(state: &AppState, room_id: &str, name: &str) -> (Uuid, mpsc::Receiver<ServerFrame>, JoinSnapshot) {
    let client_id = Uuid::new_v4();
    let (tx, rx) = mpsc::channel(32);
    let snapshot = join_room(state, room_id, client_id, name, None, tx).await;
    (client_id, rx, snapshot)
}

/// Pop the next frame, which must be a members broadcast.
fn recv_members(rx: &mut mpsc::Receiver<ServerFrame>) -> (String, Vec<RoomMember>) {
    match rx.try_recv().expect("expected a members frame") {
        ServerFrame::Members { room_id, members } => (room_id, members),
        other => panic!("expected members frame, got {other:?}"),
    }
}

// =============================================================
// Registry
// =============================================================

#[tokio::test]
async fn ensure_room_creates_once() {
    let state = test_helpers::test_app_state();
    let first = ensure_room(&state, "r1").await;
    let second = ensure_room(&state, "r1").await;

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(state.rooms.read().await.len(), 1);
}

#[tokio::test]
async fn concurrent_ensure_room_yields_one_room() {
    let state = test_helpers::test_app_state();
    let (a, b) = tokio::join!(ensure_room(&state, "r1"), ensure_room(&state, "r1"));

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(state.rooms.read().await.len(), 1);
}

#[tokio::test]
async fn lookup_room_never_creates() {
    let state = test_helpers::test_app_state();
    assert!(lookup_room(&state, "ghost").await.is_none());
    assert!(state.rooms.read().await.is_empty());
}

#[tokio::test]
async fn list_rooms_reports_counts_sorted() {
    let state = test_helpers::test_app_state();
    join(&state, "beta", "ada").await;
    let (ada, _rx, _snap) = join(&state, "alpha", "ada").await;
    let room = lookup_room(&state, "alpha").await.unwrap();
    room.lock().await.log.apply(ada, OpKind::Stroke, json!({}));

    let overview = list_rooms(&state).await;
    assert_eq!(overview.len(), 2);
    assert_eq!(overview[0].room_id, "alpha");
    assert_eq!(overview[0].members, 1);
    assert_eq!(overview[0].ops, 1);
    assert_eq!(overview[1].room_id, "beta");
    assert_eq!(overview[1].ops, 0);
}

// =============================================================
// Join
// =============================================================

#[tokio::test]
async fn join_returns_peers_excluding_joiner() {
    let state = test_helpers::test_app_state();
    let (_ada, _rx_a, first) = join(&state, "r1", "ada").await;
    assert!(first.peers.is_empty());

    let (_lin, _rx_l, second) = join(&state, "r1", "lin").await;
    assert_eq!(second.peers.len(), 1);
    assert_eq!(second.peers[0].username, "ada");
}

#[tokio::test]
async fn join_broadcasts_post_mutation_member_list() {
    let state = test_helpers::test_app_state();
    let (_ada, mut rx_a, _snap) = join(&state, "r1", "ada").await;

    let (_, members) = recv_members(&mut rx_a);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "ada");

    join(&state, "r1", "lin").await;
    let (room_id, members) = recv_members(&mut rx_a);
    assert_eq!(room_id, "r1");
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn join_returns_bounded_history() {
    let mut state = test_helpers::test_app_state();
    state.config.history_limit = 2;
    let room = ensure_room(&state, "r1").await;
    {
        let mut room = room.lock().await;
        for _ in 0..3 {
            room.log.apply(Uuid::new_v4(), OpKind::Stroke, json!({}));
        }
    }

    let (_c, _rx, snapshot) = join(&state, "r1", "ada").await;
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.history[0].seq, 2);
    assert_eq!(snapshot.history[1].seq, 3);
}

#[tokio::test]
async fn join_history_reflects_current_flags() {
    let state = test_helpers::test_app_state();
    let room = ensure_room(&state, "r1").await;
    {
        let mut room = room.lock().await;
        room.log.apply(Uuid::new_v4(), OpKind::Stroke, json!({}));
        room.log.apply(Uuid::new_v4(), OpKind::Undo, json!({}));
    }

    let (_c, _rx, snapshot) = join(&state, "r1", "ada").await;
    assert_eq!(snapshot.history.len(), 2);
    assert_eq!(snapshot.history[0].kind, OpKind::Stroke);
    assert!(!snapshot.history[0].active);
}

#[tokio::test]
async fn join_assigns_palette_color_when_absent() {
    let state = test_helpers::test_app_state();
    join(&state, "r1", "ada").await;

    let members = list_members(&state, "r1").await;
    assert!(PALETTE.contains(&members[0].color.as_str()));
}

#[tokio::test]
async fn join_keeps_supplied_color() {
    let state = test_helpers::test_app_state();
    let (tx, _rx) = mpsc::channel(8);
    join_room(&state, "r1", Uuid::new_v4(), "ada", Some("#123456".into()), tx).await;

    assert_eq!(list_members(&state, "r1").await[0].color, "#123456");
}

// =============================================================
// Leave
// =============================================================

#[tokio::test]
async fn leave_room_is_idempotent() {
    let state = test_helpers::test_app_state();
    let (ada, _rx, _snap) = join(&state, "r1", "ada").await;

    assert!(leave_room(&state, "r1", ada).await);
    assert!(!leave_room(&state, "r1", ada).await);
    assert!(list_members(&state, "r1").await.is_empty());
}

#[tokio::test]
async fn leave_broadcasts_remaining_members() {
    let state = test_helpers::test_app_state();
    let (_ada, mut rx_a, _snap) = join(&state, "r1", "ada").await;
    let (lin, _rx_l, _snap) = join(&state, "r1", "lin").await;
    recv_members(&mut rx_a);
    recv_members(&mut rx_a);

    assert!(leave_room(&state, "r1", lin).await);

    let (_, members) = recv_members(&mut rx_a);
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].username, "ada");
}

#[tokio::test]
async fn leave_by_nonmember_sends_no_broadcast() {
    let state = test_helpers::test_app_state();
    let (_ada, mut rx_a, _snap) = join(&state, "r1", "ada").await;
    recv_members(&mut rx_a);

    assert!(!leave_room(&state, "r1", Uuid::new_v4()).await);
    assert!(matches!(rx_a.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn leave_unknown_room_returns_false() {
    let state = test_helpers::test_app_state();
    assert!(!leave_room(&state, "ghost", Uuid::new_v4()).await);
}

#[tokio::test]
async fn room_survives_last_leave() {
    let state = test_helpers::test_app_state();
    let (ada, _rx, _snap) = join(&state, "r1", "ada").await;
    {
        let room = lookup_room(&state, "r1").await.unwrap();
        room.lock().await.log.apply(ada, OpKind::Stroke, json!({}));
    }

    assert!(leave_room(&state, "r1", ada).await);

    let room = lookup_room(&state, "r1").await.expect("room retained after last leave");
    assert_eq!(room.lock().await.log.len(), 1);

    let (_lin, _rx2, snapshot) = join(&state, "r1", "lin").await;
    assert_eq!(snapshot.history.len(), 1);
}

#[tokio::test]
async fn list_members_empty_for_absent_room() {
    let state = test_helpers::test_app_state();
    assert!(list_members(&state, "ghost").await.is_empty());
}

// =============================================================
// Fan-out
// =============================================================

#[tokio::test]
async fn fan_out_excludes_one_client() {
    let state = test_helpers::test_app_state();
    let room = test_helpers::seed_room(&state, "r1").await;
    let (ada, mut rx_a) = test_helpers::attach_client(&room, "ada").await;
    let (_lin, mut rx_l) = test_helpers::attach_client(&room, "lin").await;

    {
        let room = room.lock().await;
        fan_out(&room, &ServerFrame::PeerCursor { client_id: ada, x: 1.0, y: 2.0 }, Some(ada));
    }

    assert!(matches!(rx_a.try_recv(), Err(TryRecvError::Empty)));
    assert!(matches!(rx_l.try_recv().unwrap(), ServerFrame::PeerCursor { .. }));
}

#[tokio::test]
async fn fan_out_full_buffer_drops_frame() {
    let mut room = RoomState::new("r1");
    let (tx, mut rx) = mpsc::channel(1);
    room.clients.insert(Uuid::new_v4(), tx);

    fan_out(&room, &ServerFrame::Members { room_id: "first".into(), members: Vec::new() }, None);
    fan_out(&room, &ServerFrame::Members { room_id: "second".into(), members: Vec::new() }, None);

    let ServerFrame::Members { room_id, .. } = rx.try_recv().unwrap() else {
        panic!("expected members frame");
    };
    assert_eq!(room_id, "first");
    assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn assign_color_draws_from_palette() {
    for _ in 0..20 {
        let color = assign_color();
        assert!(PALETTE.contains(&color.as_str()));
    }
}
