use serde_json::json;
use uuid::Uuid;

use super::test_helpers::*;
use super::*;
use crate::oplog::OpKind;

#[test]
fn room_state_new_is_empty() {
    let room = RoomState::new("r1");
    assert!(room.log.is_empty());
    assert!(room.members.is_empty());
    assert!(room.clients.is_empty());
}

#[test]
fn member_list_is_sorted_by_client_id() {
    let mut room = RoomState::new("r1");
    let low = Uuid::parse_str("00000000-0000-0000-0000-000000000001").unwrap();
    let high = Uuid::parse_str("ffffffff-ffff-ffff-ffff-ffffffffffff").unwrap();
    room.members
        .insert(high, RoomMember { client_id: high, username: "zed".into(), color: "#000".into() });
    room.members
        .insert(low, RoomMember { client_id: low, username: "ada".into(), color: "#fff".into() });

    let list = room.member_list();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0].client_id, low);
    assert_eq!(list[1].client_id, high);
}

#[tokio::test]
async fn app_state_clone_shares_rooms() {
    let state = test_app_state();
    let other = state.clone();
    seed_room(&state, "shared").await;

    let rooms = other.rooms.read().await;
    assert!(rooms.contains_key("shared"));
}

#[tokio::test]
async fn seeded_room_log_carries_room_id() {
    let state = test_app_state();
    let room = seed_room(&state, "art").await;

    let op = room.lock().await.log.apply(Uuid::new_v4(), OpKind::Stroke, json!({}));
    assert_eq!(op.op_id, "art:1");
}

#[tokio::test]
async fn attach_client_registers_both_maps() {
    let state = test_app_state();
    let room = seed_room(&state, "r1").await;
    let (client_id, _rx) = attach_client(&room, "ada").await;

    let room = room.lock().await;
    assert!(room.members.contains_key(&client_id));
    assert!(room.clients.contains_key(&client_id));
    assert_eq!(room.member_list()[0].username, "ada");
}
