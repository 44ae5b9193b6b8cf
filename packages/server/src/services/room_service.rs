use log::info;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::GameError,
    models::room::{Room, RoomPlayer, RoomStatus},
    state::AppState,
};

pub async fn create_room(state: AppState, name: Option<String>, max_players: Option<usize>) -> u32 {
    let mut rooms = state.rooms.lock().await;
    let new_id = rooms
        .keys()
        .filter_map(|k| k.parse::<u32>().ok())
        .max()
        .unwrap_or(0)
        + 1;
    let new_room = Room::new(new_id.to_string(), name, max_players);
    rooms.insert(new_id.to_string(), new_room);
    new_id
}

/// Seats a player and returns the seat token that authenticates it from then on.
pub async fn join_room(
    state: AppState,
    room_id: &str,
    player_id: &str,
    player_name: &str,
) -> Result<String, GameError> {
    let mut rooms = state.rooms.lock().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;

    // ルームの状態がOpenか確認
    if room.status != RoomStatus::Open {
        return Err(GameError::RoomNotOpen);
    }
    if room.is_member(player_id) {
        return Err(GameError::AlreadyJoined(player_id.to_string()));
    }
    // プレイヤー数の上限チェック
    if room.players.len() >= room.max_players {
        return Err(GameError::RoomFull);
    }

    // 名前は試合中の識別子になる
    if room.name_taken(player_name) {
        return Err(GameError::NameTaken(player_name.to_string()));
    }

    let token = Uuid::new_v4().to_string();
    room.seat(
        RoomPlayer {
            id: player_id.to_string(),
            name: player_name.to_string(),
        },
        token.clone(),
    );
    // 最初の参加者がホストになる
    if room.host_id.is_none() {
        room.host_id = Some(player_id.to_string());
    }
    Ok(token)
}

/// Checks that `token` is the seat token issued to `player_id` in this room.
pub async fn authorize(
    state: &AppState,
    room_id: &str,
    player_id: &str,
    token: Option<&str>,
) -> Result<(), GameError> {
    let rooms = state.rooms.lock().await;
    let room = rooms
        .get(room_id)
        .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
    match token {
        Some(token) if room.token_matches(player_id, token) => Ok(()),
        _ => Err(GameError::Unauthorized),
    }
}

/// Removes a member. An emptied room is vacated together with its match and
/// its connections.
pub async fn leave_room(state: AppState, room_id: &str, player_id: &str) -> Result<(), GameError> {
    let vacated = {
        let mut rooms = state.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        if !room.unseat(player_id) {
            return Err(GameError::PlayerNotFound(player_id.to_string()));
        }
        if room.players.is_empty() {
            rooms.remove(room_id);
            true
        } else {
            false
        }
    };

    if vacated {
        info!("room {}: vacated", room_id);
        state.discard_room(room_id).await;
    } else {
        state.remove_player_connection(room_id, player_id).await;
    }
    Ok(())
}

pub async fn get_rooms(state: &AppState) -> HashMap<String, Room> {
    state.rooms.lock().await.clone()
}

pub async fn get_room_info(state: &AppState, room_id: &str) -> Result<Room, GameError> {
    let rooms = state.rooms.lock().await;
    rooms
        .get(room_id)
        .cloned()
        .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))
}

pub async fn delete_room(state: AppState, room_id: &str) -> bool {
    let removed = state.rooms.lock().await.remove(room_id).is_some();
    if removed {
        state.discard_room(room_id).await;
    }
    removed
}
