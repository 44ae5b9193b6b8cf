use log::{debug, info};
use rand::{rngs::StdRng, SeedableRng};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

use crate::{
    error::GameError,
    models::{
        action::GameAction,
        chat::ChatMessage,
        game::Game,
        room::RoomStatus,
        view::GameView,
    },
    services::visibility,
    state::{AppState, GameHandle, RoomUpdate},
};

/// Starts a new match in the room, replacing any previous one.
pub async fn start_game(
    state: AppState,
    room_id: &str,
    requester_id: &str,
) -> Result<(), GameError> {
    let game = {
        let mut rooms = state.rooms.lock().await;
        let room = rooms
            .get_mut(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        if !room.is_host(requester_id) {
            return Err(GameError::NotHost);
        }
        let game = Game::new(
            room_id.to_string(),
            requester_id.to_string(),
            &room.players,
            (*state.rules).clone(),
            &mut StdRng::from_entropy(),
        )?;
        room.status = RoomStatus::InProgress;
        game
    };

    info!("room {}: match started: {}", room_id, game);
    let handle: GameHandle = Arc::new(Mutex::new(game));
    // 最初の状態がティックより先に届くよう、登録前にロックしておく
    let game = handle.lock().await;
    state
        .games
        .lock()
        .await
        .insert(room_id.to_string(), handle.clone());
    deliver(&state, room_id, &handle, game, 0).await;
    Ok(())
}

/// Routes a player action to the room's match.
///
/// Actions the match refuses (wrong phase, wrong player, repeated vote, ...)
/// are dropped without a trace visible to the actor: no error, no broadcast.
pub async fn submit_action(
    state: AppState,
    room_id: &str,
    player_id: &str,
    action: GameAction,
) -> Result<(), GameError> {
    ensure_member(&state, room_id, player_id).await?;
    let Some(handle) = state.game_handle(room_id).await else {
        debug!("room {}: no active match, ignoring {:?}", room_id, action);
        return Ok(());
    };

    let mut game = handle.lock().await;
    if game.player(player_id).is_none() {
        return Err(GameError::PlayerNotFound(player_id.to_string()));
    }
    let chat_mark = game.chat_log.len();
    if let Err(reason) = game.apply_action(player_id, &action) {
        debug!(
            "room {}: rejected {:?} from {}: {}",
            room_id, action, player_id, reason
        );
        return Ok(());
    }
    deliver(&state, room_id, &handle, game, chat_mark).await;
    Ok(())
}

/// Advances one match by a second. Called by the scheduler.
pub async fn tick_game(state: &AppState, room_id: &str, handle: &GameHandle) {
    let mut game = handle.lock().await;
    let chat_mark = game.chat_log.len();
    if game.tick() {
        deliver(state, room_id, handle, game, chat_mark).await;
    }
}

pub async fn get_game_view(
    state: &AppState,
    room_id: &str,
    viewer_id: &str,
) -> Result<GameView, GameError> {
    ensure_member(state, room_id, viewer_id).await?;
    let handle = state
        .game_handle(room_id)
        .await
        .ok_or_else(|| GameError::MatchNotFound(room_id.to_string()))?;
    let game = handle.lock().await;
    if game.player(viewer_id).is_none() {
        return Err(GameError::PlayerNotFound(viewer_id.to_string()));
    }
    Ok(visibility::project(&game, viewer_id))
}

pub async fn get_chat_log(state: &AppState, room_id: &str) -> Result<Vec<ChatMessage>, GameError> {
    let handle = state
        .game_handle(room_id)
        .await
        .ok_or_else(|| GameError::MatchNotFound(room_id.to_string()))?;
    let game = handle.lock().await;
    Ok(game.chat_log.messages.clone())
}

/// Relays a chat line from a room member and keeps it in the match log.
pub async fn post_chat(
    state: AppState,
    room_id: &str,
    player_id: &str,
    content: String,
) -> Result<(), GameError> {
    let player_name = {
        let rooms = state.rooms.lock().await;
        let room = rooms
            .get(room_id)
            .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
        room.players
            .iter()
            .find(|p| p.id == player_id)
            .map(|p| p.name.clone())
            .ok_or_else(|| GameError::PlayerNotFound(player_id.to_string()))?
    };

    let message = ChatMessage::from_player(player_id.to_string(), player_name, content);
    if let Some(handle) = state.game_handle(room_id).await {
        let mut game = handle.lock().await;
        // a finished match is frozen; the line is still relayed
        if !game.is_over {
            game.chat_log.push(message.clone());
        }
    }
    state.broadcast_chat(room_id, &message).await;
    Ok(())
}

/// Fresh per-player projections; never reuse them across mutations.
pub fn views_for(game: &Game) -> Vec<(String, GameView)> {
    game.players
        .iter()
        .map(|p| (p.id.clone(), visibility::project(game, &p.id)))
        .collect()
}

fn collect_update(game: &Game, chat_mark: usize) -> RoomUpdate {
    RoomUpdate {
        views: views_for(game),
        chat: game.chat_log.since(chat_mark).to_vec(),
    }
}

/// A seat vacated by leaving the room no longer acts or reads the match.
async fn ensure_member(state: &AppState, room_id: &str, player_id: &str) -> Result<(), GameError> {
    let rooms = state.rooms.lock().await;
    let room = rooms
        .get(room_id)
        .ok_or_else(|| GameError::RoomNotFound(room_id.to_string()))?;
    if !room.is_member(player_id) {
        return Err(GameError::PlayerNotFound(player_id.to_string()));
    }
    Ok(())
}

/// Sends the post-mutation update while `game` is still locked, so the
/// views of one match reach every connection in mutation order.
///
/// Lock order: match, then `games`, then `connections`.
async fn deliver(
    state: &AppState,
    room_id: &str,
    handle: &GameHandle,
    game: MutexGuard<'_, Game>,
    chat_mark: usize,
) {
    let update = collect_update(&game, chat_mark);
    let delivered = state.deliver_if_current(room_id, handle, update).await;
    let finished = game.is_over;
    drop(game);

    if delivered && finished {
        // 試合終了後はルームを再び開放する
        if let Some(room) = state.rooms.lock().await.get_mut(room_id) {
            room.status = RoomStatus::Open;
        }
    }
}
