use axum::extract::ws::Message;
use log::warn;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::models::config::GameRules;
use crate::models::{chat::ChatMessage, game::Game, room::Room, view::GameView};
use crate::utils::websocket::ServerMessage;

/// A running match behind its own lock. Timer ticks and player actions for
/// the same match serialize here; other matches are unaffected.
pub type GameHandle = Arc<Mutex<Game>>;

/// Outbound handle of one live player connection.
pub struct Connection {
    pub id: Uuid,
    pub sender: mpsc::UnboundedSender<Message>,
}

/// Post-mutation payloads for one room: a projected view per match player
/// and any chat lines the mutation produced.
#[derive(Debug, Default)]
pub struct RoomUpdate {
    pub views: Vec<(String, GameView)>,
    pub chat: Vec<ChatMessage>,
}

/// Process-wide registry. Created once at startup, shared by the routes and
/// the scheduler, torn down on shutdown.
///
/// Lock order: a match lock, then `games`, then `connections`. `rooms` is
/// never held while any of the others is taken, and nothing waits on a match
/// lock while holding `games`.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<Mutex<HashMap<String, Room>>>,
    pub games: Arc<Mutex<HashMap<String, GameHandle>>>,
    // room id -> player id -> connection
    pub connections: Arc<Mutex<HashMap<String, HashMap<String, Connection>>>>,
    pub rules: Arc<GameRules>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::with_rules(GameRules::default())
    }

    pub fn with_rules(rules: GameRules) -> Self {
        AppState {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            games: Arc::new(Mutex::new(HashMap::new())),
            connections: Arc::new(Mutex::new(HashMap::new())),
            rules: Arc::new(rules),
        }
    }

    pub async fn game_handle(&self, room_id: &str) -> Option<GameHandle> {
        self.games.lock().await.get(room_id).cloned()
    }

    /// Snapshot of the live matches; the registry lock is released on return.
    pub async fn game_handles(&self) -> Vec<(String, GameHandle)> {
        self.games
            .lock()
            .await
            .iter()
            .map(|(room_id, handle)| (room_id.clone(), handle.clone()))
            .collect()
    }

    /// Registers a player's outbound channel, replacing any previous one.
    pub async fn register_connection(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> (Uuid, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        self.connections
            .lock()
            .await
            .entry(room_id.to_string())
            .or_default()
            .insert(player_id.to_string(), Connection { id, sender });
        (id, receiver)
    }

    /// Drops the connection only if it is still the registered one.
    pub async fn unregister_connection(&self, room_id: &str, player_id: &str, connection_id: Uuid) {
        let mut connections = self.connections.lock().await;
        if let Some(room) = connections.get_mut(room_id) {
            if room.get(player_id).map(|c| c.id) == Some(connection_id) {
                room.remove(player_id);
            }
            if room.is_empty() {
                connections.remove(room_id);
            }
        }
    }

    pub async fn remove_player_connection(&self, room_id: &str, player_id: &str) {
        if let Some(room) = self.connections.lock().await.get_mut(room_id) {
            room.remove(player_id);
        }
    }

    /// Forgets everything attached to a room: its match and its connections.
    pub async fn discard_room(&self, room_id: &str) {
        self.games.lock().await.remove(room_id);
        self.connections.lock().await.remove(room_id);
    }

    pub async fn send_to_player(&self, room_id: &str, player_id: &str, message: &ServerMessage) {
        let Some(frame) = encode(message) else {
            return;
        };
        let connections = self.connections.lock().await;
        if let Some(conn) = connections.get(room_id).and_then(|room| room.get(player_id)) {
            if conn.sender.send(frame).is_err() {
                warn!("room {}: connection of {} already closed", room_id, player_id);
            }
        }
    }

    pub async fn broadcast_chat(&self, room_id: &str, message: &ChatMessage) {
        let connections = self.connections.lock().await;
        send_chat(&connections, room_id, std::slice::from_ref(message));
    }

    /// Delivers `update` only if `handle` is still the match registered for
    /// the room. Updates from a replaced or deleted match are dropped.
    pub async fn deliver_if_current(
        &self,
        room_id: &str,
        handle: &GameHandle,
        update: RoomUpdate,
    ) -> bool {
        let games = self.games.lock().await;
        let current = games
            .get(room_id)
            .is_some_and(|registered| Arc::ptr_eq(registered, handle));
        if !current {
            return false;
        }

        let connections = self.connections.lock().await;
        send_chat(&connections, room_id, &update.chat);
        let Some(room) = connections.get(room_id) else {
            return true;
        };
        for (player_id, view) in update.views {
            let Some(conn) = room.get(&player_id) else {
                continue;
            };
            let Some(frame) = encode(&ServerMessage::GameState { state: view }) else {
                continue;
            };
            if conn.sender.send(frame).is_err() {
                warn!("room {}: connection of {} already closed", room_id, player_id);
            }
        }
        true
    }

    pub async fn teardown(&self) {
        self.games.lock().await.clear();
        self.connections.lock().await.clear();
        self.rooms.lock().await.clear();
    }
}

fn send_chat(
    connections: &HashMap<String, HashMap<String, Connection>>,
    room_id: &str,
    messages: &[ChatMessage],
) {
    let Some(room) = connections.get(room_id) else {
        return;
    };
    for message in messages {
        let Some(frame) = encode(&ServerMessage::Chat {
            message: message.clone(),
        }) else {
            continue;
        };
        for conn in room.values() {
            let _ = conn.sender.send(frame.clone());
        }
    }
}

fn encode(message: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(message) {
        Ok(text) => Some(Message::Text(text)),
        Err(e) => {
            warn!("failed to encode outbound message: {}", e);
            None
        }
    }
}
