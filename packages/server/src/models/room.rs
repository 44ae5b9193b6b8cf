use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum RoomStatus {
    Open,
    InProgress,
}

/// Lobby-side roster entry. The engine only reads these at match start.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RoomPlayer {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub name: Option<String>,
    pub host_id: Option<String>,
    pub players: Vec<RoomPlayer>,
    pub max_players: usize,
    pub status: RoomStatus,
    // player id -> seat token; handed out once at join, never listed
    #[serde(skip)]
    seat_tokens: HashMap<String, String>,
}

impl Room {
    pub fn new(room_id: String, name: Option<String>, max_players: Option<usize>) -> Self {
        Room {
            room_id,
            name,
            host_id: None,
            players: Vec::new(),
            max_players: max_players.unwrap_or(9).clamp(5, 9),
            status: RoomStatus::Open,
            seat_tokens: HashMap::new(),
        }
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    pub fn is_host(&self, player_id: &str) -> bool {
        self.host_id.as_deref() == Some(player_id)
    }

    pub fn name_taken(&self, player_name: &str) -> bool {
        self.players.iter().any(|p| p.name == player_name)
    }

    pub fn seat(&mut self, player: RoomPlayer, token: String) {
        self.seat_tokens.insert(player.id.clone(), token);
        self.players.push(player);
    }

    /// Removes a member and revokes its token. Returns whether it was seated.
    pub fn unseat(&mut self, player_id: &str) -> bool {
        self.seat_tokens.remove(player_id);
        let before = self.players.len();
        self.players.retain(|p| p.id != player_id);
        self.players.len() != before
    }

    pub fn seat_token(&self, player_id: &str) -> Option<&str> {
        self.seat_tokens.get(player_id).map(String::as_str)
    }

    pub fn token_matches(&self, player_id: &str, token: &str) -> bool {
        self.is_member(player_id) && self.seat_token(player_id) == Some(token)
    }
}
