use dotenvy::dotenv;
use std::sync::Once;

use crate::{error::GameError, services::room_service, state::AppState};

static INIT: Once = Once::new();

pub fn setup_test_env() {
    INIT.call_once(|| {
        dotenv().ok();
        // テストでは既定のタイマー値を使う
        for var in [
            "RESISTANCE_DISCUSSION_SECS",
            "RESISTANCE_TEAM_SELECTION_SECS",
            "RESISTANCE_TIE_SECS_PER_CANDIDATE",
        ] {
            std::env::remove_var(var);
        }
    });
}

/// Creates a room holding players `p1..=pn` (named `Player1..`), `p1` as
/// host, and returns its id.
pub async fn create_room_with_players(state: &AppState, n: usize) -> Result<String, GameError> {
    let room_id = room_service::create_room(state.clone(), None, Some(n.max(5)))
        .await
        .to_string();
    for i in 1..=n {
        room_service::join_room(
            state.clone(),
            &room_id,
            &format!("p{}", i),
            &format!("Player{}", i),
        )
        .await?;
    }
    Ok(room_id)
}

/// Seat token issued to `player_id` at join.
pub async fn seat_token(state: &AppState, room_id: &str, player_id: &str) -> Option<String> {
    let rooms = state.rooms.lock().await;
    rooms
        .get(room_id)
        .and_then(|room| room.seat_token(player_id))
        .map(str::to_string)
}
