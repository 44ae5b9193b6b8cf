use log::{debug, error};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::{services::game_service, state::AppState};

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Starts the once-per-second ticker over every live match.
pub fn spawn(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(TICK_PERIOD);
        // 遅延したtickはまとめて実行しない
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // 最初のtickは即時に返るので読み捨てる
        interval.tick().await;
        loop {
            interval.tick().await;
            tick_all(&state).await;
        }
    })
}

/// One scheduler pass. Each match is ticked in its own task so a panicking
/// match cannot stall the others.
pub async fn tick_all(state: &AppState) {
    let handles = state.game_handles().await;
    if handles.is_empty() {
        return;
    }
    debug!("ticking {} matches", handles.len());

    let tasks: Vec<_> = handles
        .into_iter()
        .map(|(room_id, handle)| {
            let state = state.clone();
            tokio::spawn(async move {
                game_service::tick_game(&state, &room_id, &handle).await;
            })
        })
        .collect();

    for task in tasks {
        if let Err(e) = task.await {
            error!("match tick failed: {}", e);
        }
    }
}
