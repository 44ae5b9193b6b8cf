use crate::models::{
    action::MissionVote,
    config::{GameRules, MISSIONS_TO_WIN},
    game::MissionOutcome,
    role::Role,
};

/// Outcome of one mission plus the updated scoreboard.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionResolution {
    pub outcome: MissionOutcome,
    pub successful_missions: u8,
    pub failed_missions: u8,
    pub winner: Option<Role>,
}

/// Scoreboard before the mission is resolved.
#[derive(Debug, Clone, Copy)]
pub struct Scoreboard {
    pub mission_index: usize,
    pub player_count: usize,
    pub successful_missions: u8,
    pub failed_missions: u8,
}

pub fn resolve<'a>(
    rules: &GameRules,
    board: Scoreboard,
    ballots: impl IntoIterator<Item = &'a MissionVote>,
) -> MissionResolution {
    let (success_count, fail_count) =
        ballots
            .into_iter()
            .fold((0, 0), |(s, f), vote| match vote {
                MissionVote::Success => (s + 1, f),
                MissionVote::Fail => (s, f + 1),
            });
    let success = fail_count < rules.required_fails(board.mission_index, board.player_count);
    settle(board, success, success_count, fail_count)
}

/// A team that was never approved in time counts as a failed mission with
/// no ballots.
pub fn resolve_timeout(board: Scoreboard) -> MissionResolution {
    settle(board, false, 0, 0)
}

fn settle(
    board: Scoreboard,
    success: bool,
    success_count: usize,
    fail_count: usize,
) -> MissionResolution {
    let mut successful_missions = board.successful_missions;
    let mut failed_missions = board.failed_missions;
    if success {
        successful_missions += 1;
    } else {
        failed_missions += 1;
    }

    let winner = if successful_missions >= MISSIONS_TO_WIN {
        Some(Role::Resistance)
    } else if failed_missions >= MISSIONS_TO_WIN {
        Some(Role::Spy)
    } else {
        None
    };

    MissionResolution {
        outcome: MissionOutcome {
            mission_index: board.mission_index,
            success,
            success_count,
            fail_count,
        },
        successful_missions,
        failed_missions,
        winner,
    }
}
