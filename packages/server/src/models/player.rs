use serde::{Deserialize, Serialize};

use super::{action::MissionVote, role::Role};

/// A participant of a running match. Seat order in `Game::players` is fixed
/// at match creation and drives speaker and leader rotation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub role: Role,
    // 1..=spy_count for spies, None for resistance
    pub spy_number: Option<usize>,
    pub is_leader: bool,
    pub nominated: bool,
    pub has_voted_for_leader: bool,
    pub mission_vote: Option<MissionVote>,
    pub confirmed_role: bool,
}

impl Player {
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            role: Role::Resistance,
            spy_number: None,
            is_leader: false,
            nominated: false,
            has_voted_for_leader: false,
            mission_vote: None,
            confirmed_role: false,
        }
    }

    pub fn is_spy(&self) -> bool {
        self.role == Role::Spy
    }

    /// Clears everything that only lives for one mission round.
    pub fn reset_round_flags(&mut self) {
        self.nominated = false;
        self.has_voted_for_leader = false;
        self.mission_vote = None;
    }
}
