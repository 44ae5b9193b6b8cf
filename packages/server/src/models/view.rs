use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{
    action::MissionVote,
    game::{GamePhase, MissionOutcome},
    role::{Role, VisibleRole},
};

/// One player as seen by a particular viewer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub role: VisibleRole,
    pub spy_number: Option<usize>,
    pub is_leader: bool,
    pub nominated: bool,
    pub has_voted_for_leader: bool,
    pub has_voted_for_mission: bool,
    pub mission_vote: Option<MissionVote>,
    pub confirmed_role: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpyInfo {
    pub id: String,
    pub name: String,
    pub spy_number: usize,
}

/// Match state rendered for one viewer. Never cache these: derive a fresh
/// one for every delivery.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameView {
    pub room_id: String,
    pub viewer_id: String,
    pub phase: GamePhase,
    pub players: Vec<PlayerView>,
    // only present for spy viewers
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fellow_spies: Option<Vec<SpyInfo>>,
    pub current_mission_index: usize,
    pub mission_team_sizes: Vec<usize>,
    pub successful_missions: u8,
    pub failed_missions: u8,
    pub current_leader_index: usize,
    pub current_speaker_index: usize,
    pub discussion_turns_taken: usize,
    pub discussion_seconds_left: u32,
    pub team_selection_seconds_left: u32,
    pub tie_break_seconds_left: u32,
    pub nominated_candidates: Vec<String>,
    // voter name -> candidate name
    pub leader_votes: BTreeMap<String, String>,
    pub mission_team: Vec<String>,
    pub mission_ballots_cast: usize,
    pub mission_outcomes: Vec<MissionOutcome>,
    pub tie_candidates: Vec<String>,
    pub is_second_tie_round: bool,
    pub is_over: bool,
    pub winning_faction: Option<Role>,
}
