use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MissionVote {
    Success,
    Fail,
}

/// Player intents accepted by a running match.
///
/// Payloads are tagged by `type`, e.g. `{"type":"nominate","targetName":"Alice"}`.
/// Tags this server does not know decode to [`GameAction::Unknown`] and are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum GameAction {
    ConfirmRole,
    PassTurn,
    Nominate { target_name: String },
    VoteForLeader { candidate_name: String },
    ToggleTeamMember { target_name: String },
    ApproveTeam,
    VoteForMission { vote: MissionVote },
    NextMission,
    #[serde(other)]
    Unknown,
}
