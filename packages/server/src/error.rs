use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Structural failures surfaced to the caller.
#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(String),
    #[error("no active match in room {0}")]
    MatchNotFound(String),
    #[error("player {0} not found")]
    PlayerNotFound(String),
    #[error("a match needs between 5 and 9 players, room has {0}")]
    InvalidRosterSize(usize),
    #[error("only the room host can start a match")]
    NotHost,
    #[error("room is full")]
    RoomFull,
    #[error("room is not accepting players")]
    RoomNotOpen,
    #[error("player {0} already joined")]
    AlreadyJoined(String),
    #[error("player name {0} is already taken")]
    NameTaken(String),
    #[error("missing or invalid seat token")]
    Unauthorized,
}

impl GameError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GameError::RoomNotFound(_) | GameError::MatchNotFound(_) | GameError::PlayerNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            GameError::NotHost => StatusCode::FORBIDDEN,
            GameError::Unauthorized => StatusCode::UNAUTHORIZED,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_string())).into_response()
    }
}

/// Why the engine refused an action. Only ever logged server-side; the
/// actor just observes that nothing happened.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ActionRejected {
    #[error("match is over")]
    MatchOver,
    #[error("action not allowed in the current phase")]
    WrongPhase,
    #[error("role already confirmed")]
    AlreadyConfirmed,
    #[error("only the active speaker or the host may do this")]
    NotSpeaker,
    #[error("speaker already nominated this turn")]
    AlreadyNominated,
    #[error("no player with that name")]
    UnknownTarget,
    #[error("player already voted")]
    AlreadyVoted,
    #[error("candidate is not on the ballot")]
    NotOnBallot,
    #[error("only the leader may do this")]
    NotLeader,
    #[error("mission team is full")]
    TeamFull,
    #[error("mission team is incomplete")]
    TeamIncomplete,
    #[error("player is not on the mission team")]
    NotOnTeam,
    #[error("resistance members cannot sabotage")]
    ResistanceCannotFail,
    #[error("no further missions")]
    NoMissionsLeft,
    #[error("unrecognised action")]
    UnknownAction,
}
