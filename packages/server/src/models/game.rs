use log::info;
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use super::{
    action::{GameAction, MissionVote},
    chat::ChatLog,
    config::{GameRules, MISSION_COUNT},
    player::Player,
    role::Role,
    room::RoomPlayer,
};
use crate::error::{ActionRejected, GameError};
use crate::services::{
    mission::{self, MissionResolution, Scoreboard},
    tally::{self, LeaderBallot, TallyOutcome},
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum GamePhase {
    RoleReveal,
    Discussion,
    LeaderDiscussion,
    Voting,
    TieDiscussion,
    MissionTeamSelection,
    MissionVoting,
    MissionResults,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MissionOutcome {
    pub mission_index: usize,
    pub success: bool,
    pub success_count: usize,
    pub fail_count: usize,
}

/// State of one match. Owned by its session lock; every mutation goes
/// through [`Game::apply_action`] or [`Game::tick`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub room_id: String,
    pub host_id: String,
    pub players: Vec<Player>,
    pub phase: GamePhase,
    pub current_mission_index: usize,
    pub mission_team_sizes: [usize; MISSION_COUNT],
    pub successful_missions: u8,
    pub failed_missions: u8,
    pub current_leader_index: usize,
    // leader the current mission round began with; rotation and fallbacks key off it
    pub starting_leader_index: usize,
    pub current_speaker_index: usize,
    pub discussion_turns_taken: usize,
    pub speaker_has_nominated: bool,
    pub discussion_seconds_left: u32,
    pub team_selection_seconds_left: u32,
    pub tie_break_seconds_left: u32,
    pub nominated_candidates: BTreeSet<String>,
    // voter id -> candidate name
    pub leader_votes: HashMap<String, String>,
    pub mission_team: BTreeSet<String>,
    // voter id -> ballot
    pub mission_ballots: HashMap<String, MissionVote>,
    pub mission_outcomes: Vec<MissionOutcome>,
    pub tie_candidates: BTreeSet<String>,
    pub is_second_tie_round: bool,
    pub is_over: bool,
    pub winning_faction: Option<Role>,
    pub chat_log: ChatLog,
    #[serde(skip)]
    pub rules: GameRules,
}

impl std::fmt::Display for Game {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Game {{ room_id: {}, players: {}, phase: {:?}, mission: {}, score: {}-{}, over: {} }}",
            self.room_id,
            self.players.len(),
            self.phase,
            self.current_mission_index,
            self.successful_missions,
            self.failed_missions,
            self.is_over
        )
    }
}

impl Game {
    /// Deals roles and seats a new match in `RoleReveal`.
    pub fn new<R: Rng + ?Sized>(
        room_id: String,
        host_id: String,
        roster: &[RoomPlayer],
        rules: GameRules,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let n = roster.len();
        if !rules.roster_size_allowed(n) {
            return Err(GameError::InvalidRosterSize(n));
        }
        // チーム・指名・投票は名前で管理するので重複は許さない
        let mut names = HashSet::new();
        if let Some(dup) = roster.iter().find(|p| !names.insert(p.name.as_str())) {
            return Err(GameError::NameTaken(dup.name.clone()));
        }

        let mut players: Vec<Player> = roster
            .iter()
            .map(|p| Player::new(p.id.clone(), p.name.clone()))
            .collect();

        let mut seats: Vec<usize> = (0..n).collect();
        seats.shuffle(rng);
        let mut spy_seats: Vec<usize> = seats[..rules.spy_count(n)].to_vec();
        // ordinals follow roster order among the chosen spies
        spy_seats.sort_unstable();
        for (ordinal, seat) in spy_seats.into_iter().enumerate() {
            players[seat].role = Role::Spy;
            players[seat].spy_number = Some(ordinal + 1);
        }

        let leader = rng.gen_range(0..n);
        players[leader].is_leader = true;

        let mut chat_log = ChatLog::default();
        chat_log.announce(format!(
            "Match started with {} players, {} of them spies",
            n,
            rules.spy_count(n)
        ));

        Ok(Game {
            room_id,
            host_id,
            players,
            phase: GamePhase::RoleReveal,
            current_mission_index: 1,
            mission_team_sizes: rules.mission_team_sizes(n),
            successful_missions: 0,
            failed_missions: 0,
            current_leader_index: leader,
            starting_leader_index: leader,
            current_speaker_index: leader,
            discussion_turns_taken: 0,
            speaker_has_nominated: false,
            discussion_seconds_left: rules.discussion_turn_secs,
            team_selection_seconds_left: rules.team_selection_secs,
            tie_break_seconds_left: 0,
            nominated_candidates: BTreeSet::new(),
            leader_votes: HashMap::new(),
            mission_team: BTreeSet::new(),
            mission_ballots: HashMap::new(),
            mission_outcomes: Vec::new(),
            tie_candidates: BTreeSet::new(),
            is_second_tie_round: false,
            is_over: false,
            winning_faction: None,
            chat_log,
            rules,
        })
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn leader(&self) -> &Player {
        &self.players[self.current_leader_index]
    }

    pub fn speaker(&self) -> &Player {
        &self.players[self.current_speaker_index]
    }

    pub fn required_team_size(&self) -> usize {
        self.mission_team_sizes[self.current_mission_index - 1]
    }

    fn seat_of(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    fn seat_by_name(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }

    /// Team membership resolved to seats, so a ballot is tied to the picked seat.
    fn on_mission_team(&self, seat: usize) -> bool {
        self.mission_team
            .iter()
            .any(|name| self.seat_by_name(name) == Some(seat))
    }

    /// Applies a player's action. A rejection leaves the state untouched.
    pub fn apply_action(
        &mut self,
        player_id: &str,
        action: &GameAction,
    ) -> Result<(), ActionRejected> {
        if self.is_over {
            return Err(ActionRejected::MatchOver);
        }
        let seat = self.seat_of(player_id).ok_or(ActionRejected::UnknownTarget)?;

        match action {
            GameAction::ConfirmRole => self.confirm_role(seat),
            GameAction::PassTurn => self.pass_turn(seat),
            GameAction::Nominate { target_name } => self.nominate(seat, target_name),
            GameAction::VoteForLeader { candidate_name } => {
                self.vote_for_leader(seat, candidate_name)
            }
            GameAction::ToggleTeamMember { target_name } => {
                self.toggle_team_member(seat, target_name)
            }
            GameAction::ApproveTeam => self.approve_team(seat),
            GameAction::VoteForMission { vote } => self.vote_for_mission(seat, *vote),
            GameAction::NextMission => self.next_mission(),
            GameAction::Unknown => Err(ActionRejected::UnknownAction),
        }
    }

    /// Advances the running timer by one second. Returns whether anything
    /// changed (and therefore needs broadcasting).
    pub fn tick(&mut self) -> bool {
        if self.is_over {
            return false;
        }
        match self.phase {
            GamePhase::Discussion | GamePhase::LeaderDiscussion => {
                self.discussion_seconds_left = self.discussion_seconds_left.saturating_sub(1);
                if self.discussion_seconds_left == 0 {
                    self.advance_turn();
                }
                true
            }
            GamePhase::TieDiscussion => {
                self.tie_break_seconds_left = self.tie_break_seconds_left.saturating_sub(1);
                if self.tie_break_seconds_left == 0 {
                    self.enter_voting();
                }
                true
            }
            GamePhase::MissionTeamSelection => {
                self.team_selection_seconds_left =
                    self.team_selection_seconds_left.saturating_sub(1);
                if self.team_selection_seconds_left == 0 {
                    let resolution = mission::resolve_timeout(self.scoreboard());
                    self.record_mission(resolution);
                }
                true
            }
            GamePhase::RoleReveal
            | GamePhase::Voting
            | GamePhase::MissionVoting
            | GamePhase::MissionResults => false,
        }
    }

    fn confirm_role(&mut self, seat: usize) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::RoleReveal {
            return Err(ActionRejected::WrongPhase);
        }
        if self.players[seat].confirmed_role {
            return Err(ActionRejected::AlreadyConfirmed);
        }
        self.players[seat].confirmed_role = true;
        if self.players.iter().all(|p| p.confirmed_role) {
            self.enter_discussion();
        }
        Ok(())
    }

    fn pass_turn(&mut self, seat: usize) -> Result<(), ActionRejected> {
        if !matches!(
            self.phase,
            GamePhase::Discussion | GamePhase::LeaderDiscussion
        ) {
            return Err(ActionRejected::WrongPhase);
        }
        let actor = &self.players[seat];
        if seat != self.current_speaker_index && actor.id != self.host_id {
            return Err(ActionRejected::NotSpeaker);
        }
        self.advance_turn();
        Ok(())
    }

    fn nominate(&mut self, seat: usize, target_name: &str) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::Discussion {
            return Err(ActionRejected::WrongPhase);
        }
        if seat != self.current_speaker_index {
            return Err(ActionRejected::NotSpeaker);
        }
        if self.speaker_has_nominated {
            return Err(ActionRejected::AlreadyNominated);
        }
        let target = self
            .seat_by_name(target_name)
            .ok_or(ActionRejected::UnknownTarget)?;
        if !self.nominated_candidates.insert(target_name.to_string()) {
            return Err(ActionRejected::AlreadyNominated);
        }
        self.players[target].nominated = true;
        self.speaker_has_nominated = true;
        Ok(())
    }

    fn vote_for_leader(&mut self, seat: usize, candidate: &str) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::Voting {
            return Err(ActionRejected::WrongPhase);
        }
        if self.players[seat].has_voted_for_leader {
            return Err(ActionRejected::AlreadyVoted);
        }
        if !self.ballot_candidates().contains(candidate) {
            return Err(ActionRejected::NotOnBallot);
        }

        let voter = &mut self.players[seat];
        voter.has_voted_for_leader = true;
        self.leader_votes
            .insert(voter.id.clone(), candidate.to_string());

        if self.players.iter().all(|p| p.has_voted_for_leader) {
            self.tally_leader_votes();
        }
        Ok(())
    }

    fn toggle_team_member(&mut self, seat: usize, target_name: &str) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::MissionTeamSelection {
            return Err(ActionRejected::WrongPhase);
        }
        if seat != self.current_leader_index {
            return Err(ActionRejected::NotLeader);
        }
        if self.seat_by_name(target_name).is_none() {
            return Err(ActionRejected::UnknownTarget);
        }

        if !self.mission_team.remove(target_name) {
            if self.mission_team.len() >= self.required_team_size() {
                return Err(ActionRejected::TeamFull);
            }
            self.mission_team.insert(target_name.to_string());
        }
        Ok(())
    }

    fn approve_team(&mut self, seat: usize) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::MissionTeamSelection {
            return Err(ActionRejected::WrongPhase);
        }
        if seat != self.current_leader_index {
            return Err(ActionRejected::NotLeader);
        }
        if self.mission_team.len() != self.required_team_size() {
            return Err(ActionRejected::TeamIncomplete);
        }

        self.mission_ballots.clear();
        for player in &mut self.players {
            player.mission_vote = None;
        }
        self.phase = GamePhase::MissionVoting;
        Ok(())
    }

    fn vote_for_mission(&mut self, seat: usize, vote: MissionVote) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::MissionVoting {
            return Err(ActionRejected::WrongPhase);
        }
        if !self.on_mission_team(seat) {
            return Err(ActionRejected::NotOnTeam);
        }
        let voter = &self.players[seat];
        if self.mission_ballots.contains_key(&voter.id) {
            return Err(ActionRejected::AlreadyVoted);
        }
        if vote == MissionVote::Fail && !voter.is_spy() {
            return Err(ActionRejected::ResistanceCannotFail);
        }

        let voter = &mut self.players[seat];
        voter.mission_vote = Some(vote);
        self.mission_ballots.insert(voter.id.clone(), vote);

        if self.mission_ballots.len() == self.mission_team.len() {
            let resolution =
                mission::resolve(&self.rules, self.scoreboard(), self.mission_ballots.values());
            self.record_mission(resolution);
        }
        Ok(())
    }

    fn next_mission(&mut self) -> Result<(), ActionRejected> {
        if self.phase != GamePhase::MissionResults {
            return Err(ActionRejected::WrongPhase);
        }
        if self.current_mission_index >= MISSION_COUNT {
            return Err(ActionRejected::NoMissionsLeft);
        }

        self.current_mission_index += 1;
        for player in &mut self.players {
            player.reset_round_flags();
        }
        self.nominated_candidates.clear();
        self.leader_votes.clear();
        self.mission_team.clear();
        self.mission_ballots.clear();
        self.clear_tie();

        let next = (self.starting_leader_index + 1) % self.players.len();
        self.set_leader(next);
        self.enter_discussion();
        Ok(())
    }

    /// Shared by the timer and the pass action.
    fn advance_turn(&mut self) {
        self.discussion_turns_taken += 1;
        if self.discussion_turns_taken >= self.players.len() {
            match self.phase {
                GamePhase::Discussion => self.finalize_discussion(),
                GamePhase::LeaderDiscussion => self.enter_team_selection(),
                _ => {}
            }
            return;
        }
        self.current_speaker_index = (self.current_speaker_index + 1) % self.players.len();
        self.discussion_seconds_left = self.rules.discussion_turn_secs;
        self.speaker_has_nominated = false;
    }

    fn finalize_discussion(&mut self) {
        let nominees: Vec<String> = self.nominated_candidates.iter().cloned().collect();
        match nominees.as_slice() {
            [] => self.elect(self.starting_leader_index),
            [only] => match self.seat_by_name(only) {
                Some(seat) => self.elect(seat),
                None => self.elect(self.starting_leader_index),
            },
            _ => self.enter_voting(),
        }
    }

    fn enter_discussion(&mut self) {
        self.phase = GamePhase::Discussion;
        self.starting_leader_index = self.current_leader_index;
        self.current_speaker_index = self.current_leader_index;
        self.discussion_turns_taken = 0;
        self.discussion_seconds_left = self.rules.discussion_turn_secs;
        self.team_selection_seconds_left = self.rules.team_selection_secs;
        self.speaker_has_nominated = false;
    }

    fn enter_voting(&mut self) {
        self.phase = GamePhase::Voting;
        self.leader_votes.clear();
        for player in &mut self.players {
            player.has_voted_for_leader = false;
        }
    }

    fn enter_team_selection(&mut self) {
        self.phase = GamePhase::MissionTeamSelection;
        self.mission_team.clear();
        self.team_selection_seconds_left = self.rules.team_selection_secs;
    }

    /// Installs a leader and opens the leader's discussion round.
    fn elect(&mut self, seat: usize) {
        self.set_leader(seat);
        self.clear_tie();
        self.chat_log.announce(format!(
            "{} leads mission {}",
            self.players[seat].name, self.current_mission_index
        ));

        self.phase = GamePhase::LeaderDiscussion;
        self.current_speaker_index = seat;
        self.discussion_turns_taken = 0;
        self.discussion_seconds_left = self.rules.discussion_turn_secs;
    }

    fn set_leader(&mut self, seat: usize) {
        for (i, player) in self.players.iter_mut().enumerate() {
            player.is_leader = i == seat;
        }
        self.current_leader_index = seat;
    }

    fn clear_tie(&mut self) {
        self.tie_candidates.clear();
        self.is_second_tie_round = false;
        self.tie_break_seconds_left = 0;
    }

    fn ballot_candidates(&self) -> &BTreeSet<String> {
        if self.tie_candidates.is_empty() {
            &self.nominated_candidates
        } else {
            &self.tie_candidates
        }
    }

    fn tally_leader_votes(&mut self) {
        let outcome = tally::resolve(&LeaderBallot {
            votes: &self.leader_votes,
            roster: &self.players,
            starting_leader: &self.players[self.starting_leader_index],
            is_second_tie_round: self.is_second_tie_round,
        });

        match outcome {
            TallyOutcome::Elected(name) => {
                let seat = self
                    .seat_by_name(&name)
                    .unwrap_or(self.starting_leader_index);
                self.elect(seat);
            }
            TallyOutcome::Tie(tied) => {
                self.tie_break_seconds_left = self.rules.tie_discussion_secs(tied.len());
                self.tie_candidates = tied.into_iter().collect();
                self.is_second_tie_round = true;
                self.phase = GamePhase::TieDiscussion;
            }
        }
    }

    fn scoreboard(&self) -> Scoreboard {
        Scoreboard {
            mission_index: self.current_mission_index,
            player_count: self.players.len(),
            successful_missions: self.successful_missions,
            failed_missions: self.failed_missions,
        }
    }

    fn record_mission(&mut self, resolution: MissionResolution) {
        let MissionResolution {
            outcome,
            successful_missions,
            failed_missions,
            winner,
        } = resolution;

        info!(
            "room {}: mission {} {} ({} success / {} fail)",
            self.room_id,
            outcome.mission_index,
            if outcome.success { "succeeded" } else { "failed" },
            outcome.success_count,
            outcome.fail_count
        );
        self.chat_log.announce(format!(
            "Mission {} {}",
            outcome.mission_index,
            if outcome.success { "succeeded" } else { "failed" }
        ));

        self.mission_outcomes.push(outcome);
        self.successful_missions = successful_missions;
        self.failed_missions = failed_missions;
        self.phase = GamePhase::MissionResults;

        if let Some(faction) = winner {
            self.is_over = true;
            self.winning_faction = Some(faction);
            info!("room {}: game over, {} wins", self.room_id, faction);
            self.chat_log
                .announce(format!("Game over: {} wins", faction));
        }
    }
}
