use std::collections::BTreeMap;

use crate::models::{
    game::Game,
    role::VisibleRole,
    view::{GameView, PlayerView, SpyInfo},
};

/// Renders `game` as `viewer_id` is allowed to see it.
///
/// Other players' roles, spy numbers and mission ballots are masked. A spy
/// viewer additionally gets the other spies through `fellow_spies`; that
/// field is the only place spy identities leave the engine.
pub fn project(game: &Game, viewer_id: &str) -> GameView {
    let viewer = game.player(viewer_id);

    let players: Vec<PlayerView> = game
        .players
        .iter()
        .map(|p| {
            let own = p.id == viewer_id;
            PlayerView {
                id: p.id.clone(),
                name: p.name.clone(),
                role: if own {
                    p.role.into()
                } else {
                    VisibleRole::Unknown
                },
                spy_number: if own { p.spy_number } else { None },
                is_leader: p.is_leader,
                nominated: p.nominated,
                has_voted_for_leader: p.has_voted_for_leader,
                has_voted_for_mission: game.mission_ballots.contains_key(&p.id),
                mission_vote: if own { p.mission_vote } else { None },
                confirmed_role: p.confirmed_role,
            }
        })
        .collect();

    let fellow_spies: Option<Vec<SpyInfo>> = viewer.filter(|v| v.is_spy()).map(|v| {
        game.players
            .iter()
            .filter(|p| p.is_spy() && p.id != v.id)
            .filter_map(|p| {
                p.spy_number.map(|spy_number| SpyInfo {
                    id: p.id.clone(),
                    name: p.name.clone(),
                    spy_number,
                })
            })
            .collect()
    });

    let leader_votes: BTreeMap<String, String> = game
        .leader_votes
        .iter()
        .filter_map(|(voter_id, candidate)| {
            game.player(voter_id)
                .map(|voter| (voter.name.clone(), candidate.clone()))
        })
        .collect();

    GameView {
        room_id: game.room_id.clone(),
        viewer_id: viewer_id.to_string(),
        phase: game.phase,
        players,
        fellow_spies,
        current_mission_index: game.current_mission_index,
        mission_team_sizes: game.mission_team_sizes.to_vec(),
        successful_missions: game.successful_missions,
        failed_missions: game.failed_missions,
        current_leader_index: game.current_leader_index,
        current_speaker_index: game.current_speaker_index,
        discussion_turns_taken: game.discussion_turns_taken,
        discussion_seconds_left: game.discussion_seconds_left,
        team_selection_seconds_left: game.team_selection_seconds_left,
        tie_break_seconds_left: game.tie_break_seconds_left,
        nominated_candidates: game.nominated_candidates.iter().cloned().collect(),
        leader_votes,
        mission_team: game.mission_team.iter().cloned().collect(),
        mission_ballots_cast: game.mission_ballots.len(),
        mission_outcomes: game.mission_outcomes.clone(),
        tie_candidates: game.tie_candidates.iter().cloned().collect(),
        is_second_tie_round: game.is_second_tie_round,
        is_over: game.is_over,
        winning_faction: game.winning_faction,
    }
}
