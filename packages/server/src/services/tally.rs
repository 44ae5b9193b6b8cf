use std::collections::HashMap;

use crate::models::player::Player;

/// Result of counting one leader-election ballot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyOutcome {
    Elected(String),
    // tied candidate names, in roster order
    Tie(Vec<String>),
}

/// A completed leader-election ballot.
pub struct LeaderBallot<'a> {
    /// voter id -> candidate name
    pub votes: &'a HashMap<String, String>,
    /// Match roster in seat order; decides "first" among tied candidates.
    pub roster: &'a [Player],
    /// Leader the current mission round started with.
    pub starting_leader: &'a Player,
    /// Set once a tie has already gone through a tie discussion.
    pub is_second_tie_round: bool,
}

/// Counts the ballot and picks a leader, or reports a tie that still needs
/// a dedicated discussion. A tie after a tie discussion is always forced to
/// a single winner: the starting leader's own pick if it is among the tied
/// names, otherwise the tied candidate seated first.
pub fn resolve(ballot: &LeaderBallot<'_>) -> TallyOutcome {
    if ballot.votes.is_empty() {
        return TallyOutcome::Elected(ballot.starting_leader.name.clone());
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for candidate in ballot.votes.values() {
        *counts.entry(candidate.as_str()).or_insert(0) += 1;
    }
    let max = counts.values().copied().max().unwrap_or(0);

    let mut winners: Vec<&str> = counts
        .iter()
        .filter(|(_, count)| **count == max)
        .map(|(name, _)| *name)
        .collect();
    winners.sort_by_key(|name| seat_of(ballot.roster, name));

    match winners.as_slice() {
        [single] => TallyOutcome::Elected((*single).to_string()),
        _ if !ballot.is_second_tie_round => {
            TallyOutcome::Tie(winners.iter().map(|w| w.to_string()).collect())
        }
        _ => {
            let leader_pick = ballot
                .votes
                .get(&ballot.starting_leader.id)
                .map(String::as_str)
                .filter(|pick| winners.contains(pick));
            let chosen = leader_pick.unwrap_or(winners[0]);
            TallyOutcome::Elected(chosen.to_string())
        }
    }
}

// names not on the roster sort last, alphabetically
fn seat_of<'a>(roster: &[Player], name: &'a str) -> (usize, &'a str) {
    let seat = roster
        .iter()
        .position(|p| p.name == name)
        .unwrap_or(usize::MAX);
    (seat, name)
}
