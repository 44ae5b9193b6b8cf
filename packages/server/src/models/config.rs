use std::env;

/// Fixed rule tables and phase timers. Everything is keyed by roster size;
/// only the timers can be overridden from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRules {
    pub discussion_turn_secs: u32,
    pub team_selection_secs: u32,
    // tie discussion lasts this many seconds per tied candidate
    pub tie_secs_per_candidate: u32,
    pub min_players: usize,
    pub max_players: usize,
    // 1-based mission index that needs two fail ballots on larger tables
    pub two_fail_mission: usize,
    pub two_fail_min_players: usize,
}

pub const MISSION_COUNT: usize = 5;
pub const MISSIONS_TO_WIN: u8 = 3;

impl Default for GameRules {
    fn default() -> Self {
        Self {
            discussion_turn_secs: 40,
            team_selection_secs: 80,
            tie_secs_per_candidate: 30,
            min_players: 5,
            max_players: 9,
            two_fail_mission: 4,
            two_fail_min_players: 7,
        }
    }
}

impl GameRules {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let secs = |key: &str, fallback: u32| {
            env::var(key)
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|v| *v > 0)
                .unwrap_or(fallback)
        };

        Self {
            discussion_turn_secs: secs("RESISTANCE_DISCUSSION_SECS", defaults.discussion_turn_secs),
            team_selection_secs: secs(
                "RESISTANCE_TEAM_SELECTION_SECS",
                defaults.team_selection_secs,
            ),
            tie_secs_per_candidate: secs(
                "RESISTANCE_TIE_SECS_PER_CANDIDATE",
                defaults.tie_secs_per_candidate,
            ),
            ..defaults
        }
    }

    pub fn roster_size_allowed(&self, n: usize) -> bool {
        (self.min_players..=self.max_players).contains(&n)
    }

    pub fn spy_count(&self, n: usize) -> usize {
        match n {
            7..=9 => 3,
            _ => 2,
        }
    }

    /// Team size per mission. Unknown roster sizes use the 5-player table.
    pub fn mission_team_sizes(&self, n: usize) -> [usize; MISSION_COUNT] {
        match n {
            6 => [2, 3, 4, 3, 4],
            7 => [2, 3, 4, 3, 4],
            8 => [3, 4, 5, 4, 5],
            9 => [3, 4, 4, 5, 5],
            _ => [2, 3, 2, 3, 3],
        }
    }

    pub fn required_fails(&self, mission_index: usize, n: usize) -> usize {
        if mission_index == self.two_fail_mission && n >= self.two_fail_min_players {
            2
        } else {
            1
        }
    }

    pub fn tie_discussion_secs(&self, tied_candidates: usize) -> u32 {
        self.tie_secs_per_candidate
            .saturating_mul(u32::try_from(tied_candidates).unwrap_or(u32::MAX))
    }
}
