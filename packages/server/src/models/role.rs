use serde::{Deserialize, Serialize};
use std::fmt;

/// Hidden allegiance of a match player. Also used for the winning side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Resistance,
    Spy,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Resistance => write!(f, "resistance"),
            Role::Spy => write!(f, "spy"),
        }
    }
}

/// Role as rendered to a particular viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisibleRole {
    Resistance,
    Spy,
    Unknown,
}

impl From<Role> for VisibleRole {
    fn from(role: Role) -> Self {
        match role {
            Role::Resistance => VisibleRole::Resistance,
            Role::Spy => VisibleRole::Spy,
        }
    }
}
