use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AgentError;

/// Driving commands the agent can issue.
///
/// Declaration order is the canonical order: it indexes Q-table rows, breaks
/// ties in [`QTable::best_action`](crate::agent::QTable::best_action) and is
/// written into every saved model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Accelerate,
    Brake,
    Left,
    Right,
    AccelerateLeft,
    AccelerateRight,
    Nothing,
}

impl Action {
    pub const COUNT: usize = 7;

    pub const ALL: [Action; Action::COUNT] = [
        Action::Accelerate,
        Action::Brake,
        Action::Left,
        Action::Right,
        Action::AccelerateLeft,
        Action::AccelerateRight,
        Action::Nothing,
    ];

    /// Position in [`Action::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn tag(self) -> &'static str {
        match self {
            Action::Accelerate => "accelerate",
            Action::Brake => "brake",
            Action::Left => "left",
            Action::Right => "right",
            Action::AccelerateLeft => "accelerate_left",
            Action::AccelerateRight => "accelerate_right",
            Action::Nothing => "nothing",
        }
    }

    pub fn accelerates(self) -> bool {
        matches!(
            self,
            Action::Accelerate | Action::AccelerateLeft | Action::AccelerateRight
        )
    }

    pub fn steers_left(self) -> bool {
        matches!(self, Action::Left | Action::AccelerateLeft)
    }

    pub fn steers_right(self) -> bool {
        matches!(self, Action::Right | Action::AccelerateRight)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Action {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.tag() == s)
            .ok_or_else(|| AgentError::InvalidAction(s.to_string()))
    }
}
