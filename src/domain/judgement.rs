use serde::{Deserialize, Serialize};

/// The outcome of a single session, as read off the judgement screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Judgement {
    Win,
    Lose,
}

impl std::fmt::Display for Judgement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Judgement::Win => write!(f, "WIN"),
            Judgement::Lose => write!(f, "LOSE"),
        }
    }
}
