use serde::{Deserialize, Serialize};

/// Which ruleset family the current session belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Battle,
    Salmon,
}

impl GameMode {
    pub const ALL: [GameMode; 2] = [GameMode::Battle, GameMode::Salmon];
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GameMode::Battle => write!(f, "battle"),
            GameMode::Salmon => write!(f, "salmon"),
        }
    }
}
