use serde::{Deserialize, Serialize};

/// Sentinel prediction for a slot whose weapon could not be matched with
/// confidence.
pub const UNMATCHED_SENTINEL: &str = "不明";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Ally,
    Enemy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId {
    pub team: Team,
    /// 1-indexed position within the team, 1..=4.
    pub index: u8,
}

impl SlotId {
    pub const ALL: [SlotId; 8] = [
        SlotId { team: Team::Ally, index: 1 },
        SlotId { team: Team::Ally, index: 2 },
        SlotId { team: Team::Ally, index: 3 },
        SlotId { team: Team::Ally, index: 4 },
        SlotId { team: Team::Enemy, index: 1 },
        SlotId { team: Team::Enemy, index: 2 },
        SlotId { team: Team::Enemy, index: 3 },
        SlotId { team: Team::Enemy, index: 4 },
    ];
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let team = match self.team {
            Team::Ally => "ally",
            Team::Enemy => "enemy",
        };
        write!(f, "{team}_{}", self.index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponCandidate {
    pub weapon: String,
    pub score: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSlotResult {
    pub slot_id: SlotId,
    pub predicted_weapon: String,
    pub is_unmatched: bool,
    /// Up to 3 candidates, ranked by score descending, kept for debugging.
    pub top_candidates: Vec<WeaponCandidate>,
}

impl WeaponSlotResult {
    pub fn unmatched(slot_id: SlotId) -> Self {
        Self {
            slot_id,
            predicted_weapon: UNMATCHED_SENTINEL.to_string(),
            is_unmatched: true,
            top_candidates: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeaponRecognitionResult {
    pub allies: [Option<String>; 4],
    pub enemies: [Option<String>; 4],
    pub slot_results: Vec<WeaponSlotResult>,
    pub unmatched_output_dir: Option<std::path::PathBuf>,
}
