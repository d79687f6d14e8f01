use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Match, Rule, Stage};

#[derive(Debug, Error)]
pub enum ResultError {
    #[error("field {field} value {value} out of range [0, 99]")]
    OutOfRange { field: &'static str, value: i32 },
}

/// Result-screen metadata for a battle session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    #[serde(rename = "match")]
    pub match_: Match,
    pub rule: Rule,
    pub stage: Stage,
    pub kill: u8,
    pub death: u8,
    pub special: u8,
}

impl BattleResult {
    pub fn new(
        match_: Match,
        rule: Rule,
        stage: Stage,
        kill: i32,
        death: i32,
        special: i32,
    ) -> Result<Self, ResultError> {
        let check = |field, v: i32| {
            if !(0..=99).contains(&v) {
                Err(ResultError::OutOfRange { field, value: v })
            } else {
                Ok(v as u8)
            }
        };
        Ok(Self {
            match_,
            rule,
            stage,
            kill: check("kill", kill)?,
            death: check("death", death)?,
            special: check("special", special)?,
        })
    }
}

/// Result-screen metadata for a Salmon Run session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalmonResult {
    pub hazard: i32,
    pub stage: Stage,
    pub golden_egg: i32,
    pub power_egg: i32,
    pub rescue: i32,
    pub rescued: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GameResult {
    Battle(BattleResult),
    Salmon(SalmonResult),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_kill() {
        assert!(BattleResult::new(Match::X, Rule::Rainmaker, Stage::ScorchGorge, 100, 0, 0).is_err());
    }

    #[test]
    fn accepts_boundary_values() {
        assert!(BattleResult::new(Match::X, Rule::Rainmaker, Stage::ScorchGorge, 99, 0, 99).is_ok());
    }
}
