use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{BattleResult, GameMode, GameResult, Judgement, Match, Rate, Rule, SalmonResult, Stage, Udemae, Xp};

/// Per-session metadata, owned by the auto-recorder until handed by value to
/// the asset repository at save time (§3 invariant 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub game_mode: GameMode,
    pub started_at: DateTime<Utc>,
    pub rate: Option<Rate>,
    pub judgement: Option<Judgement>,
    pub result: Option<GameResult>,
    pub allies: Option<[Option<String>; 4]>,
    pub enemies: Option<[Option<String>; 4]>,
}

impl RecordingMetadata {
    pub fn new(game_mode: GameMode, started_at: DateTime<Utc>) -> Self {
        Self {
            game_mode,
            started_at,
            rate: None,
            judgement: None,
            result: None,
            allies: None,
            enemies: None,
        }
    }

    /// Serializes to the exact metadata sidecar object of §6: every value is
    /// a string (or null), fields are flattened regardless of game mode.
    pub fn to_sidecar_json(&self) -> Value {
        let rate = self.rate.as_ref().map(|r| match r {
            Rate::Xp(xp) => xp.value().to_string(),
            Rate::Udemae(u) => u.label().to_string(),
        });
        let judgement = self.judgement.map(|j| j.to_string());

        let mut obj = json!({
            "game_mode": self.game_mode.to_string(),
            "started_at": self.started_at.to_rfc3339(),
            "rate": rate,
            "judgement": judgement,
            "match": Value::Null,
            "rule": Value::Null,
            "stage": Value::Null,
            "kill": Value::Null,
            "death": Value::Null,
            "special": Value::Null,
            "hazard": Value::Null,
            "golden_egg": Value::Null,
            "power_egg": Value::Null,
            "rescue": Value::Null,
            "rescued": Value::Null,
        });

        match &self.result {
            Some(GameResult::Battle(BattleResult { match_, rule, stage, kill, death, special })) => {
                obj["match"] = json!(match_.value());
                obj["rule"] = json!(rule.value());
                obj["stage"] = json!(stage.value());
                obj["kill"] = json!(kill.to_string());
                obj["death"] = json!(death.to_string());
                obj["special"] = json!(special.to_string());
            }
            Some(GameResult::Salmon(SalmonResult { hazard, stage, golden_egg, power_egg, rescue, rescued })) => {
                obj["stage"] = json!(stage.value());
                obj["hazard"] = json!(hazard.to_string());
                obj["golden_egg"] = json!(golden_egg.to_string());
                obj["power_egg"] = json!(power_egg.to_string());
                obj["rescue"] = json!(rescue.to_string());
                obj["rescued"] = json!(rescued.to_string());
            }
            None => {}
        }

        obj
    }

    /// Reconstructs a `RecordingMetadata` from a parsed sidecar JSON object
    /// (the inverse of [`to_sidecar_json`](Self::to_sidecar_json)). Lenient
    /// by design — an individual field that fails to parse is dropped
    /// rather than failing the whole load, since a sidecar is allowed to be
    /// partial or stale (§4.6).
    pub fn from_sidecar_json(value: &Value) -> Option<Self> {
        let game_mode = match value.get("game_mode").and_then(Value::as_str)? {
            "battle" => GameMode::Battle,
            "salmon" => GameMode::Salmon,
            _ => return None,
        };
        let started_at = value
            .get("started_at")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))?;

        let rate = value.get("rate").and_then(Value::as_str).and_then(|s| {
            Xp::new(s.parse().ok()?).map(Rate::Xp).ok().or_else(|| Udemae::from_label(s).map(Rate::Udemae).ok())
        });
        let judgement = match value.get("judgement").and_then(Value::as_str) {
            Some("WIN") => Some(Judgement::Win),
            Some("LOSE") => Some(Judgement::Lose),
            _ => None,
        };

        let str_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);
        let int_field = |key: &str| str_field(key).and_then(|s| s.parse::<i32>().ok());

        let result = match game_mode {
            GameMode::Battle => (|| {
                let match_ = Match::from_value(&str_field("match")?)?;
                let rule = Rule::from_value(&str_field("rule")?)?;
                let stage = Stage::from_value(&str_field("stage")?)?;
                let battle =
                    BattleResult::new(match_, rule, stage, int_field("kill")?, int_field("death")?, int_field("special")?)
                        .ok()?;
                Some(GameResult::Battle(battle))
            })(),
            GameMode::Salmon => (|| {
                let stage = Stage::from_value(&str_field("stage")?)?;
                Some(GameResult::Salmon(SalmonResult {
                    hazard: int_field("hazard")?,
                    stage,
                    golden_egg: int_field("golden_egg")?,
                    power_egg: int_field("power_egg")?,
                    rescue: int_field("rescue")?,
                    rescued: int_field("rescued")?,
                }))
            })(),
        };

        Some(Self { game_mode, started_at, rate, judgement, result, allies: None, enemies: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Match, Rule, Stage, Xp};

    #[test]
    fn sidecar_json_carries_battle_result_fields() {
        let mut meta = RecordingMetadata::new(GameMode::Battle, Utc::now());
        meta.rate = Some(Rate::Xp(Xp::new(2100.0).unwrap()));
        meta.judgement = Some(Judgement::Win);
        meta.result = Some(GameResult::Battle(
            BattleResult::new(Match::X, Rule::Rainmaker, Stage::ScorchGorge, 10, 3, 4).unwrap(),
        ));

        let json = meta.to_sidecar_json();
        assert_eq!(json["game_mode"], "battle");
        assert_eq!(json["judgement"], "WIN");
        assert_eq!(json["kill"], "10");
        assert_eq!(json["stage"], "ユノハナ大渓谷");
    }

    #[test]
    fn sidecar_json_nulls_result_fields_when_absent() {
        let meta = RecordingMetadata::new(GameMode::Salmon, Utc::now());
        let json = meta.to_sidecar_json();
        assert!(json["kill"].is_null());
        assert!(json["rate"].is_null());
    }
}
