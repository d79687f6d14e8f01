use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateError {
    #[error("XP {0} is out of range [{min}, {max}]", min = Xp::MIN, max = Xp::MAX)]
    XpOutOfRange(i64),
    #[error("invalid udemae rank: {0}")]
    InvalidUdemaeRank(String),
    #[error("cannot compare XP with Udemae")]
    CrossTagComparison,
}

/// Numeric skill rating used by X matches. Stored as fixed-point
/// hundredths to keep `Eq`/`Hash` exact while OCR sources produce
/// integer/decimal text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Xp(i64);

impl Xp {
    pub const MIN: f64 = 500.0;
    pub const MAX: f64 = 5500.0;

    pub fn new(xp: f64) -> Result<Self, RateError> {
        if !(Self::MIN..=Self::MAX).contains(&xp) {
            return Err(RateError::XpOutOfRange((xp * 100.0).round() as i64));
        }
        Ok(Xp((xp * 100.0).round() as i64))
    }

    pub fn value(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl std::fmt::Display for Xp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Ordinal skill rating used by anarchy matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Udemae {
    CMinus,
    C,
    CPlus,
    BMinus,
    B,
    BPlus,
    AMinus,
    A,
    APlus,
    S,
    SPlus,
}

impl Udemae {
    pub fn label(&self) -> &'static str {
        match self {
            Udemae::CMinus => "C-",
            Udemae::C => "C",
            Udemae::CPlus => "C+",
            Udemae::BMinus => "B-",
            Udemae::B => "B",
            Udemae::BPlus => "B+",
            Udemae::AMinus => "A-",
            Udemae::A => "A",
            Udemae::APlus => "A+",
            Udemae::S => "S",
            Udemae::SPlus => "S+",
        }
    }

    pub fn from_label(label: &str) -> Result<Self, RateError> {
        Self::ALL
            .into_iter()
            .find(|r| r.label() == label)
            .ok_or_else(|| RateError::InvalidUdemaeRank(label.to_string()))
    }

    pub const ALL: [Udemae; 11] = [
        Udemae::CMinus,
        Udemae::C,
        Udemae::CPlus,
        Udemae::BMinus,
        Udemae::B,
        Udemae::BPlus,
        Udemae::AMinus,
        Udemae::A,
        Udemae::APlus,
        Udemae::S,
        Udemae::SPlus,
    ];
}

impl std::fmt::Display for Udemae {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Tagged rating: `XP` for X matches, `Udemae` for anarchy matches. Ordering
/// is total within a tag and undefined across tags — `compare` returns an
/// error rather than an arbitrary ordering when tags differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Rate {
    #[serde(rename = "XP")]
    Xp(Xp),
    Udemae(Udemae),
}

impl Rate {
    pub fn compare(&self, other: &Rate) -> Result<std::cmp::Ordering, RateError> {
        match (self, other) {
            (Rate::Xp(a), Rate::Xp(b)) => Ok(a.cmp(b)),
            (Rate::Udemae(a), Rate::Udemae(b)) => Ok(a.cmp(b)),
            _ => Err(RateError::CrossTagComparison),
        }
    }

    /// Whether `new` should replace `old`, per the state-machine's "update
    /// only if the tag changed or the value changed" rule (§9 open
    /// question). A tag change is always treated as an update.
    pub fn should_update(old: Option<&Rate>, new: &Rate) -> bool {
        match old {
            None => true,
            Some(old) => std::mem::discriminant(old) != std::mem::discriminant(new) || old != new,
        }
    }
}

impl std::fmt::Display for Rate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rate::Xp(xp) => write!(f, "{xp}"),
            Rate::Udemae(u) => write!(f, "{u}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xp_out_of_range_rejected() {
        assert!(Xp::new(100.0).is_err());
        assert!(Xp::new(6000.0).is_err());
        assert!(Xp::new(2100.0).is_ok());
    }

    #[test]
    fn udemae_ordering_is_total() {
        assert!(Udemae::C < Udemae::S);
        assert!(Udemae::SPlus > Udemae::APlus);
    }

    #[test]
    fn cross_tag_compare_is_an_error() {
        let xp = Rate::Xp(Xp::new(2000.0).unwrap());
        let ud = Rate::Udemae(Udemae::A);
        assert_eq!(xp.compare(&ud), Err(RateError::CrossTagComparison));
    }

    #[test]
    fn should_update_on_tag_change_even_if_equal_display() {
        let old = Rate::Udemae(Udemae::A);
        let new = Rate::Xp(Xp::new(2000.0).unwrap());
        assert!(Rate::should_update(Some(&old), &new));
    }

    #[test]
    fn should_not_update_on_identical_value() {
        let old = Rate::Xp(Xp::new(2000.0).unwrap());
        let new = Rate::Xp(Xp::new(2000.0).unwrap());
        assert!(!Rate::should_update(Some(&old), &new));
    }

    #[test]
    fn serializes_as_tagged_object() {
        let rate = Rate::Xp(Xp::new(2100.0).unwrap());
        let json = serde_json::to_value(&rate).unwrap();
        assert_eq!(json["type"], "XP");
    }
}
