//! Core data model shared by every component (§3): the types here carry no
//! behavior beyond what the spec calls out as a "specified property" (e.g.
//! `Match::is_anarchy`); orchestration lives in the owning component modules.

mod asset;
mod frame;
mod game_mode;
mod judgement;
mod match_type;
mod metadata;
mod rate;
mod result;
mod rule;
mod stage;
mod weapon_result;

pub use asset::VideoAsset;
pub use frame::{Frame, Roi};
pub use game_mode::GameMode;
pub use judgement::Judgement;
pub use match_type::Match;
pub use metadata::RecordingMetadata;
pub use rate::{Rate, RateError, Udemae, Xp};
pub use result::{BattleResult, GameResult, ResultError, SalmonResult};
pub use rule::Rule;
pub use stage::Stage;
pub use weapon_result::{
    SlotId, Team, WeaponCandidate, WeaponRecognitionResult, WeaponSlotResult, UNMATCHED_SENTINEL,
};

/// Opaque identifier naming a matcher or composite matcher in a loaded
/// `MatcherRegistry`. Globally unique within a configuration (§3).
pub type ScreenKey = String;
