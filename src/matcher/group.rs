use crate::domain::{Frame, ScreenKey};

use super::error::Result;
use super::registry::MatcherRegistry;

/// An ordered set of candidate keys tested in turn; the first whose matcher
/// (or expression) passes wins (§4.1). Used where a screen is "exactly one
/// of several known states", e.g. selecting which stage icon is showing.
#[derive(Debug, Clone)]
pub struct MatcherGroup {
    pub name: String,
    pub members: Vec<ScreenKey>,
}

impl MatcherGroup {
    pub fn new(name: impl Into<String>, members: Vec<ScreenKey>) -> Self {
        Self { name: name.into(), members }
    }

    pub fn matched_name(&self, registry: &MatcherRegistry, frame: &Frame) -> Result<Option<ScreenKey>> {
        for key in &self.members {
            if registry.is_match(key, frame)? {
                return Ok(Some(key.clone()));
            }
        }
        Ok(None)
    }
}
