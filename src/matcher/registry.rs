use std::collections::HashMap;

use crate::domain::{Frame, ScreenKey};

use super::basic::Matcher;
use super::error::{MatcherError, Result};
use super::expression::MatchExpression;
use super::group::MatcherGroup;

/// Immutable, thread-safe set of leaf matchers, boolean expressions over
/// them, and named groups, loaded once at startup from configuration (§4.1).
/// Cheaply shared via `Arc` across the analyzer and weapon-recognition tasks.
pub struct MatcherRegistry {
    leaves: HashMap<ScreenKey, Box<dyn Matcher>>,
    expressions: HashMap<ScreenKey, MatchExpression>,
    groups: HashMap<String, MatcherGroup>,
}

impl MatcherRegistry {
    pub fn builder() -> MatcherRegistryBuilder {
        MatcherRegistryBuilder::default()
    }

    pub fn from_parts(
        leaves: HashMap<ScreenKey, Box<dyn Matcher>>,
        groups: HashMap<String, MatcherGroup>,
    ) -> Self {
        Self { leaves, expressions: HashMap::new(), groups }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.leaves.contains_key(key) || self.expressions.contains_key(key)
    }

    pub fn is_match(&self, key: &str, frame: &Frame) -> Result<bool> {
        if let Some(matcher) = self.leaves.get(key) {
            return Ok(matcher.is_match(frame));
        }
        if let Some(expr) = self.expressions.get(key) {
            return expr.eval(self, frame);
        }
        Err(MatcherError::UnknownKey(key.to_string()))
    }

    pub fn group(&self, name: &str) -> Result<&MatcherGroup> {
        self.groups.get(name).ok_or_else(|| MatcherError::UnknownGroup(name.to_string()))
    }

    pub fn matched_name(&self, group: &str, frame: &Frame) -> Result<Option<ScreenKey>> {
        self.group(group)?.matched_name(self, frame)
    }
}

/// Accumulates leaves, expressions, and groups while validating that every
/// key is unique and every expression resolves, then freezes into a
/// `MatcherRegistry` (§4.1 "fails fast on dangling references").
#[derive(Default)]
pub struct MatcherRegistryBuilder {
    leaves: HashMap<ScreenKey, Box<dyn Matcher>>,
    expressions: HashMap<ScreenKey, MatchExpression>,
    groups: HashMap<String, MatcherGroup>,
}

impl MatcherRegistryBuilder {
    pub fn leaf(mut self, key: impl Into<String>, matcher: Box<dyn Matcher>) -> Result<Self> {
        let key = key.into();
        if self.leaves.contains_key(&key) || self.expressions.contains_key(&key) {
            return Err(MatcherError::DuplicateKey(key));
        }
        self.leaves.insert(key, matcher);
        Ok(self)
    }

    pub fn expression(mut self, key: impl Into<String>, expr: MatchExpression) -> Result<Self> {
        let key = key.into();
        if self.leaves.contains_key(&key) || self.expressions.contains_key(&key) {
            return Err(MatcherError::DuplicateKey(key));
        }
        self.expressions.insert(key, expr);
        Ok(self)
    }

    pub fn group(mut self, group: MatcherGroup) -> Self {
        self.groups.insert(group.name.clone(), group);
        self
    }

    pub fn build(self) -> Result<MatcherRegistry> {
        let registry = MatcherRegistry {
            leaves: self.leaves,
            expressions: self.expressions,
            groups: self.groups,
        };
        for expr in registry.expressions.values() {
            expr.validate(&registry)?;
        }
        for group in registry.groups.values() {
            for key in &group.members {
                if !registry.contains(key) {
                    return Err(MatcherError::UnknownLeaf(key.clone()));
                }
            }
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::basic::HashMatcher;

    #[test]
    fn builder_rejects_duplicate_keys() {
        let builder = MatcherRegistry::builder()
            .leaf("a", Box::new(HashMatcher { roi: None, reference_digest: 1 }))
            .unwrap();
        let result = builder.leaf("a", Box::new(HashMatcher { roi: None, reference_digest: 2 }));
        assert!(result.is_err());
    }

    #[test]
    fn build_fails_on_group_referencing_unknown_key() {
        let registry = MatcherRegistry::builder()
            .leaf("a", Box::new(HashMatcher { roi: None, reference_digest: 1 }))
            .unwrap()
            .group(MatcherGroup::new("g", vec!["a".into(), "missing".into()]))
            .build();
        assert!(registry.is_err());
    }

    #[test]
    fn matched_name_returns_first_passing_member() {
        let frame = Frame::new(2, 2, vec![0u8; 12]);
        let digest = HashMatcher::digest(frame.data());
        let registry = MatcherRegistry::builder()
            .leaf("no_match", Box::new(HashMatcher { roi: None, reference_digest: 999 }))
            .unwrap()
            .leaf("yes_match", Box::new(HashMatcher { roi: None, reference_digest: digest }))
            .unwrap()
            .group(MatcherGroup::new("g", vec!["no_match".into(), "yes_match".into()]))
            .build()
            .unwrap();
        assert_eq!(registry.matched_name("g", &frame).unwrap(), Some("yes_match".to_string()));
    }
}
