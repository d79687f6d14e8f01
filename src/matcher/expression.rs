use crate::domain::{Frame, ScreenKey};

use super::error::{MatcherError, Result};
use super::registry::MatcherRegistry;

/// Boolean tree over named leaf matchers (§4.1). Evaluation short-circuits:
/// `And` stops at the first `false`, `Or` stops at the first `true`.
#[derive(Debug, Clone)]
pub enum MatchExpression {
    Leaf(ScreenKey),
    Not(Box<MatchExpression>),
    And(Vec<MatchExpression>),
    Or(Vec<MatchExpression>),
}

impl MatchExpression {
    pub fn eval(&self, registry: &MatcherRegistry, frame: &Frame) -> Result<bool> {
        match self {
            MatchExpression::Leaf(key) => registry.is_match(key, frame),
            MatchExpression::Not(inner) => Ok(!inner.eval(registry, frame)?),
            MatchExpression::And(terms) => {
                for term in terms {
                    if !term.eval(registry, frame)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            MatchExpression::Or(terms) => {
                for term in terms {
                    if term.eval(registry, frame)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }

    /// Validates that every leaf names a key present in `registry`, without
    /// evaluating against a frame. Used at load time (§4.1 "fails fast on
    /// dangling references").
    pub fn validate(&self, registry: &MatcherRegistry) -> Result<()> {
        match self {
            MatchExpression::Leaf(key) => {
                if registry.contains(key) {
                    Ok(())
                } else {
                    Err(MatcherError::UnknownLeaf(key.clone()))
                }
            }
            MatchExpression::Not(inner) => inner.validate(registry),
            MatchExpression::And(terms) | MatchExpression::Or(terms) => {
                terms.iter().try_for_each(|t| t.validate(registry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::basic::HashMatcher;
    use std::collections::HashMap;

    fn frame() -> Frame {
        Frame::new(2, 2, vec![0u8; 2 * 2 * 3])
    }

    fn registry_with(key: &str, digest: u64) -> MatcherRegistry {
        let mut matchers: HashMap<ScreenKey, Box<dyn super::super::basic::Matcher>> = HashMap::new();
        matchers.insert(key.to_string(), Box::new(HashMatcher { roi: None, reference_digest: digest }));
        MatcherRegistry::from_parts(matchers, HashMap::new())
    }

    #[test]
    fn not_inverts_leaf() {
        let registry = registry_with("a", 0); // digest 0 never matches a non-empty frame of zeros... adjust
        let expr = MatchExpression::Not(Box::new(MatchExpression::Leaf("a".into())));
        // frame of zeros digests to a specific nonzero FNV value, so leaf "a" (digest 0) is false, Not -> true
        assert!(expr.eval(&registry, &frame()).unwrap());
    }

    #[test]
    fn and_short_circuits_on_unknown_after_false() {
        let registry = registry_with("a", 0);
        let expr = MatchExpression::And(vec![
            MatchExpression::Leaf("a".into()),
            MatchExpression::Leaf("missing".into()),
        ]);
        // "a" is false, so And should short-circuit before touching "missing"
        assert!(!expr.eval(&registry, &frame()).unwrap());
    }

    #[test]
    fn validate_rejects_dangling_leaf() {
        let registry = registry_with("a", 0);
        let expr = MatchExpression::Leaf("missing".into());
        assert!(expr.validate(&registry).is_err());
    }
}
