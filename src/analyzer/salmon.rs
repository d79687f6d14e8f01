use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{BattleResult, Frame, Judgement, Match, Rate};
use crate::matcher::MatcherRegistry;

use super::AnalyzerPlugin;

/// Per-mode frame analyzer for `GameMode::Salmon`.
///
/// The Salmon Run screen layout and result fields are not modeled yet; every
/// method here returns `None`/`false` rather than guessing at ROIs that were
/// never calibrated. This mirrors the battle plugin's capability set so the
/// dispatcher (`FrameAnalyzer`) can route to either uniformly.
pub struct SalmonAnalyzer {
    #[allow(dead_code)]
    registry: Arc<MatcherRegistry>,
}

impl SalmonAnalyzer {
    pub fn new(registry: Arc<MatcherRegistry>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl AnalyzerPlugin for SalmonAnalyzer {
    async fn extract_match_select(&self, _frame: &Frame) -> Option<Match> {
        None
    }

    async fn extract_rate(&self, _frame: &Frame, _matched: Match) -> Option<Rate> {
        None
    }

    async fn detect_session_start(&self, _frame: &Frame) -> bool {
        false
    }

    async fn detect_session_abort(&self, _frame: &Frame) -> bool {
        false
    }

    async fn detect_session_finish(&self, _frame: &Frame) -> bool {
        false
    }

    async fn detect_session_judgement(&self, _frame: &Frame) -> bool {
        false
    }

    async fn extract_session_judgement(&self, _frame: &Frame) -> Option<Judgement> {
        None
    }

    /// Salmon Run has its own result schema (`SalmonResult`, §3), distinct
    /// from `BattleResult`; until that extraction is built this always
    /// returns `None` rather than fabricating a battle-shaped result.
    async fn extract_session_result(&self, _frame: &Frame) -> Option<BattleResult> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::MatcherRegistry;

    fn empty_registry() -> Arc<MatcherRegistry> {
        Arc::new(MatcherRegistry::builder().build().unwrap())
    }

    #[tokio::test]
    async fn session_detectors_are_unimplemented() {
        let analyzer = SalmonAnalyzer::new(empty_registry());
        let frame = Frame::new(2, 2, vec![0u8; 12]);
        assert!(!analyzer.detect_session_start(&frame).await);
        assert!(analyzer.extract_session_result(&frame).await.is_none());
    }
}
