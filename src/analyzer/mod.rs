//! Per-mode frame analyzer (§4.2): a common capability set implemented once
//! per `GameMode`, plus a dispatcher that routes mode-agnostic detections to
//! the shared `MatcherRegistry` and mode-specific detections to the plugin
//! keyed by the session's current mode.

pub mod battle;
pub mod error;
pub mod kd_ocr;
pub mod salmon;

use std::sync::Arc;

use async_trait::async_trait;

pub use battle::{BattleAnalyzer, BattleRois};
pub use error::{AnalyzerError, Result};
pub use salmon::SalmonAnalyzer;

use crate::domain::{BattleResult, Frame, GameMode, Judgement, Match, Rate};

/// Capability set every `GameMode` plugin implements (§4.2). Every method is
/// infallible at the call site: a parse or inference failure surfaces as
/// `None`/`false`, never a propagated error.
#[async_trait]
pub trait AnalyzerPlugin: Send + Sync {
    async fn extract_match_select(&self, frame: &Frame) -> Option<Match>;
    async fn extract_rate(&self, frame: &Frame, matched: Match) -> Option<Rate>;
    async fn detect_session_start(&self, frame: &Frame) -> bool;
    async fn detect_session_abort(&self, frame: &Frame) -> bool;
    async fn detect_session_finish(&self, frame: &Frame) -> bool;
    async fn detect_session_judgement(&self, frame: &Frame) -> bool;
    async fn extract_session_judgement(&self, frame: &Frame) -> Option<Judgement>;
    async fn extract_session_result(&self, frame: &Frame) -> Option<BattleResult>;
}

/// Routes per-frame analysis to the plugin for the currently active
/// `GameMode`. Holds one plugin instance per mode, built once at startup
/// from the shared `MatcherRegistry`.
pub struct FrameAnalyzer {
    battle: BattleAnalyzer,
    salmon: SalmonAnalyzer,
}

impl FrameAnalyzer {
    pub fn new(battle: BattleAnalyzer, salmon: SalmonAnalyzer) -> Self {
        Self { battle, salmon }
    }

    fn plugin(&self, mode: GameMode) -> &dyn AnalyzerPlugin {
        match mode {
            GameMode::Battle => &self.battle,
            GameMode::Salmon => &self.salmon,
        }
    }

    pub async fn extract_match_select(&self, mode: GameMode, frame: &Frame) -> Option<Match> {
        self.plugin(mode).extract_match_select(frame).await
    }

    pub async fn extract_rate(&self, mode: GameMode, frame: &Frame, matched: Match) -> Option<Rate> {
        self.plugin(mode).extract_rate(frame, matched).await
    }

    pub async fn detect_session_start(&self, mode: GameMode, frame: &Frame) -> bool {
        self.plugin(mode).detect_session_start(frame).await
    }

    pub async fn detect_session_abort(&self, mode: GameMode, frame: &Frame) -> bool {
        self.plugin(mode).detect_session_abort(frame).await
    }

    pub async fn detect_session_finish(&self, mode: GameMode, frame: &Frame) -> bool {
        self.plugin(mode).detect_session_finish(frame).await
    }

    pub async fn detect_session_judgement(&self, mode: GameMode, frame: &Frame) -> bool {
        self.plugin(mode).detect_session_judgement(frame).await
    }

    pub async fn extract_session_judgement(&self, mode: GameMode, frame: &Frame) -> Option<Judgement> {
        self.plugin(mode).extract_session_judgement(frame).await
    }

    pub async fn extract_session_result(&self, mode: GameMode, frame: &Frame) -> Option<BattleResult> {
        self.plugin(mode).extract_session_result(frame).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::MockOcrEngine;
    use crate::matcher::MatcherRegistry;

    fn rois() -> BattleRois {
        let zero = crate::domain::Roi { x: 0, y: 0, width: 1, height: 1 };
        BattleRois {
            xp: zero,
            kill: zero,
            death: zero,
            special: zero,
            kill_trikolor: zero,
            death_trikolor: zero,
            special_trikolor: zero,
        }
    }

    #[tokio::test]
    async fn dispatcher_routes_by_mode() {
        let registry = Arc::new(MatcherRegistry::builder().build().unwrap());
        let ocr = Arc::new(MockOcrEngine::never());
        let battle = BattleAnalyzer::new(registry.clone(), ocr, rois());
        let salmon = SalmonAnalyzer::new(registry);
        let analyzer = FrameAnalyzer::new(battle, salmon);

        let frame = Frame::new(2, 2, vec![0u8; 12]);
        assert!(!analyzer.detect_session_start(GameMode::Battle, &frame).await);
        assert!(!analyzer.detect_session_start(GameMode::Salmon, &frame).await);
        assert!(analyzer.extract_session_result(GameMode::Salmon, &frame).await.is_none());
    }
}
