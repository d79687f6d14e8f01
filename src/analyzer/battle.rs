use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{BattleResult, Frame, Judgement, Match, Rate, Roi, Rule, Stage, Udemae};
use crate::external::{OcrEngine, PageSegMode};
use crate::matcher::MatcherRegistry;

use super::kd_ocr;
use super::AnalyzerPlugin;

/// Fixed pixel ROIs the battle plugin reads from a 1920x1080 frame. Values
/// are placeholders for the real calibration data (config, C10); the shapes
/// and order follow the original implementation's battle analyzer.
#[derive(Debug, Clone)]
pub struct BattleRois {
    pub xp: Roi,
    pub kill: Roi,
    pub death: Roi,
    pub special: Roi,
    pub kill_trikolor: Roi,
    pub death_trikolor: Roi,
    pub special_trikolor: Roi,
}

/// Frame-fingerprint-keyed cache so repeated calls against a frozen frame
/// don't re-run OCR (§4.2).
struct FingerprintCache<T> {
    entries: Mutex<HashMap<u32, T>>,
}

impl<T: Clone> FingerprintCache<T> {
    fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

/// Per-mode frame analyzer for `GameMode::Battle` (§4.2).
pub struct BattleAnalyzer {
    registry: Arc<MatcherRegistry>,
    ocr: Arc<dyn OcrEngine>,
    rois: BattleRois,
    rate_cache: FingerprintCache<Rate>,
    result_cache: FingerprintCache<BattleResult>,
}

impl BattleAnalyzer {
    pub fn new(registry: Arc<MatcherRegistry>, ocr: Arc<dyn OcrEngine>, rois: BattleRois) -> Self {
        Self {
            registry,
            ocr,
            rois,
            rate_cache: FingerprintCache::new(),
            result_cache: FingerprintCache::new(),
        }
    }

    async fn extract_udemae(&self, frame: &Frame) -> Option<Udemae> {
        let name = self.registry.matched_name("udemae_select", frame).ok()??;
        Udemae::from_label(&name)
    }

    async fn extract_xp(&self, frame: &Frame) -> Option<crate::domain::Xp> {
        let cropped = frame.crop(self.rois.xp);
        let gray = cropped.to_gray_image();
        let rotated = imageproc::geometric_transformations::rotate_about_center(
            &gray,
            -4.0f32.to_radians(),
            imageproc::geometric_transformations::Interpolation::Bilinear,
            image::Luma([0]),
        );
        let upscaled = image::imageops::resize(
            &rotated,
            rotated.width() * 2,
            rotated.height() * 2,
            image::imageops::FilterType::Triangle,
        );
        let level = imageproc::contrast::otsu_level(&upscaled);
        let mut binary = image::GrayImage::from_fn(upscaled.width(), upscaled.height(), |x, y| {
            image::Luma([if upscaled.get_pixel(x, y).0[0] >= level { 255 } else { 0 }])
        });
        for px in binary.pixels_mut() {
            px.0[0] = 255 - px.0[0];
        }
        let text = self
            .ocr
            .recognize_text(&binary, Some(PageSegMode::SingleLine), Some("0123456789."))
            .await?;
        let value: f64 = text.trim().parse().ok()?;
        crate::domain::Xp::new(value).ok()
    }

    async fn extract_battle_match(&self, frame: &Frame) -> Option<Match> {
        let name = self.registry.matched_name("result_match", frame).ok()??;
        Match::from_value(&name)
    }

    async fn extract_battle_rule(&self, frame: &Frame) -> Option<Rule> {
        let name = self.registry.matched_name("result_rule", frame).ok()??;
        Rule::from_value(&name)
    }

    async fn extract_battle_stage(&self, frame: &Frame) -> Option<Stage> {
        let name = self.registry.matched_name("result_stage", frame).ok()??;
        Stage::from_value(&name)
    }

    /// K/D/special via the primary ROI set, falling back to the TriColor
    /// secondary set on failure (§4.2).
    async fn extract_kd(&self, frame: &Frame, trikolor: bool) -> Option<(u8, u8, u8)> {
        let (kill, death, special) = if trikolor {
            (self.rois.kill_trikolor, self.rois.death_trikolor, self.rois.special_trikolor)
        } else {
            (self.rois.kill, self.rois.death, self.rois.special)
        };
        kd_ocr::extract_kill_death_special(frame, self.ocr.as_ref(), kill, death, special).await
    }
}

#[async_trait]
impl AnalyzerPlugin for BattleAnalyzer {
    async fn extract_match_select(&self, frame: &Frame) -> Option<Match> {
        let name = self.registry.matched_name("battle_select", frame).ok()??;
        Match::from_value(&name)
    }

    async fn extract_rate(&self, frame: &Frame, matched: Match) -> Option<Rate> {
        let fingerprint = frame.fingerprint();
        if let Some(cached) = self.rate_cache.entries.lock().get(&fingerprint).cloned() {
            return Some(cached);
        }
        let rate = if matched.is_anarchy() {
            self.extract_udemae(frame).await.map(Rate::Udemae)
        } else if matched == Match::X {
            self.extract_xp(frame).await.map(Rate::Xp)
        } else {
            None
        };
        if let Some(rate) = &rate {
            self.rate_cache.entries.lock().insert(fingerprint, rate.clone());
        }
        rate
    }

    async fn detect_session_start(&self, frame: &Frame) -> bool {
        self.registry.is_match("session_start", frame).unwrap_or(false)
    }

    async fn detect_session_abort(&self, frame: &Frame) -> bool {
        self.registry.is_match("session_abort", frame).unwrap_or(false)
    }

    async fn detect_session_finish(&self, frame: &Frame) -> bool {
        self.registry.is_match("session_finish", frame).unwrap_or(false)
    }

    async fn detect_session_judgement(&self, frame: &Frame) -> bool {
        self.registry.is_match("battle_judgements_group", frame).unwrap_or(false)
    }

    async fn extract_session_judgement(&self, frame: &Frame) -> Option<Judgement> {
        let name = self.registry.matched_name("battle_judgements", frame).ok()??;
        match name.as_str() {
            "WIN" => Some(Judgement::Win),
            "LOSE" => Some(Judgement::Lose),
            _ => None,
        }
    }

    async fn extract_session_result(&self, frame: &Frame) -> Option<BattleResult> {
        let fingerprint = frame.fingerprint();
        if let Some(cached) = self.result_cache.entries.lock().get(&fingerprint).cloned() {
            return Some(cached);
        }

        let (match_res, rule_res, stage_res, kd_res) = tokio::join!(
            self.extract_battle_match(frame),
            self.extract_battle_rule(frame),
            self.extract_battle_stage(frame),
            self.extract_kd(frame, false),
        );

        let (matched, rule, stage, (kill, death, special)) =
            (match_res?, rule_res?, stage_res?, kd_res.or(self.extract_kd(frame, true).await)?);

        let result =
            BattleResult::new(matched, rule, stage, kill as i32, death as i32, special as i32).ok()?;
        self.result_cache.entries.lock().insert(fingerprint, result.clone());
        Some(result)
    }
}
