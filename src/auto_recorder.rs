//! Auto-recorder orchestrator (§4.5): owns the capture loop, the in-flight
//! session's `RecordingMetadata`, and drives C2 (frame analyzer), C3
//! (weapon recognition), C4 (state machine) and C6 (asset repository) off
//! of every captured frame. Grounded on the teacher's `AutoClipManager`
//! task-ownership shape (`Arc<TokioMutex<Option<JoinHandle<()>>>>` +
//! `CancellationToken`) and the original implementation's
//! `application/services/auto_recorder.py`, whose per-state dispatch table
//! this follows almost line for line.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::json;
use tokio::sync::{Mutex as TokioMutex, RwLock as TokioRwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analyzer::FrameAnalyzer;
use crate::bus::EventBus;
use crate::domain::{Frame, GameMode, GameResult, RecordingMetadata};
use crate::external::{CaptureSource, ExternalRecorder, SubtitleCapture};
use crate::matcher::MatcherRegistry;
use crate::state_machine::{RecordEvent, RecordingStateMachine};
use crate::storage::AssetRepository;
use crate::weapon::WeaponRecognitionService;

const SESSION_ABORT_WINDOW: Duration = Duration::from_secs(60);
const SESSION_TIMEOUT: Duration = Duration::from_secs(600);
const POWER_OFF_POLL_INTERVAL: Duration = Duration::from_secs(10);
const POWER_OFF_DEBOUNCE_COUNT: u32 = 6;
const STOP_GRACE_PERIOD: Duration = Duration::from_millis(1500);

/// Gate registry keys the auto-recorder evaluates directly, ahead of
/// knowing which `GameMode` plugin applies (§4.5's "standby" dispatch).
/// Placeholder names pending real calibration data (C10), same caveat as
/// the ROIs in `analyzer::battle`.
mod gate {
    pub const MATCH_SELECT: &str = "match_select";
    pub const GAME_MODE_SELECT: &str = "game_mode_select";
    pub const MATCHING_START: &str = "matching_start";
    pub const SCHEDULE_CHANGE: &str = "schedule_change";
    pub const LOADING: &str = "loading";
    pub const LOADING_END: &str = "loading_end";
    pub const POWER_OFF: &str = "power_off";
}

/// A resume predicate installed by `pause` and consulted every frame while
/// `paused` (§4.4/§4.5); boxed since the condition differs per pause reason
/// (session judgement appearing vs. a loading screen clearing).
type ResumeTrigger = Box<dyn Fn(&Frame) -> bool + Send + Sync>;

struct Session {
    game_mode: Option<GameMode>,
    matching_started_at: Option<chrono::DateTime<Utc>>,
    battle_started_at: Option<Instant>,
    finish: bool,
    metadata: RecordingMetadata,
}

impl Session {
    fn idle() -> Self {
        Self {
            game_mode: None,
            matching_started_at: None,
            battle_started_at: None,
            finish: false,
            metadata: RecordingMetadata::new(GameMode::Battle, Utc::now()),
        }
    }

    /// Resets per-session fields but keeps `game_mode`: a player often
    /// queues again immediately, and the mode rarely changes between
    /// sessions (§4.5 `_reset`).
    fn reset(&mut self) {
        let game_mode = self.game_mode;
        *self = Session::idle();
        self.game_mode = game_mode;
    }
}

/// Owns one capture/analysis/record loop. `execute()` runs it until the
/// console power-off sentinel debounces positive, matching the teacher's
/// `start_event_monitoring`/`stop_event_monitoring` pair in shape (one
/// `tokio::spawn`'d task, torn down via a `CancellationToken`) but modeled
/// here as a single blocking `execute` loop the caller runs on its own task,
/// since unlike clip monitoring there is exactly one frame loop per daemon.
pub struct AutoRecorder {
    recorder: Arc<dyn ExternalRecorder>,
    capture: Arc<TokioMutex<Box<dyn CaptureSource>>>,
    analyzer: Arc<FrameAnalyzer>,
    registry: Arc<MatcherRegistry>,
    weapons: WeaponRecognitionService,
    subtitle: Option<Arc<dyn SubtitleCapture>>,
    repository: Arc<AssetRepository>,
    state_machine: Arc<RecordingStateMachine>,
    event_bus: EventBus,
    session: TokioRwLock<Session>,
    resume_trigger: TokioMutex<Option<ResumeTrigger>>,
    power_off_count: AtomicU32,
    running: AtomicBool,
    cancel_token: CancellationToken,
    run_task: TokioMutex<Option<JoinHandle<()>>>,
}

impl AutoRecorder {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        recorder: Arc<dyn ExternalRecorder>,
        capture: Arc<TokioMutex<Box<dyn CaptureSource>>>,
        analyzer: Arc<FrameAnalyzer>,
        registry: Arc<MatcherRegistry>,
        weapons: WeaponRecognitionService,
        subtitle: Option<Arc<dyn SubtitleCapture>>,
        repository: Arc<AssetRepository>,
        state_machine: Arc<RecordingStateMachine>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            recorder,
            capture,
            analyzer,
            registry,
            weapons,
            subtitle,
            repository,
            state_machine,
            event_bus,
            session: TokioRwLock::new(Session::idle()),
            resume_trigger: TokioMutex::new(None),
            power_off_count: AtomicU32::new(0),
            running: AtomicBool::new(false),
            cancel_token: CancellationToken::new(),
            run_task: TokioMutex::new(None),
        }
    }

    pub fn state(&self) -> crate::state_machine::RecordState {
        self.state_machine.state()
    }

    /// Whether `execute()`'s frame loop is currently running, for
    /// `GET /recorder/state`'s `loop_running` field (§6).
    pub fn is_loop_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ---- manual controls (§4.5) -----------------------------------------

    pub async fn manual_start(&self) {
        if self.state() != crate::state_machine::RecordState::Stopped {
            return;
        }
        self.session.write().await.matching_started_at = Some(Utc::now());
        self.begin_recording().await;
        self.state_machine.apply(RecordEvent::Start).await;
    }

    pub async fn manual_stop(&self) {
        let state = self.state();
        if state == crate::state_machine::RecordState::Recording || state == crate::state_machine::RecordState::Paused {
            self.stop(None).await;
            self.state_machine.apply(RecordEvent::Stop).await;
        }
    }

    pub async fn manual_pause(&self) {
        if self.state() == crate::state_machine::RecordState::Recording {
            self.pause(Box::new(|_| false)).await;
            self.state_machine.apply(RecordEvent::Pause).await;
        }
    }

    pub async fn manual_resume(&self) {
        if self.state() == crate::state_machine::RecordState::Paused {
            self.resume().await;
            self.state_machine.apply(RecordEvent::Resume).await;
        }
    }

    /// Discards the in-flight session without saving anything (§6
    /// `POST /recorder/cancel`), distinct from `manual_stop` which persists.
    pub async fn manual_cancel(&self) {
        let state = self.state();
        if state == crate::state_machine::RecordState::Recording || state == crate::state_machine::RecordState::Paused {
            self.cancel().await;
            self.state_machine.apply(RecordEvent::Stop).await;
        }
    }

    /// Cooperative shutdown for `execute()`'s loop.
    pub fn request_cancel(&self) {
        self.cancel_token.cancel();
    }

    // ---- session lifecycle (§4.5) ----------------------------------------

    async fn begin_recording(&self) {
        if let Err(err) = self.recorder.start().await {
            warn!(?err, "failed to start external recorder");
        }
        if let Some(subtitle) = &self.subtitle {
            if let Err(err) = subtitle.start().await {
                warn!(?err, "failed to start subtitle capture");
            }
        }
        let started_at = Instant::now();
        self.session.write().await.battle_started_at = Some(started_at);
        self.weapons.begin_detection_window(started_at).await;
    }

    /// Stops the recorder and pulls the subtitle track, in parallel with a
    /// best-effort final result extraction from `last_frame`, then hands the
    /// assembled asset to the repository (§4.5 `_stop`).
    async fn stop(&self, last_frame: Option<Frame>) {
        let recorder = self.recorder.clone();
        let subtitle_handle = self.subtitle.clone();
        let stop_fut = async move {
            tokio::time::sleep(STOP_GRACE_PERIOD).await;
            let video = recorder.stop().await.ok().flatten();
            let subtitle = match &subtitle_handle {
                Some(s) => s.stop().await.unwrap_or_default(),
                None => String::new(),
            };
            (video, subtitle)
        };

        let analyzer = self.analyzer.clone();
        let game_mode = self.session.read().await.game_mode;
        let result_fut = async move {
            match (last_frame, game_mode) {
                (Some(frame), Some(mode)) => analyzer.extract_session_result(mode, &frame).await,
                _ => None,
            }
        };

        let ((video, subtitle), result) = tokio::join!(stop_fut, result_fut);

        let mut session = self.session.write().await;
        let Some(matching_started_at) = session.matching_started_at else {
            warn!("stop() called without a matching_started_at; dropping session");
            session.reset();
            return;
        };
        let mut metadata = RecordingMetadata::new(
            session.game_mode.unwrap_or(GameMode::Battle),
            matching_started_at,
        );
        metadata.rate = session.metadata.rate;
        metadata.judgement = session.metadata.judgement;
        metadata.result = result.map(GameResult::Battle);

        let Some(video) = video else {
            warn!("recorder produced no output file; nothing to save");
            session.reset();
            return;
        };

        let repository = self.repository.clone();
        let subtitle_opt = (!subtitle.is_empty()).then_some(subtitle.as_str());
        match repository.save_recording(video, subtitle_opt, None, &metadata) {
            Ok(asset) => {
                info!(path = %asset.video.display(), "recording saved");
                self.event_bus.publish("asset.recorded.saved", json!({"video": asset.video.display().to_string()}));
            }
            Err(err) => {
                warn!(?err, "failed to save recording");
                self.event_bus.publish("recorder.operation_status", json!({"message": format!("failed to save recording: {err}")}));
            }
        }
        session.reset();
        self.event_bus.publish("recorder.reset", json!({}));
    }

    async fn cancel(&self) {
        if let Err(err) = self.recorder.stop().await {
            warn!(?err, "failed to stop external recorder during cancel");
        }
        if let Some(subtitle) = &self.subtitle {
            let _ = subtitle.stop().await;
        }
        self.session.write().await.reset();
        self.event_bus.publish("recorder.reset", json!({}));
    }

    async fn pause(&self, trigger: ResumeTrigger) {
        if let Err(err) = self.recorder.pause().await {
            warn!(?err, "failed to pause external recorder");
        }
        if let Some(subtitle) = &self.subtitle {
            let _ = subtitle.pause().await;
        }
        *self.resume_trigger.lock().await = Some(trigger);
    }

    async fn resume(&self) {
        if let Err(err) = self.recorder.resume().await {
            warn!(?err, "failed to resume external recorder");
        }
        if let Some(subtitle) = &self.subtitle {
            let _ = subtitle.resume().await;
        }
        *self.resume_trigger.lock().await = None;
    }

    // ---- per-frame dispatch (§4.5) ----------------------------------------

    async fn handle_standby(&self, frame: &Frame) {
        let matching_started_at = self.session.read().await.matching_started_at;
        if matching_started_at.is_none() {
            if self.registry.is_match(gate::MATCH_SELECT, frame).unwrap_or(false) {
                let mut session = self.session.write().await;
                if session.game_mode.is_none() {
                    session.game_mode = self.extract_game_mode(frame);
                    if let Some(mode) = session.game_mode {
                        info!(?mode, "game mode detected");
                    }
                }
                if let Some(mode) = session.game_mode {
                    if let Some(matched) = self.analyzer.extract_match_select(mode, frame).await {
                        if let Some(rate) = self.analyzer.extract_rate(mode, frame, matched).await {
                            if crate::domain::Rate::should_update(session.metadata.rate.as_ref(), &rate) {
                                info!(%rate, "rate detected");
                                session.metadata.rate = Some(rate);
                                self.event_bus.publish(
                                    "recorder.metadata_updated",
                                    json!({"metadata": {"rate": rate.to_string()}}),
                                );
                            }
                        }
                    }
                }
            }
            if self.registry.is_match(gate::MATCHING_START, frame).unwrap_or(false) {
                info!("matching start detected");
                self.session.write().await.matching_started_at = Some(Utc::now());
            }
            return;
        }

        if self.registry.is_match(gate::SCHEDULE_CHANGE, frame).unwrap_or(false) {
            info!("schedule change detected, resetting session");
            self.cancel().await;
            return;
        }
        let game_mode = self.session.read().await.game_mode;
        if let Some(mode) = game_mode {
            if self.analyzer.detect_session_start(mode, frame).await {
                info!("battle start detected");
                self.begin_recording().await;
                self.state_machine.apply(RecordEvent::Start).await;
                self.event_bus.publish("recorder.match", json!({"event": "battle_started"}));
            }
        }
    }

    async fn handle_recording(&self, frame: Frame) {
        let game_mode = self.session.read().await.game_mode;
        let Some(mode) = game_mode else {
            warn!("recording with no game mode set, cancelling");
            self.cancel().await;
            self.state_machine.apply(RecordEvent::Stop).await;
            return;
        };

        self.weapons.process(frame.clone()).await;

        let finish = self.session.read().await.finish;
        if !finish {
            let battle_started_at = self.session.read().await.battle_started_at;
            let Some(started_at) = battle_started_at else { return };
            let elapsed = started_at.elapsed();

            if elapsed <= SESSION_ABORT_WINDOW && self.analyzer.detect_session_abort(mode, &frame).await {
                info!("session abort detected, cancelling recording");
                self.cancel().await;
                self.state_machine.apply(RecordEvent::Stop).await;
                return;
            }
            if elapsed >= SESSION_TIMEOUT {
                info!("session exceeded timeout, stopping");
                self.stop(None).await;
                self.state_machine.apply(RecordEvent::Stop).await;
                return;
            }
            if self.analyzer.detect_session_finish(mode, &frame).await {
                info!("session finish detected, pausing for judgement");
                self.session.write().await.finish = true;
                let analyzer = self.analyzer.clone();
                self.pause(Box::new(move |f| {
                    futures_lite_block_on(analyzer.detect_session_judgement(mode, f))
                }))
                .await;
                self.state_machine.apply(RecordEvent::Pause).await;
            }
        } else {
            if self.analyzer.detect_session_judgement(mode, &frame).await {
                let mut session = self.session.write().await;
                if session.metadata.judgement.is_none() {
                    session.metadata.judgement = self.analyzer.extract_session_judgement(mode, &frame).await;
                }
                return;
            }
            if self.registry.is_match(gate::LOADING, &frame).unwrap_or(false) {
                info!("loading screen detected, pausing");
                let registry = self.registry.clone();
                self.pause(Box::new(move |f| registry.is_match(gate::LOADING_END, f).unwrap_or(false)))
                    .await;
                self.state_machine.apply(RecordEvent::Pause).await;
                return;
            }
            if self.analyzer.detect_session_finish(mode, &frame).await
                || self.registry.is_match("session_result", &frame).unwrap_or(false)
            {
                info!("session result detected, stopping");
                self.stop(Some(frame)).await;
                self.state_machine.apply(RecordEvent::Stop).await;
            }
        }
    }

    async fn handle_paused(&self, frame: &Frame) {
        let fires = match self.resume_trigger.lock().await.as_ref() {
            Some(trigger) => trigger(frame),
            None => false,
        };
        if fires {
            info!("resume trigger fired, resuming");
            self.resume().await;
            self.state_machine.apply(RecordEvent::Resume).await;
        }
    }

    fn extract_game_mode(&self, frame: &Frame) -> Option<GameMode> {
        match self.registry.matched_name(gate::GAME_MODE_SELECT, frame).ok()?.as_deref() {
            Some("battle") => Some(GameMode::Battle),
            Some("salmon") => Some(GameMode::Salmon),
            _ => None,
        }
    }

    /// Polls the power-off matcher at ≤ 0.1 Hz and returns `true` once six
    /// consecutive checks 10 s apart come back positive (§4.5).
    fn check_power_off(&self, frame: &Frame, last_check: &mut Instant) -> bool {
        if last_check.elapsed() < POWER_OFF_POLL_INTERVAL {
            return false;
        }
        *last_check = Instant::now();
        if self.registry.is_match(gate::POWER_OFF, frame).unwrap_or(false) {
            let count = self.power_off_count.fetch_add(1, Ordering::SeqCst) + 1;
            info!(count, "power-off candidate frame detected");
            count >= POWER_OFF_DEBOUNCE_COUNT
        } else {
            self.power_off_count.store(0, Ordering::SeqCst);
            false
        }
    }

    /// Runs the capture/analyze/record loop until the power-off sentinel
    /// debounces positive or `request_cancel()` is called. On exit, tears
    /// down capture and, if a session is in progress, cancels it.
    pub async fn execute(&self) {
        info!("auto recorder starting");
        self.running.store(true, Ordering::SeqCst);
        let mut last_power_off_check = Instant::now() - POWER_OFF_POLL_INTERVAL;

        loop {
            if self.cancel_token.is_cancelled() {
                break;
            }
            let frame = {
                let mut capture = self.capture.lock().await;
                match capture.capture().await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => continue,
                    Err(err) => {
                        warn!(?err, "capture failed");
                        continue;
                    }
                }
            };

            if self.check_power_off(&frame, &mut last_power_off_check) {
                info!("power-off debounced, stopping auto recorder");
                break;
            }

            match self.state() {
                crate::state_machine::RecordState::Stopped => self.handle_standby(&frame).await,
                crate::state_machine::RecordState::Recording => self.handle_recording(frame).await,
                crate::state_machine::RecordState::Paused => self.handle_paused(&frame).await,
            }
        }

        info!("auto recorder stopping");
        {
            let mut capture = self.capture.lock().await;
            let _ = capture.teardown().await;
        }
        if self.state() != crate::state_machine::RecordState::Stopped {
            self.cancel().await;
        }
        self.running.store(false, Ordering::SeqCst);
    }
}

/// Bridges a synchronous resume-trigger closure (required by `ResumeTrigger`'s
/// `Fn` bound, since `handle_paused` evaluates it between async frame polls
/// rather than awaiting it directly) to the analyzer's async detector.
/// Blocks only on an already-completed or near-instant future — the
/// detector never suspends on anything but the shared `MatcherRegistry`,
/// which never awaits I/O.
fn futures_lite_block_on<F: std::future::Future>(fut: F) -> F::Output {
    tokio::runtime::Handle::current().block_on(fut)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{BattleAnalyzer, SalmonAnalyzer};
    use crate::external::{MockCaptureSource, MockOcrEngine, MockRecorder};
    use crate::weapon::{HsvRange, WeaponDetectionConfig};
    use image::GrayImage;

    fn rois() -> crate::analyzer::BattleRois {
        let zero = crate::domain::Roi { x: 0, y: 0, width: 1, height: 1 };
        crate::analyzer::BattleRois {
            xp: zero,
            kill: zero,
            death: zero,
            special: zero,
            kill_trikolor: zero,
            death_trikolor: zero,
            special_trikolor: zero,
        }
    }

    fn weapon_service() -> WeaponRecognitionService {
        WeaponRecognitionService::new(
            WeaponDetectionConfig {
                slots: Vec::new(),
                sample_offset: (0, 0),
                allies_max_distance: 90.0,
                enemies_max_distance: 90.0,
                teams_min_distance: 110.0,
                strict_team_color: HsvRange { lower: [0, 0, 0], upper: [179, 255, 255] },
                relaxed_team_color: HsvRange { lower: [0, 0, 0], upper: [179, 255, 255] },
                species_mask_ika: GrayImage::new(1, 1),
                species_mask_tako: GrayImage::new(1, 1),
                iou_threshold: 0.5,
                min_matching_slots: 0,
                max_shift: 1,
            },
            Vec::new(),
            Vec::new(),
            |_event| {},
        )
    }

    async fn recorder_with(tempdir: &tempfile::TempDir) -> AutoRecorder {
        let registry = Arc::new(MatcherRegistry::builder().build().unwrap());
        let ocr = Arc::new(MockOcrEngine::never());
        let analyzer = Arc::new(FrameAnalyzer::new(
            BattleAnalyzer::new(registry.clone(), ocr, rois()),
            SalmonAnalyzer::new(registry.clone()),
        ));
        let repository = Arc::new(
            AssetRepository::new(tempdir.path().join("recorded"), tempdir.path().join("edited")).unwrap(),
        );
        AutoRecorder::new(
            Arc::new(MockRecorder::new()),
            Arc::new(TokioMutex::new(Box::new(MockCaptureSource::new(Vec::new())) as Box<dyn CaptureSource>)),
            analyzer,
            registry,
            weapon_service(),
            None,
            repository,
            Arc::new(RecordingStateMachine::new()),
            EventBus::new(),
        )
    }

    #[tokio::test]
    async fn manual_start_transitions_to_recording() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder_with(&dir).await;
        recorder.manual_start().await;
        assert_eq!(recorder.state(), crate::state_machine::RecordState::Recording);
    }

    #[tokio::test]
    async fn manual_stop_without_a_session_resets_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder_with(&dir).await;
        recorder.manual_start().await;
        recorder.manual_stop().await;
        assert_eq!(recorder.state(), crate::state_machine::RecordState::Stopped);
    }

    #[tokio::test]
    async fn manual_pause_then_resume_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let recorder = recorder_with(&dir).await;
        recorder.manual_start().await;
        recorder.manual_pause().await;
        assert_eq!(recorder.state(), crate::state_machine::RecordState::Paused);
        recorder.manual_resume().await;
        assert_eq!(recorder.state(), crate::state_machine::RecordState::Recording);
    }

    #[test]
    fn power_off_requires_six_consecutive_positives() {
        assert_eq!(POWER_OFF_DEBOUNCE_COUNT, 6);
    }
}
