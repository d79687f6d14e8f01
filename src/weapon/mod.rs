//! Weapon-recognition service (§4.3): detects when the post-match weapon
//! display is on screen, then resolves each of the 8 slots against a
//! template library. Driven by repeated `process(frame)` calls from the
//! capture loop with at-most-one-in-flight, latest-frame-coalescing
//! orchestration, grounded on the teacher's `recording/auto_clip_manager.rs`
//! task-handle/`CancellationToken` shape.

pub mod context;
pub mod detection;
pub mod recognize;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex as TokioMutex;
use tracing::warn;

pub use context::{BattleWeaponsDetected, WeaponRecognitionContext};
pub use detection::{detect_weapon_display, HsvRange, WeaponDetectionConfig};
pub use recognize::{recognize_weapons, WeaponTemplate};

use crate::domain::{Frame, Roi, SlotId, WeaponSlotResult};

pub const DETECTION_WINDOW_SECONDS: u64 = 20;
pub const DETECTION_RECOGNITION_TIMEOUT_SECONDS: u64 = 5;
pub const FINALIZE_RECOGNITION_TIMEOUT_SECONDS: u64 = 10;

struct Inner {
    detection_config: WeaponDetectionConfig,
    slot_rois: Vec<(SlotId, Roi)>,
    weapons: Vec<WeaponTemplate>,
    detection_window: Duration,
    recognition_timeout: Duration,
    finalize_timeout: Duration,
    state: TokioMutex<WeaponRecognitionContext>,
    generation: AtomicU64,
    task_running: AtomicBool,
    pending_frame: TokioMutex<Option<Frame>>,
    on_event: Box<dyn Fn(BattleWeaponsDetected) + Send + Sync>,
}

/// Entry point the auto-recorder orchestrator (C5) drives once per captured
/// frame while a battle's weapon lineup isn't yet resolved.
#[derive(Clone)]
pub struct WeaponRecognitionService(Arc<Inner>);

impl WeaponRecognitionService {
    pub fn new(
        detection_config: WeaponDetectionConfig,
        slot_rois: Vec<(SlotId, Roi)>,
        weapons: Vec<WeaponTemplate>,
        on_event: impl Fn(BattleWeaponsDetected) + Send + Sync + 'static,
    ) -> Self {
        Self(Arc::new(Inner {
            detection_config,
            slot_rois,
            weapons,
            detection_window: Duration::from_secs(DETECTION_WINDOW_SECONDS),
            recognition_timeout: Duration::from_secs(DETECTION_RECOGNITION_TIMEOUT_SECONDS),
            finalize_timeout: Duration::from_secs(FINALIZE_RECOGNITION_TIMEOUT_SECONDS),
            state: TokioMutex::new(WeaponRecognitionContext::default()),
            generation: AtomicU64::new(0),
            task_running: AtomicBool::new(false),
            pending_frame: TokioMutex::new(None),
            on_event: Box::new(on_event),
        }))
    }

    /// Starts a fresh detection window for a newly begun battle, cancelling
    /// any task left over from a previous one.
    pub async fn begin_detection_window(&self, started_at: Instant) {
        self.request_cancel();
        let mut ctx = self.0.state.lock().await;
        ctx.reset(started_at);
    }

    /// Bumps the cancellation generation; any in-flight task whose captured
    /// generation no longer matches discards its result on completion.
    pub fn request_cancel(&self) {
        self.0.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn snapshot(&self) -> WeaponRecognitionContext {
        self.0.state.lock().await.clone()
    }

    pub async fn process(&self, frame: Frame) {
        let mut ctx = self.0.state.lock().await;
        if ctx.weapon_detection_done {
            return;
        }
        let Some(started_at) = ctx.battle_started_at else { return };

        if self.0.task_running.load(Ordering::SeqCst) {
            drop(ctx);
            *self.0.pending_frame.lock().await = Some(frame);
            return;
        }

        let window_open = started_at.elapsed() < self.0.detection_window;
        if window_open {
            if !detect_weapon_display(&frame, &self.0.detection_config) {
                return;
            }
            ctx.weapon_detection_attempts += 1;
            let target_slots = ctx.unmatched_slots();
            drop(ctx);
            self.spawn_recognition(frame, target_slots, false);
        } else if !ctx.finalize_started {
            ctx.finalize_started = true;
            let target_slots = ctx.unmatched_slots();
            drop(ctx);
            self.spawn_recognition(frame, target_slots, true);
        }
    }

    fn spawn_recognition(&self, frame: Frame, target_slots: Vec<SlotId>, is_finalize: bool) {
        let inner = self.0.clone();
        let my_generation = inner.generation.load(Ordering::SeqCst);
        inner.task_running.store(true, Ordering::SeqCst);

        tokio::spawn(async move {
            let previous: Vec<WeaponSlotResult> = {
                let ctx = inner.state.lock().await;
                crate::domain::SlotId::ALL
                    .into_iter()
                    .filter(|slot_id| !target_slots.contains(slot_id))
                    .filter_map(|slot_id| {
                        ctx.slot(slot_id).clone().map(|weapon| WeaponSlotResult {
                            slot_id,
                            predicted_weapon: weapon,
                            is_unmatched: false,
                            top_candidates: Vec::new(),
                        })
                    })
                    .collect()
            };

            let timeout_dur = if is_finalize { inner.finalize_timeout } else { inner.recognition_timeout };
            let slot_rois = inner.slot_rois.clone();
            let weapons = inner.weapons.clone();
            let targets = target_slots.clone();
            let frame_for_task = frame.clone();
            let outcome = tokio::time::timeout(
                timeout_dur,
                tokio::task::spawn_blocking(move || {
                    recognize_weapons(&frame_for_task, &slot_rois, &weapons, &targets, &previous)
                }),
            )
            .await;

            if inner.generation.load(Ordering::SeqCst) != my_generation {
                inner.task_running.store(false, Ordering::SeqCst);
                *inner.pending_frame.lock().await = None;
                return;
            }

            match outcome {
                Ok(Ok(recognition)) => {
                    let mut ctx = inner.state.lock().await;
                    for slot in &recognition.slot_results {
                        if !slot.is_unmatched {
                            ctx.set_slot(slot.slot_id, slot.predicted_weapon.clone());
                        }
                    }
                    let fully_matched = ctx.is_fully_matched();
                    let is_final = is_finalize || fully_matched;
                    if is_final {
                        if is_finalize {
                            ctx.fill_unmatched();
                        }
                        ctx.weapon_detection_done = true;
                    }
                    let event = BattleWeaponsDetected::from_context(&ctx, is_final);
                    drop(ctx);
                    (inner.on_event)(event);
                }
                Ok(Err(_join_error)) => {
                    warn!("weapon recognition task panicked");
                }
                Err(_timeout) => {
                    if is_finalize {
                        let mut ctx = inner.state.lock().await;
                        ctx.fill_unmatched();
                        ctx.weapon_detection_done = true;
                        let event = BattleWeaponsDetected::from_context(&ctx, true);
                        drop(ctx);
                        warn!("weapon finalize recognition timed out, defaulting to unmatched");
                        (inner.on_event)(event);
                    }
                }
            }

            let pending = inner.pending_frame.lock().await.take();
            inner.task_running.store(false, Ordering::SeqCst);
            if let Some(next_frame) = pending {
                let service = WeaponRecognitionService(inner.clone());
                service.process(next_frame).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Team;
    use image::{GrayImage, Luma};
    use std::sync::Mutex as StdMutex;

    fn config() -> WeaponDetectionConfig {
        WeaponDetectionConfig {
            slots: Vec::new(),
            sample_offset: (0, 0),
            allies_max_distance: 90.0,
            enemies_max_distance: 90.0,
            teams_min_distance: 110.0,
            strict_team_color: HsvRange { lower: [0, 0, 0], upper: [179, 255, 255] },
            relaxed_team_color: HsvRange { lower: [0, 0, 0], upper: [179, 255, 255] },
            species_mask_ika: GrayImage::new(4, 4),
            species_mask_tako: GrayImage::new(4, 4),
            iou_threshold: 0.5,
            min_matching_slots: 0,
            max_shift: 2,
        }
    }

    #[tokio::test]
    async fn finalize_path_fills_unmatched_when_window_closed() {
        let events: Arc<StdMutex<Vec<BattleWeaponsDetected>>> = Arc::new(StdMutex::new(Vec::new()));
        let events_clone = events.clone();
        let service = WeaponRecognitionService::new(config(), Vec::new(), Vec::new(), move |event| {
            events_clone.lock().unwrap().push(event);
        });

        let started_at = Instant::now() - Duration::from_secs(DETECTION_WINDOW_SECONDS + 1);
        service.begin_detection_window(started_at).await;

        let frame = crate::domain::Frame::new(2, 2, vec![0u8; 12]);
        service.process(frame).await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let ctx = service.snapshot().await;
        assert!(ctx.weapon_detection_done);
        assert!(ctx.is_fully_matched());
        assert_eq!(events.lock().unwrap().len(), 1);
        assert!(events.lock().unwrap()[0].is_final);
    }

    #[test]
    fn slot_team_bucket_maps_to_ally_index() {
        let slot = SlotId { team: Team::Ally, index: 2 };
        assert_eq!(slot.index, 2);
    }
}
