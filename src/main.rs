use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::json;
use splat_capture_daemon::analyzer::{BattleAnalyzer, BattleRois, FrameAnalyzer, SalmonAnalyzer};
use splat_capture_daemon::auto_recorder::AutoRecorder;
use splat_capture_daemon::bus::{CommandBus, EventBus};
use splat_capture_daemon::domain::Roi;
use splat_capture_daemon::external::{
    CaptureSource, ExternalRecorder, MockCaptureSource, ObsRecorder, OcrEngine, TesseractOcr,
};
use splat_capture_daemon::matcher::MatcherRegistry;
use splat_capture_daemon::server;
use splat_capture_daemon::state_machine::RecordingStateMachine;
use splat_capture_daemon::storage::AssetRepository;
use splat_capture_daemon::utils::logging::{init_logging, LogConfig};
use splat_capture_daemon::weapon::{HsvRange, WeaponDetectionConfig, WeaponRecognitionService};
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};

/// Fixed pixel ROIs the battle analyzer reads from a 1920x1080 frame.
/// Placeholder until real calibration data lands in a structured config
/// (C10) — see the equivalent caveat on `weapon::detection`.
fn battle_rois() -> BattleRois {
    let roi = |x, y, width, height| Roi { x, y, width, height };
    BattleRois {
        xp: roi(0, 0, 1, 1),
        kill: roi(0, 0, 1, 1),
        death: roi(0, 0, 1, 1),
        special: roi(0, 0, 1, 1),
        kill_trikolor: roi(0, 0, 1, 1),
        death_trikolor: roi(0, 0, 1, 1),
        special_trikolor: roi(0, 0, 1, 1),
    }
}

/// Placeholder weapon-detection tuning, same caveat as `battle_rois`: no
/// slots or templates are loaded until C10 supplies real calibration data,
/// so the service never actually detects a lineup — it just idles safely.
fn weapon_detection_config() -> WeaponDetectionConfig {
    let wide_open = HsvRange { lower: [0, 0, 0], upper: [179, 255, 255] };
    WeaponDetectionConfig {
        slots: Vec::new(),
        sample_offset: (0, 0),
        allies_max_distance: 90.0,
        enemies_max_distance: 90.0,
        teams_min_distance: 110.0,
        strict_team_color: wide_open.clone(),
        relaxed_team_color: wide_open,
        species_mask_ika: image::GrayImage::new(1, 1),
        species_mask_tako: image::GrayImage::new(1, 1),
        iou_threshold: 0.5,
        min_matching_slots: 0,
        max_shift: 1,
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let app_data_dir = dirs::data_dir()
        .expect("failed to resolve the platform data directory")
        .join("splat-capture-daemon");

    let log_config = if cfg!(debug_assertions) {
        LogConfig::development(app_data_dir.join("logs"))
    } else {
        LogConfig::production(app_data_dir.join("logs"))
    };
    init_logging(log_config).expect("failed to initialize logging");

    info!("starting splat capture daemon");

    let recorded_dir = app_data_dir.join("recordings");
    let edited_dir = app_data_dir.join("edited");
    let repository = Arc::new(AssetRepository::new(recorded_dir, edited_dir)?);

    // No matcher configuration source (C10) exists yet, so the registry
    // starts empty — every `is_match`/`matched_name` call returns an
    // "unknown key" error until real screens/groups are loaded into it.
    let registry = Arc::new(MatcherRegistry::builder().build()?);
    warn!("matcher registry has no configured screens; analyzer/weapon detection is inert until C10 lands");

    let ocr: Arc<dyn OcrEngine> = Arc::new(TesseractOcr::new());
    let analyzer = Arc::new(FrameAnalyzer::new(
        BattleAnalyzer::new(registry.clone(), ocr, battle_rois()),
        SalmonAnalyzer::new(registry.clone()),
    ));

    let event_bus = EventBus::new();

    let weapon_events = event_bus.clone();
    let weapons = WeaponRecognitionService::new(weapon_detection_config(), Vec::new(), Vec::new(), move |detected| {
        weapon_events.publish(
            "recorder.metadata_updated",
            json!({"metadata": {"allies": detected.allies, "enemies": detected.enemies, "final": detected.is_final}}),
        );
    });

    let recorder: Arc<dyn ExternalRecorder> = Arc::new(ObsRecorder::new(
        env_or("OBS_EXECUTABLE_PATH", "obs64.exe").into(),
        env_or("OBS_HOST", "localhost"),
        env_or("OBS_PORT", "4455").parse().unwrap_or(4455),
        std::env::var("OBS_PASSWORD").ok(),
    ));

    #[cfg(feature = "ndi")]
    let capture: Box<dyn CaptureSource> =
        Box::new(splat_capture_daemon::external::NdiCaptureSource::new(env_or("CAPTURE_NDI_SOURCE", "OBS")));
    #[cfg(not(feature = "ndi"))]
    let capture: Box<dyn CaptureSource> = {
        warn!("built without the `ndi` feature; capture source is a no-op replay of zero frames");
        Box::new(MockCaptureSource::new(Vec::new()))
    };
    let capture = Arc::new(TokioMutex::new(capture));

    let state_machine = Arc::new(RecordingStateMachine::new());

    let auto_recorder = Arc::new(AutoRecorder::new(
        recorder,
        capture,
        analyzer,
        registry,
        weapons,
        None,
        repository.clone(),
        state_machine,
        event_bus.clone(),
    ));

    let (command_bus, command_registry) = CommandBus::new();
    register_recorder_commands(&command_registry, auto_recorder.clone());

    let loop_handle = {
        let auto_recorder = auto_recorder.clone();
        tokio::spawn(async move { auto_recorder.execute().await })
    };

    let server_state = server::ServerState { commands: command_bus, assets: repository, events: event_bus };
    let app = server::app(server_state);

    let addr: SocketAddr = env_or("HTTP_BIND_ADDR", "127.0.0.1:8787").parse()?;
    info!(%addr, "HTTP/SSE control surface listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    loop_handle.abort();
    Ok(())
}

/// Registers the recorder's manual operations as named commands (§4.7,
/// §5) so the HTTP boundary never holds `AutoRecorder` directly.
fn register_recorder_commands(registry: &splat_capture_daemon::bus::CommandRegistry, recorder: Arc<AutoRecorder>) {
    macro_rules! register {
        ($name:literal, $method:ident) => {
            let recorder = recorder.clone();
            registry.register(
                $name,
                Arc::new(move |_payload| {
                    let recorder = recorder.clone();
                    Box::pin(async move {
                        recorder.$method().await;
                        Ok(json!({"ok": true}))
                    })
                }),
            );
        };
    }

    register!("recorder.start", manual_start);
    register!("recorder.pause", manual_pause);
    register!("recorder.resume", manual_resume);
    register!("recorder.stop", manual_stop);
    register!("recorder.cancel", manual_cancel);

    let state_recorder = recorder.clone();
    registry.register(
        "recorder.state",
        Arc::new(move |_payload| {
            let recorder = state_recorder.clone();
            Box::pin(async move {
                Ok(json!({"state": recorder.state(), "loop_running": recorder.is_loop_running()}))
            })
        }),
    );
}
