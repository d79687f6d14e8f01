//! HTTP/SSE control surface (C8, §6). Per §5, handlers never touch the
//! frame pipeline (`AutoRecorder`) directly — recorder operations go
//! through the command bus, domain notifications come off the event bus.
//! The asset repository is data-at-rest, not the frame pipeline, so
//! listing/mutating assets talks to it directly.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;

use crate::bus::{CommandBus, EventBus};
use crate::domain::RecordingMetadata;
use crate::storage::AssetRepository;

use super::error::ServerError;

/// Shared handle every route closes over. Cheap to clone — every field is
/// itself an `Arc` or an already-`Clone` bus handle.
#[derive(Clone)]
pub struct ServerState {
    pub commands: CommandBus,
    pub assets: Arc<AssetRepository>,
    pub events: EventBus,
}

pub fn router(state: ServerState) -> Router {
    Router::new()
        .route("/recorder/state", get(recorder_state))
        .route("/recorder/start", axum::routing::post(recorder_start))
        .route("/recorder/pause", axum::routing::post(recorder_pause))
        .route("/recorder/resume", axum::routing::post(recorder_resume))
        .route("/recorder/stop", axum::routing::post(recorder_stop))
        .route("/recorder/cancel", axum::routing::post(recorder_cancel))
        .route("/assets/recorded", get(list_recorded))
        .route("/assets/recorded/:id/metadata", patch(update_metadata))
        .route("/assets/recorded/:id", axum::routing::delete(delete_recorded))
        .route("/assets/edited", get(list_edited))
        .route("/assets/edited/:id", axum::routing::delete(delete_edited))
        .route("/subtitles/recorded/:id", get(read_subtitle).put(write_subtitle))
        .route("/events/:stream", get(sse_stream))
        .with_state(state)
}

async fn run_command(bus: &CommandBus, name: &'static str) -> Result<Json<Value>, ServerError> {
    let value = bus.submit(name, Value::Null).await?;
    Ok(Json(value))
}

async fn recorder_state(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    run_command(&state.commands, "recorder.state").await
}

async fn recorder_start(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    run_command(&state.commands, "recorder.start").await
}

async fn recorder_pause(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    run_command(&state.commands, "recorder.pause").await
}

async fn recorder_resume(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    run_command(&state.commands, "recorder.resume").await
}

async fn recorder_stop(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    run_command(&state.commands, "recorder.stop").await
}

async fn recorder_cancel(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    run_command(&state.commands, "recorder.cancel").await
}

async fn list_recorded(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    Ok(Json(state.assets.list_recordings()?))
}

async fn list_edited(State(state): State<ServerState>) -> Result<impl IntoResponse, ServerError> {
    let paths: Vec<String> = state
        .assets
        .list_edited()?
        .into_iter()
        .map(|p| p.display().to_string())
        .collect();
    Ok(Json(paths))
}

async fn update_metadata(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(metadata): Json<RecordingMetadata>,
) -> Result<impl IntoResponse, ServerError> {
    state.assets.update_metadata(&id, &metadata)?;
    state.events.publish("asset.recorded.metadata_updated", json!({"id": id}));
    Ok(Json(json!({"ok": true})))
}

async fn delete_recorded(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    state.assets.delete_recording_by_id(&id)?;
    state.events.publish("asset.recorded.deleted", json!({"id": id}));
    Ok(Json(json!({"ok": true})))
}

async fn delete_edited(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    state.assets.delete_edited_by_name(&id)?;
    state.events.publish("asset.edited.deleted", json!({"id": id}));
    Ok(Json(json!({"ok": true})))
}

async fn read_subtitle(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let text = state.assets.read_subtitle(&id)?.unwrap_or_default();
    Ok(text)
}

async fn write_subtitle(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    body: String,
) -> Result<impl IntoResponse, ServerError> {
    state.assets.write_subtitle(&id, &body)?;
    state.events.publish("asset.recorded.subtitle_updated", json!({"id": id}));
    Ok(Json(json!({"ok": true})))
}

/// Named event streams (§6): `progress`, `domain-events`, `recorder-state`,
/// `metadata`, `assets`. Each maps to a filtered subscription on the shared
/// bus; `domain-events` alone receives everything.
fn stream_filter(name: &str) -> Result<Option<HashSet<String>>, ServerError> {
    let types: &[&str] = match name {
        "domain-events" => return Ok(None),
        "progress" => &["recorder.match", "recorder.operation_status"],
        "recorder-state" => &["recorder.state", "recorder.reset"],
        "metadata" => &["recorder.metadata_updated", "asset.recorded.metadata_updated"],
        "assets" => &[
            "asset.recorded.saved",
            "asset.recorded.metadata_updated",
            "asset.recorded.subtitle_updated",
            "asset.recorded.deleted",
            "asset.edited.saved",
            "asset.edited.deleted",
        ],
        other => return Err(ServerError::BadRequest(format!("unknown event stream: {other}"))),
    };
    Ok(Some(types.iter().map(|s| s.to_string()).collect()))
}

async fn sse_stream(
    State(state): State<ServerState>,
    Path(stream): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, std::convert::Infallible>>>, ServerError> {
    let filter = stream_filter(&stream)?;
    let subscription = state.events.subscribe(filter, 256);
    let (tx, rx) = mpsc::channel::<Result<SseEvent, std::convert::Infallible>>(32);

    tokio::spawn(async move {
        // Owns `subscription`, so the bus drops it (and stops delivery) the
        // moment the client disconnects and `tx.send` starts failing.
        let subscription = subscription;
        let mut interval = tokio::time::interval(Duration::from_millis(200));
        loop {
            interval.tick().await;
            for event in subscription.poll(64) {
                let sse_event = SseEvent::default().event(event.event_type.clone());
                let sse_event = match sse_event.json_data(&event.payload) {
                    Ok(event) => event,
                    Err(_) => continue,
                };
                if tx.send(Ok(sse_event)).await.is_err() {
                    return;
                }
            }
        }
    });

    Ok(Sse::new(ReceiverStream::new(rx)).keep_alive(KeepAlive::default()))
}
