use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock as SyncRwLock;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::error::{ExternalError, Result};

/// Recorder lifecycle events, broadcast to whoever registered a listener
/// (§6 "emits a state-changed event"). Mirrors the recorder's own state
/// names, not the daemon's `RecordState` (C4) — the two are related but the
/// recorder can report e.g. `paused` independent of the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecorderStateChange {
    Started,
    Paused,
    Resumed,
    Stopped,
}

pub type RecorderListener = Arc<dyn Fn(RecorderStateChange) + Send + Sync>;

/// The external video recorder (§6): async control over an OBS-shaped
/// process, independent of whether it's reached over a local process launch
/// or an already-running instance.
#[async_trait]
pub trait ExternalRecorder: Send + Sync {
    async fn is_running(&self) -> Result<bool>;
    async fn launch(&self) -> Result<()>;
    async fn connect(&self) -> Result<()>;
    async fn setup(&self) -> Result<()>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self) -> Result<Option<PathBuf>>;
    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;
    async fn start_virtual_camera(&self) -> Result<()>;
    async fn stop_virtual_camera(&self) -> Result<()>;
    async fn is_virtual_camera_active(&self) -> Result<bool>;

    fn subscribe(&self, listener: RecorderListener);
}

struct Listeners(SyncRwLock<Vec<RecorderListener>>);

impl Listeners {
    fn new() -> Self {
        Self(SyncRwLock::new(Vec::new()))
    }

    fn notify(&self, change: RecorderStateChange) {
        for listener in self.0.read().iter() {
            listener(change);
        }
    }

    fn subscribe(&self, listener: RecorderListener) {
        self.0.write().push(listener);
    }
}

/// Controls OBS Studio over `obs-websocket` v5 (§6), the same protocol the
/// original implementation drives via the `obswebsocket` Python library.
pub struct ObsRecorder {
    executable_path: PathBuf,
    host: String,
    port: u16,
    password: Option<String>,
    client: RwLock<Option<obws::Client>>,
    listeners: Listeners,
}

impl ObsRecorder {
    pub fn new(executable_path: PathBuf, host: impl Into<String>, port: u16, password: Option<String>) -> Self {
        Self {
            executable_path,
            host: host.into(),
            port,
            password,
            client: RwLock::new(None),
            listeners: Listeners::new(),
        }
    }

}

#[async_trait]
impl ExternalRecorder for ObsRecorder {
    async fn is_running(&self) -> Result<bool> {
        Ok(self.client.read().await.is_some())
    }

    async fn launch(&self) -> Result<()> {
        info!(path = %self.executable_path.display(), "launching OBS");
        tokio::process::Command::new(&self.executable_path)
            .spawn()
            .map_err(ExternalError::Io)?;
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        if self.client.read().await.is_some() {
            return Ok(());
        }
        if !self.is_running().await? {
            self.launch().await?;
        }
        let client = obws::Client::connect(&self.host, self.port, self.password.clone())
            .await
            .map_err(|e| ExternalError::Connection(e.to_string()))?;
        *self.client.write().await = Some(client);
        Ok(())
    }

    async fn setup(&self) -> Result<()> {
        self.connect().await
    }

    async fn start(&self) -> Result<()> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(|| ExternalError::Connection("not connected".into()))?;
        client.recording().start().await.map_err(|e| ExternalError::Connection(e.to_string()))?;
        drop(guard);
        self.listeners.notify(RecorderStateChange::Started);
        Ok(())
    }

    async fn stop(&self) -> Result<Option<PathBuf>> {
        let guard = self.client.read().await;
        let result = match guard.as_ref() {
            Some(client) => client
                .recording()
                .stop()
                .await
                .map(|status| PathBuf::from(status.output_path))
                .map_err(|e| ExternalError::Connection(e.to_string())),
            None => Err(ExternalError::Connection("not connected".into())),
        };
        drop(guard);
        self.listeners.notify(RecorderStateChange::Stopped);
        match result {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                warn!(error = %e, "OBS stop failed");
                Ok(None)
            }
        }
    }

    async fn pause(&self) -> Result<()> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(|| ExternalError::Connection("not connected".into()))?;
        client.recording().pause().await.map_err(|e| ExternalError::Connection(e.to_string()))?;
        drop(guard);
        self.listeners.notify(RecorderStateChange::Paused);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(|| ExternalError::Connection("not connected".into()))?;
        client.recording().resume().await.map_err(|e| ExternalError::Connection(e.to_string()))?;
        drop(guard);
        self.listeners.notify(RecorderStateChange::Resumed);
        Ok(())
    }

    async fn start_virtual_camera(&self) -> Result<()> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(|| ExternalError::Connection("not connected".into()))?;
        client.virtual_cam().start().await.map_err(|e| ExternalError::Connection(e.to_string()))
    }

    async fn stop_virtual_camera(&self) -> Result<()> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(|| ExternalError::Connection("not connected".into()))?;
        client.virtual_cam().stop().await.map_err(|e| ExternalError::Connection(e.to_string()))
    }

    async fn is_virtual_camera_active(&self) -> Result<bool> {
        let guard = self.client.read().await;
        let client = guard.as_ref().ok_or_else(|| ExternalError::Connection("not connected".into()))?;
        client
            .virtual_cam()
            .status()
            .await
            .map(|s| s.active)
            .map_err(|e| ExternalError::Connection(e.to_string()))
    }

    fn subscribe(&self, listener: RecorderListener) {
        self.listeners.subscribe(listener);
    }
}

/// In-memory recorder for tests and dry runs: tracks state transitions but
/// never shells out or opens a socket.
pub struct MockRecorder {
    running: RwLock<bool>,
    paused: RwLock<bool>,
    listeners: Listeners,
}

impl MockRecorder {
    pub fn new() -> Self {
        Self { running: RwLock::new(false), paused: RwLock::new(false), listeners: Listeners::new() }
    }
}

impl Default for MockRecorder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExternalRecorder for MockRecorder {
    async fn is_running(&self) -> Result<bool> {
        Ok(*self.running.read().await)
    }

    async fn launch(&self) -> Result<()> {
        *self.running.write().await = true;
        Ok(())
    }

    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    async fn start(&self) -> Result<()> {
        *self.running.write().await = true;
        *self.paused.write().await = false;
        self.listeners.notify(RecorderStateChange::Started);
        Ok(())
    }

    async fn stop(&self) -> Result<Option<PathBuf>> {
        *self.running.write().await = false;
        self.listeners.notify(RecorderStateChange::Stopped);
        Ok(Some(PathBuf::from("/tmp/mock-recording.mp4")))
    }

    async fn pause(&self) -> Result<()> {
        *self.paused.write().await = true;
        self.listeners.notify(RecorderStateChange::Paused);
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        *self.paused.write().await = false;
        self.listeners.notify(RecorderStateChange::Resumed);
        Ok(())
    }

    async fn start_virtual_camera(&self) -> Result<()> {
        Ok(())
    }

    async fn stop_virtual_camera(&self) -> Result<()> {
        Ok(())
    }

    async fn is_virtual_camera_active(&self) -> Result<bool> {
        Ok(false)
    }

    fn subscribe(&self, listener: RecorderListener) {
        self.listeners.subscribe(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn mock_recorder_notifies_listeners_on_start_stop() {
        let recorder = MockRecorder::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        recorder.subscribe(Arc::new(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        recorder.start().await.unwrap();
        recorder.stop().await.unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn mock_recorder_reports_running_state() {
        let recorder = MockRecorder::new();
        assert!(!recorder.is_running().await.unwrap());
        recorder.start().await.unwrap();
        assert!(recorder.is_running().await.unwrap());
    }
}
