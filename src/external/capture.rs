use async_trait::async_trait;

use crate::domain::Frame;

use super::error::Result;

/// The video source the daemon captures from: an HDMI/NDI receiver sitting
/// between the game console and the recording software (§6). `capture`
/// returns `None` on transient failure — the caller's loop keeps running.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    async fn setup(&mut self) -> Result<()>;
    async fn capture(&mut self) -> Result<Option<Frame>>;
    async fn teardown(&mut self) -> Result<()>;
}

/// NDI-backed capture source. Requires the `ndi` feature and the NDI
/// runtime to be installed on the host; grounded on the original
/// implementation's `ndi_capture.py` adapter.
#[cfg(feature = "ndi")]
pub struct NdiCaptureSource {
    source_name: String,
    receiver: Option<grafton_ndi::Receiver>,
}

#[cfg(feature = "ndi")]
impl NdiCaptureSource {
    pub fn new(source_name: impl Into<String>) -> Self {
        Self { source_name: source_name.into(), receiver: None }
    }
}

#[cfg(feature = "ndi")]
#[async_trait]
impl CaptureSource for NdiCaptureSource {
    async fn setup(&mut self) -> Result<()> {
        let finder = grafton_ndi::Finder::new()
            .map_err(|e| super::error::ExternalError::Connection(e.to_string()))?;
        let source = finder
            .find_source(&self.source_name)
            .map_err(|e| super::error::ExternalError::Connection(e.to_string()))?;
        self.receiver = Some(
            grafton_ndi::Receiver::new(&source)
                .map_err(|e| super::error::ExternalError::Connection(e.to_string()))?,
        );
        Ok(())
    }

    async fn capture(&mut self) -> Result<Option<Frame>> {
        let Some(receiver) = self.receiver.as_mut() else {
            return Ok(None);
        };
        match receiver.receive_video() {
            Ok(Some(video)) => Ok(Some(Frame::new(video.width(), video.height(), video.into_bgr_bytes()))),
            Ok(None) => Ok(None),
            Err(e) => Err(super::error::ExternalError::Connection(e.to_string())),
        }
    }

    async fn teardown(&mut self) -> Result<()> {
        self.receiver = None;
        Ok(())
    }
}

/// In-memory capture source that replays a fixed sequence of frames, then
/// yields `None` forever. Used by tests and by the daemon's dry-run mode.
pub struct MockCaptureSource {
    frames: std::collections::VecDeque<Frame>,
}

impl MockCaptureSource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames: frames.into() }
    }
}

#[async_trait]
impl CaptureSource for MockCaptureSource {
    async fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    async fn capture(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }

    async fn teardown(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_capture_source_replays_then_yields_none() {
        let frame = Frame::new(1, 1, vec![0, 0, 0]);
        let mut source = MockCaptureSource::new(vec![frame]);
        source.setup().await.unwrap();
        assert!(source.capture().await.unwrap().is_some());
        assert!(source.capture().await.unwrap().is_none());
    }
}
