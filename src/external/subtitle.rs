use async_trait::async_trait;
use tokio::sync::Mutex;

use super::error::Result;

/// Live commentary capture running alongside a recording, started/paused in
/// lockstep with the external recorder and drained to SRT text on stop
/// (§4.5). Optional — the auto-recorder runs without one configured, same
/// as the original implementation's `Optional[SpeechTranscriberPort]`. No
/// concrete speech-recognition backend is pinned anywhere in the corpus, so
/// only the interface and a mock are provided here, same caveat as
/// `SpeechSynthesis`.
#[async_trait]
pub trait SubtitleCapture: Send + Sync {
    async fn start(&self) -> Result<()>;
    async fn pause(&self) -> Result<()>;
    async fn resume(&self) -> Result<()>;
    async fn stop(&self) -> Result<String>;
}

/// Accumulates a fixed line per `start`/`resume` cycle instead of running
/// real speech recognition; enough to exercise the auto-recorder's subtitle
/// hand-off in tests.
pub struct MockSubtitleCapture {
    lines: Mutex<Vec<String>>,
}

impl MockSubtitleCapture {
    pub fn new() -> Self {
        Self { lines: Mutex::new(Vec::new()) }
    }
}

impl Default for MockSubtitleCapture {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubtitleCapture for MockSubtitleCapture {
    async fn start(&self) -> Result<()> {
        self.lines.lock().await.push("1\n00:00:00,000 --> 00:00:01,000\n(mock commentary)\n".to_string());
        Ok(())
    }

    async fn pause(&self) -> Result<()> {
        Ok(())
    }

    async fn resume(&self) -> Result<()> {
        Ok(())
    }

    async fn stop(&self) -> Result<String> {
        Ok(self.lines.lock().await.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_accumulates_one_line_per_start() {
        let capture = MockSubtitleCapture::new();
        capture.start().await.unwrap();
        let srt = capture.stop().await.unwrap();
        assert!(srt.contains("-->"));
    }
}
