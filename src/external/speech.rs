use async_trait::async_trait;

use super::error::Result;

/// What to narrate, plus voice selection left to the adapter's own config.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    pub text: String,
    pub voice: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SynthesizedSpeech {
    /// PCM16 mono samples.
    pub audio: Vec<i16>,
    pub sample_rate_hz: u32,
}

/// Narration synthesis (§6), used by the post-match editor (C9) when a
/// recording is narrated before upload. No concrete TTS backend is pinned
/// anywhere in the corpus, so only the interface and a mock are provided;
/// wiring a real engine is a configuration-time choice, not a code change.
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    async fn synthesize(&self, request: SpeechRequest) -> Result<SynthesizedSpeech>;
}

/// Returns fixed silence of the requested-or-default duration; good enough
/// to exercise the editor pipeline in tests without a real TTS engine.
pub struct MockSpeechSynthesis {
    pub sample_rate_hz: u32,
}

impl Default for MockSpeechSynthesis {
    fn default() -> Self {
        Self { sample_rate_hz: 22_050 }
    }
}

#[async_trait]
impl SpeechSynthesis for MockSpeechSynthesis {
    async fn synthesize(&self, request: SpeechRequest) -> Result<SynthesizedSpeech> {
        let samples = (self.sample_rate_hz as usize / 2).max(request.text.len() * 100);
        Ok(SynthesizedSpeech { audio: vec![0i16; samples], sample_rate_hz: self.sample_rate_hz })
    }
}
