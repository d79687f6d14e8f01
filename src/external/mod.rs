//! Boundary adapters for everything the daemon doesn't implement itself
//! (§6): capture device, external recorder, OCR engine, video editor,
//! speech synthesis, and upload client. Each is a trait plus one real
//! adapter and one mock, concrete-struct-per-interface rather than a
//! trait-object hierarchy, matching the teacher's adapter style.

pub mod capture;
pub mod error;
pub mod ocr;
pub mod recorder;
pub mod speech;
pub mod subtitle;
pub mod upload;
pub mod video_editor;

pub use capture::{CaptureSource, MockCaptureSource};
pub use error::{ExternalError, Result};
pub use ocr::{MockOcrEngine, OcrEngine, PageSegMode, TesseractOcr};
pub use recorder::{ExternalRecorder, MockRecorder, ObsRecorder, RecorderListener, RecorderStateChange};
pub use speech::{MockSpeechSynthesis, SpeechRequest, SpeechSynthesis, SynthesizedSpeech};
pub use subtitle::{MockSubtitleCapture, SubtitleCapture};
pub use upload::{HttpUploadClient, MockUploadClient, PrivacyStatus, UploadClient, UploadedVideo};
pub use video_editor::{FfmpegVideoEditor, VideoEditor};

#[cfg(feature = "ndi")]
pub use capture::NdiCaptureSource;
