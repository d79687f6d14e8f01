use std::path::PathBuf;

use serde::Serialize;

use super::RecordingMetadata;

/// A completed recording as a quadruple on disk. `video` is required;
/// sidecars may be absent but never refer to a nonexistent video (§3
/// invariant 3).
#[derive(Debug, Clone, Serialize)]
pub struct VideoAsset {
    pub video: PathBuf,
    pub subtitle: Option<PathBuf>,
    pub thumbnail: Option<PathBuf>,
    pub metadata: Option<RecordingMetadata>,
}

impl VideoAsset {
    pub fn base_name(&self) -> Option<&str> {
        self.video.file_stem().and_then(|s| s.to_str())
    }
}
