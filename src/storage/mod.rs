//! Asset repository (§4.6): a completed recording is a quadruple of sibling
//! files sharing one basename — video, optional `.srt`, optional `.png`
//! screenshot, and a `.json` metadata sidecar. Grounded on the teacher's
//! `storage/mod.rs` (plain `std::fs`, one `StorageError` enum, no database)
//! and `original_source`'s `video_asset_repo.py`, which this restructures
//! away from a game-directory-per-clip model toward the flat,
//! basename-keyed layout the spec calls for.

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{Frame, GameResult, Judgement, RecordingMetadata, VideoAsset};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("video not found: {0}")]
    NotFound(PathBuf),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// File-system-backed `VideoAsset` repository rooted at two directories: one
/// for raw recordings (C5's hand-off target), one for the post-match
/// editor's output (C9's hand-off target).
pub struct AssetRepository {
    recorded_dir: PathBuf,
    edited_dir: PathBuf,
}

impl AssetRepository {
    pub fn new(recorded_dir: impl Into<PathBuf>, edited_dir: impl Into<PathBuf>) -> Result<Self> {
        let recorded_dir = recorded_dir.into();
        let edited_dir = edited_dir.into();
        fs::create_dir_all(&recorded_dir)?;
        fs::create_dir_all(&edited_dir)?;
        Ok(Self { recorded_dir, edited_dir })
    }

    pub fn recorded_dir(&self) -> &Path {
        &self.recorded_dir
    }

    pub fn edited_dir(&self) -> &Path {
        &self.edited_dir
    }

    /// `<YYYYMMDD_HHMMSS>` for Salmon Run, extended with
    /// `_<match>_<rule>_<judgement>_<stage>` for a battle (§4.6).
    fn base_name(metadata: &RecordingMetadata) -> String {
        let timestamp = metadata.started_at.format("%Y%m%d_%H%M%S");
        match &metadata.result {
            Some(GameResult::Battle(battle)) => {
                let judgement = metadata.judgement.map(|j| j.to_string()).unwrap_or_default();
                format!(
                    "{timestamp}_{}_{}_{judgement}_{}",
                    battle.match_.value(),
                    battle.rule.value(),
                    battle.stage.value()
                )
            }
            _ => timestamp.to_string(),
        }
    }

    /// Moves `video` and writes its sidecars under `recorded_dir` (§4.6
    /// save steps 1-5). Write order: video, screenshot, subtitle, metadata —
    /// the metadata sidecar is the last file touched, so a listing that
    /// finds one can trust the other three are already in place.
    pub fn save_recording(
        &self,
        video: PathBuf,
        subtitle: Option<&str>,
        screenshot: Option<&Frame>,
        metadata: &RecordingMetadata,
    ) -> Result<VideoAsset> {
        let base = Self::base_name(metadata);
        let ext = video.extension().and_then(|e| e.to_str()).unwrap_or("mkv");
        let target = self.recorded_dir.join(format!("{base}.{ext}"));

        let final_video = match fs::rename(&video, &target) {
            Ok(()) => target.clone(),
            Err(err) => {
                warn!(?err, from = %video.display(), to = %target.display(), "failed to move recording, keeping source path");
                video.clone()
            }
        };

        let thumbnail = if let Some(frame) = screenshot {
            let png_path = self.recorded_dir.join(format!("{base}.png"));
            match frame.to_rgb_image().save(&png_path) {
                Ok(()) => Some(png_path),
                Err(err) => {
                    warn!(?err, path = %png_path.display(), "failed to write result screenshot");
                    None
                }
            }
        } else {
            None
        };

        let subtitle_path = subtitle.map(|srt| {
            let path = self.recorded_dir.join(format!("{base}.srt"));
            if let Err(err) = fs::write(&path, srt) {
                warn!(?err, path = %path.display(), "failed to write subtitle sidecar");
            }
            path
        });

        let metadata_path = self.recorded_dir.join(format!("{base}.json"));
        fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata.to_sidecar_json())?)?;

        info!(path = %final_video.display(), "saved recording");
        Ok(VideoAsset {
            video: final_video,
            subtitle: subtitle_path,
            thumbnail,
            metadata: Some(metadata.clone()),
        })
    }

    /// One `VideoAsset` per `*.mkv` under `recorded_dir`. Sidecars are
    /// loaded opportunistically — a missing or unparseable one just leaves
    /// the corresponding field `None` rather than failing the listing
    /// (§4.6 atomicity note).
    pub fn list_recordings(&self) -> Result<Vec<VideoAsset>> {
        let mut assets = Vec::new();
        for entry in fs::read_dir(&self.recorded_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("mkv") {
                assets.push(self.load_asset(path));
            }
        }
        assets.sort_by_key(|a| a.video.clone());
        Ok(assets)
    }

    fn load_asset(&self, video: PathBuf) -> VideoAsset {
        let subtitle = video.with_extension("srt");
        let subtitle = subtitle.exists().then_some(subtitle);
        let thumbnail = video.with_extension("png");
        let thumbnail = thumbnail.exists().then_some(thumbnail);

        let metadata_path = video.with_extension("json");
        let metadata = fs::read_to_string(&metadata_path)
            .ok()
            .and_then(|text| serde_json::from_str::<Value>(&text).ok())
            .and_then(|value| RecordingMetadata::from_sidecar_json(&value))
            .or_else(|| {
                if metadata_path.exists() {
                    warn!(path = %metadata_path.display(), "metadata sidecar present but unparseable");
                }
                None
            });

        VideoAsset { video, subtitle, thumbnail, metadata }
    }

    /// Removes the video and whichever of its three sidecars exist.
    pub fn delete_recording(&self, video: &Path) -> Result<()> {
        if !video.exists() {
            return Err(StorageError::NotFound(video.to_path_buf()));
        }
        fs::remove_file(video)?;
        for ext in ["srt", "png", "json"] {
            let sidecar = video.with_extension(ext);
            if sidecar.exists() {
                fs::remove_file(sidecar)?;
            }
        }
        info!(path = %video.display(), "deleted recording");
        Ok(())
    }

    /// Moves an edited output (no sidecars — C9 embeds metadata/subtitle/
    /// thumbnail directly into the video via the external video editor) into
    /// `edited_dir`, keeping the source path if the move fails.
    pub fn save_edited(&self, video: PathBuf) -> Result<PathBuf> {
        let name = video.file_name().ok_or_else(|| StorageError::NotFound(video.clone()))?;
        let target = self.edited_dir.join(name);
        match fs::rename(&video, &target) {
            Ok(()) => {
                info!(path = %target.display(), "saved edited recording");
                Ok(target)
            }
            Err(err) => {
                warn!(?err, from = %video.display(), to = %target.display(), "failed to move edited recording, keeping source path");
                Ok(video)
            }
        }
    }

    pub fn list_edited(&self) -> Result<Vec<PathBuf>> {
        let mut videos = Vec::new();
        for entry in fs::read_dir(&self.edited_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("mkv") {
                videos.push(path);
            }
        }
        videos.sort();
        Ok(videos)
    }

    pub fn delete_edited(&self, video: &Path) -> Result<()> {
        if !video.exists() {
            return Err(StorageError::NotFound(video.to_path_buf()));
        }
        fs::remove_file(video)?;
        Ok(())
    }

    /// Looks a recording up by its basename, the `id` the HTTP boundary (C8)
    /// addresses assets by.
    pub fn find_recording(&self, id: &str) -> Result<VideoAsset> {
        self.list_recordings()?
            .into_iter()
            .find(|asset| asset.base_name() == Some(id))
            .ok_or_else(|| StorageError::NotFound(self.recorded_dir.join(id)))
    }

    pub fn delete_recording_by_id(&self, id: &str) -> Result<()> {
        let asset = self.find_recording(id)?;
        self.delete_recording(&asset.video)
    }

    pub fn update_metadata(&self, id: &str, metadata: &RecordingMetadata) -> Result<()> {
        let asset = self.find_recording(id)?;
        let metadata_path = asset.video.with_extension("json");
        fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata.to_sidecar_json())?)?;
        Ok(())
    }

    pub fn write_subtitle(&self, id: &str, text: &str) -> Result<()> {
        let asset = self.find_recording(id)?;
        let subtitle_path = asset.video.with_extension("srt");
        fs::write(&subtitle_path, text)?;
        Ok(())
    }

    pub fn read_subtitle(&self, id: &str) -> Result<Option<String>> {
        let asset = self.find_recording(id)?;
        match asset.subtitle {
            Some(path) => Ok(Some(fs::read_to_string(path)?)),
            None => Ok(None),
        }
    }

    pub fn delete_edited_by_name(&self, name: &str) -> Result<()> {
        let video = self
            .list_edited()?
            .into_iter()
            .find(|path| path.file_stem().and_then(|s| s.to_str()) == Some(name))
            .ok_or_else(|| StorageError::NotFound(self.edited_dir.join(name)))?;
        self.delete_edited(&video)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BattleResult, GameMode, Match, Rule, Stage};
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    fn battle_metadata() -> RecordingMetadata {
        let mut meta = RecordingMetadata::new(GameMode::Battle, Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap());
        meta.judgement = Some(Judgement::Win);
        meta.result =
            Some(GameResult::Battle(BattleResult::new(Match::X, Rule::Rainmaker, Stage::ScorchGorge, 10, 3, 4).unwrap()));
        meta
    }

    #[test]
    fn save_recording_writes_all_four_files() {
        let dir = tempdir().unwrap();
        let repo = AssetRepository::new(dir.path().join("recorded"), dir.path().join("edited")).unwrap();

        let src_video = dir.path().join("input.mkv");
        fs::write(&src_video, b"fake video").unwrap();

        let metadata = battle_metadata();
        let asset = repo.save_recording(src_video, Some("1\n00:00:00,000 --> 00:00:01,000\nhi\n"), None, &metadata).unwrap();

        assert!(asset.video.exists());
        assert!(asset.subtitle.unwrap().exists());
        assert_eq!(asset.video.extension().unwrap(), "mkv");
        let stem = asset.video.file_stem().unwrap().to_str().unwrap();
        assert!(stem.contains("WIN"));
        assert!(asset.video.with_extension("json").exists());
    }

    #[test]
    fn list_recordings_loads_sidecar_metadata() {
        let dir = tempdir().unwrap();
        let repo = AssetRepository::new(dir.path().join("recorded"), dir.path().join("edited")).unwrap();
        let src_video = dir.path().join("input.mkv");
        fs::write(&src_video, b"fake video").unwrap();
        repo.save_recording(src_video, None, None, &battle_metadata()).unwrap();

        let assets = repo.list_recordings().unwrap();
        assert_eq!(assets.len(), 1);
        let loaded = assets[0].metadata.as_ref().unwrap();
        assert_eq!(loaded.judgement, Some(Judgement::Win));
        match loaded.result.as_ref().unwrap() {
            GameResult::Battle(b) => assert_eq!(b.kill, 10),
            _ => panic!("expected battle result"),
        }
    }

    #[test]
    fn listing_tolerates_missing_sidecars() {
        let dir = tempdir().unwrap();
        let repo = AssetRepository::new(dir.path().join("recorded"), dir.path().join("edited")).unwrap();
        fs::write(repo.recorded_dir().join("20250101_000000.mkv"), b"video only").unwrap();

        let assets = repo.list_recordings().unwrap();
        assert_eq!(assets.len(), 1);
        assert!(assets[0].metadata.is_none());
        assert!(assets[0].subtitle.is_none());
    }

    #[test]
    fn delete_recording_removes_all_sidecars() {
        let dir = tempdir().unwrap();
        let repo = AssetRepository::new(dir.path().join("recorded"), dir.path().join("edited")).unwrap();
        let src_video = dir.path().join("input.mkv");
        fs::write(&src_video, b"fake video").unwrap();
        let asset = repo.save_recording(src_video, Some("srt"), None, &battle_metadata()).unwrap();

        let video_path = asset.video.clone();
        repo.delete_recording(&video_path).unwrap();
        assert!(!video_path.exists());
        assert!(!video_path.with_extension("srt").exists());
        assert!(!video_path.with_extension("json").exists());
    }

    #[test]
    fn delete_missing_recording_errors() {
        let dir = tempdir().unwrap();
        let repo = AssetRepository::new(dir.path().join("recorded"), dir.path().join("edited")).unwrap();
        assert!(repo.delete_recording(&dir.path().join("nope.mkv")).is_err());
    }
}
