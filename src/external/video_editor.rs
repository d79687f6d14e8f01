use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

use super::error::{ExternalError, Result};

/// The FFmpeg-shell video editor (§6), grounded directly on the teacher's
/// `video/processor.rs`: every operation runs `ffmpeg`/`ffprobe` as a child
/// process and maps a nonzero exit or missing output file to a `None`/error,
/// never a panic.
#[async_trait]
pub trait VideoEditor: Send + Sync {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<bool>;
    async fn embed_metadata(&self, video: &Path, metadata: &serde_json::Value) -> Result<bool>;
    async fn get_metadata(&self, video: &Path) -> Result<Option<serde_json::Value>>;
    async fn embed_subtitle(&self, video: &Path, subtitle: &Path, output: &Path) -> Result<bool>;
    async fn get_subtitle(&self, video: &Path) -> Result<Option<String>>;
    async fn embed_thumbnail(&self, video: &Path, thumbnail: &Path) -> Result<bool>;
    async fn get_thumbnail(&self, video: &Path, output: &Path, at_seconds: f64) -> Result<bool>;
    async fn change_volume(&self, video: &Path, output: &Path, factor: f64) -> Result<bool>;
    async fn get_video_length(&self, video: &Path) -> Result<Option<f64>>;
    async fn add_audio_track(&self, video: &Path, audio: &Path, output: &Path) -> Result<bool>;
    async fn list_video_devices(&self) -> Result<Vec<String>>;
}

/// Runs `ffmpeg`/`ffprobe` from `PATH`. Mirrors `VideoProcessor`'s
/// `-y`-overwrite, verify-output-exists style.
pub struct FfmpegVideoEditor {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl FfmpegVideoEditor {
    pub fn new() -> Self {
        Self { ffmpeg_path: "ffmpeg".to_string(), ffprobe_path: "ffprobe".to_string() }
    }

    async fn run(&self, args: &[&str]) -> Result<bool> {
        info!(?args, "running ffmpeg");
        let status = Command::new(&self.ffmpeg_path)
            .args(args)
            .status()
            .await
            .map_err(ExternalError::Io)?;
        if !status.success() {
            warn!(?status, "ffmpeg exited non-zero");
        }
        Ok(status.success())
    }
}

impl Default for FfmpegVideoEditor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoEditor for FfmpegVideoEditor {
    async fn merge(&self, inputs: &[PathBuf], output: &Path) -> Result<bool> {
        if inputs.is_empty() {
            return Ok(false);
        }
        let list_file = output.with_extension("concat.txt");
        let manifest = inputs
            .iter()
            .map(|p| format!("file '{}'", p.display()))
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(&list_file, manifest).await.map_err(ExternalError::Io)?;
        let ok = self
            .run(&[
                "-y",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
                list_file.to_str().unwrap_or_default(),
                "-c",
                "copy",
                output.to_str().unwrap_or_default(),
            ])
            .await?;
        let _ = tokio::fs::remove_file(&list_file).await;
        Ok(ok && output.exists())
    }

    async fn embed_metadata(&self, video: &Path, metadata: &serde_json::Value) -> Result<bool> {
        let tmp = video.with_extension("meta.tmp.mp4");
        let mut args = vec!["-y".to_string(), "-i".to_string(), video.to_string_lossy().to_string()];
        if let Some(obj) = metadata.as_object() {
            for (key, value) in obj {
                args.push("-metadata".to_string());
                args.push(format!("{key}={}", value.as_str().unwrap_or_default()));
            }
        }
        args.push("-codec".to_string());
        args.push("copy".to_string());
        args.push(tmp.to_string_lossy().to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let ok = self.run(&arg_refs).await?;
        if ok {
            tokio::fs::rename(&tmp, video).await.map_err(ExternalError::Io)?;
        }
        Ok(ok)
    }

    async fn get_metadata(&self, video: &Path) -> Result<Option<serde_json::Value>> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(video)
            .output()
            .await
            .map_err(ExternalError::Io)?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(serde_json::from_slice(&output.stdout).ok())
    }

    async fn embed_subtitle(&self, video: &Path, subtitle: &Path, output: &Path) -> Result<bool> {
        self.run(&[
            "-y",
            "-i",
            video.to_str().unwrap_or_default(),
            "-i",
            subtitle.to_str().unwrap_or_default(),
            "-c",
            "copy",
            "-c:s",
            "mov_text",
            output.to_str().unwrap_or_default(),
        ])
        .await
    }

    async fn get_subtitle(&self, video: &Path) -> Result<Option<String>> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-y", "-i"])
            .arg(video)
            .args(["-map", "0:s:0", "-f", "srt", "-"])
            .output()
            .await
            .map_err(ExternalError::Io)?;
        if !output.status.success() || output.stdout.is_empty() {
            return Ok(None);
        }
        Ok(Some(String::from_utf8_lossy(&output.stdout).to_string()))
    }

    async fn embed_thumbnail(&self, video: &Path, thumbnail: &Path) -> Result<bool> {
        let tmp = video.with_extension("thumb.tmp.mp4");
        let ok = self
            .run(&[
                "-y",
                "-i",
                video.to_str().unwrap_or_default(),
                "-i",
                thumbnail.to_str().unwrap_or_default(),
                "-map",
                "0",
                "-map",
                "1",
                "-c",
                "copy",
                "-disposition:v:1",
                "attached_pic",
                tmp.to_str().unwrap_or_default(),
            ])
            .await?;
        if ok {
            tokio::fs::rename(&tmp, video).await.map_err(ExternalError::Io)?;
        }
        Ok(ok)
    }

    async fn get_thumbnail(&self, video: &Path, output: &Path, at_seconds: f64) -> Result<bool> {
        self.run(&[
            "-y",
            "-ss",
            &at_seconds.to_string(),
            "-i",
            video.to_str().unwrap_or_default(),
            "-frames:v",
            "1",
            output.to_str().unwrap_or_default(),
        ])
        .await
    }

    async fn change_volume(&self, video: &Path, output: &Path, factor: f64) -> Result<bool> {
        self.run(&[
            "-y",
            "-i",
            video.to_str().unwrap_or_default(),
            "-filter:a",
            &format!("volume={factor}"),
            output.to_str().unwrap_or_default(),
        ])
        .await
    }

    async fn get_video_length(&self, video: &Path) -> Result<Option<f64>> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(video)
            .output()
            .await
            .map_err(ExternalError::Io)?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().parse::<f64>().ok())
    }

    async fn add_audio_track(&self, video: &Path, audio: &Path, output: &Path) -> Result<bool> {
        self.run(&[
            "-y",
            "-i",
            video.to_str().unwrap_or_default(),
            "-i",
            audio.to_str().unwrap_or_default(),
            "-c:v",
            "copy",
            "-c:a",
            "aac",
            "-shortest",
            output.to_str().unwrap_or_default(),
        ])
        .await
    }

    async fn list_video_devices(&self) -> Result<Vec<String>> {
        let output = Command::new(&self.ffmpeg_path)
            .args(["-f", "dshow", "-list_devices", "true", "-i", "dummy"])
            .output()
            .await
            .map_err(ExternalError::Io)?;
        let text = String::from_utf8_lossy(&output.stderr);
        Ok(text
            .lines()
            .filter(|l| l.contains("\""))
            .filter_map(|l| l.split('"').nth(1).map(String::from))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn editor_constructs_with_default_paths() {
        let editor = FfmpegVideoEditor::new();
        assert_eq!(editor.ffmpeg_path, "ffmpeg");
    }
}
