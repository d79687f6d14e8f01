use async_trait::async_trait;
use image::GrayImage;
use rusty_tesseract::{Args, Image};

/// Tesseract page-segmentation modes the analyzer cares about (§6), mapped
/// to tesseract's own `--psm` integers in `TesseractOcr`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSegMode {
    Auto,
    SingleColumn,
    SingleLine,
    SingleWord,
    SingleBlock,
    SingleChar,
}

impl PageSegMode {
    fn psm_code(self) -> &'static str {
        match self {
            PageSegMode::Auto => "3",
            PageSegMode::SingleColumn => "4",
            PageSegMode::SingleLine => "7",
            PageSegMode::SingleWord => "8",
            PageSegMode::SingleBlock => "6",
            PageSegMode::SingleChar => "10",
        }
    }
}

/// Text recognition over a single grayscale image region (§6). Returns
/// `None` on any recognition failure — callers never see a raised error
/// from a bad OCR attempt, only an absent result.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    async fn recognize_text(
        &self,
        image: &GrayImage,
        psm: Option<PageSegMode>,
        whitelist: Option<&str>,
    ) -> Option<String>;
}

/// Shells out to the system `tesseract` binary via `rusty-tesseract`,
/// mirroring the original implementation's `tesseract_ocr.py` CLI adapter
/// and the teacher's own subprocess-shelling idiom for FFmpeg.
pub struct TesseractOcr;

impl TesseractOcr {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn recognize_text(
        &self,
        image: &GrayImage,
        psm: Option<PageSegMode>,
        whitelist: Option<&str>,
    ) -> Option<String> {
        let dynamic = image::DynamicImage::ImageLuma8(image.clone());
        let whitelist = whitelist.map(|s| s.to_string());
        let psm_code = psm.unwrap_or(PageSegMode::Auto).psm_code().to_string();

        tokio::task::spawn_blocking(move || {
            let tess_image = Image::from_dynamic_image(&dynamic).ok()?;
            let mut config_variables = std::collections::HashMap::new();
            if let Some(chars) = whitelist {
                config_variables.insert("tessedit_char_whitelist".to_string(), chars);
            }
            let args = Args {
                lang: "eng".to_string(),
                config_variables,
                dpi: Some(300),
                psm: psm_code.parse().ok(),
                oem: Some(3),
            };
            rusty_tesseract::image_to_string(&tess_image, &args).ok()
        })
        .await
        .ok()
        .flatten()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    }
}

/// Fixed-answer OCR for tests: returns whatever was configured regardless of
/// the image content.
pub struct MockOcrEngine {
    pub response: Option<String>,
}

impl MockOcrEngine {
    pub fn always(response: impl Into<String>) -> Self {
        Self { response: Some(response.into()) }
    }

    pub fn never() -> Self {
        Self { response: None }
    }
}

#[async_trait]
impl OcrEngine for MockOcrEngine {
    async fn recognize_text(
        &self,
        _image: &GrayImage,
        _psm: Option<PageSegMode>,
        _whitelist: Option<&str>,
    ) -> Option<String> {
        self.response.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_ocr_returns_configured_response() {
        let engine = MockOcrEngine::always("12");
        let img = GrayImage::new(4, 4);
        let result = engine.recognize_text(&img, Some(PageSegMode::SingleLine), Some("0123456789")).await;
        assert_eq!(result.as_deref(), Some("12"));
    }
}
