//! Kill/death/special OCR (§4.2): three fixed ROIs, a binarize → erode →
//! column-cluster pipeline, and a field-specific cluster-selection policy.

use image::{GrayImage, Luma};
use imageproc::contrast::otsu_level;
use imageproc::distance_transform::Norm;
use imageproc::morphology::erode;

use crate::domain::{Frame, Roi};
use crate::external::{OcrEngine, PageSegMode};

const UPSCALE_FACTOR: u32 = 3;
const PAD_PIXELS: u32 = 50;

/// One of the three scoreboard fields read after a battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdField {
    Kill,
    Death,
    Special,
}

/// A run of horizontally-contiguous occupied columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cluster {
    start: u32,
    end: u32,
}

impl Cluster {
    fn width(&self) -> u32 {
        self.end - self.start + 1
    }
}

fn preprocess(frame: &Frame, roi: Roi) -> GrayImage {
    let cropped = frame.crop(roi);
    let gray = cropped.to_gray_image();
    let upscaled = image::imageops::resize(
        &gray,
        gray.width() * UPSCALE_FACTOR,
        gray.height() * UPSCALE_FACTOR,
        image::imageops::FilterType::Triangle,
    );

    let padded_w = upscaled.width() + 2 * PAD_PIXELS;
    let padded_h = upscaled.height() + 2 * PAD_PIXELS;
    let mut padded = GrayImage::from_pixel(padded_w, padded_h, Luma([0]));
    image::imageops::overlay(&mut padded, &upscaled, PAD_PIXELS as i64, PAD_PIXELS as i64);

    let level = otsu_level(&padded);
    let mut binary = GrayImage::from_fn(padded_w, padded_h, |x, y| {
        Luma([if padded.get_pixel(x, y).0[0] >= level { 255 } else { 0 }])
    });
    binary = erode(&binary, Norm::LInf, 1);

    // Invert: digits become white-on-black after thresholding above turns
    // them dark-on-light depending on the source ROI's polarity.
    for px in binary.pixels_mut() {
        px.0[0] = 255 - px.0[0];
    }
    binary
}

fn column_clusters(binary: &GrayImage) -> Vec<Cluster> {
    let occupied: Vec<bool> = (0..binary.width())
        .map(|x| (0..binary.height()).any(|y| binary.get_pixel(x, y).0[0] > 0))
        .collect();

    let mut clusters = Vec::new();
    let mut run_start: Option<u32> = None;
    for (x, &on) in occupied.iter().enumerate() {
        let x = x as u32;
        match (on, run_start) {
            (true, None) => run_start = Some(x),
            (false, Some(start)) => {
                clusters.push(Cluster { start, end: x - 1 });
                run_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = run_start {
        clusters.push(Cluster { start, end: binary.width() - 1 });
    }
    clusters
}

/// Drops clusters that are both narrower than 40% of the widest cluster and
/// narrower than 12px absolute (§4.2's death/special/kill shared filter).
fn filter_noise_clusters(clusters: &[Cluster]) -> Vec<Cluster> {
    let Some(max_width) = clusters.iter().map(Cluster::width).max() else {
        return Vec::new();
    };
    clusters
        .iter()
        .copied()
        .filter(|c| c.width() as f64 >= 0.4 * max_width as f64 || c.width() >= 12)
        .collect()
}

fn crop_cluster(binary: &GrayImage, cluster: Cluster) -> GrayImage {
    let x = cluster.start;
    let w = cluster.width().max(1);
    image::imageops::crop_imm(binary, x, 0, w, binary.height()).to_image()
}

fn crop_range(binary: &GrayImage, start: u32, end: u32) -> GrayImage {
    let w = (end.saturating_sub(start) + 1).max(1);
    image::imageops::crop_imm(binary, start, 0, w, binary.height()).to_image()
}

/// Extracts the last maximal run of ASCII digits in `text`, matching the
/// spec's `(\d+)\D*$` trailing-digit regex without pulling in a regex
/// dependency for a single fixed pattern.
fn trailing_digits(text: &str) -> Option<String> {
    let mut end = text.len();
    let bytes = text.as_bytes();
    while end > 0 && !bytes[end - 1].is_ascii_digit() {
        end -= 1;
    }
    if end == 0 {
        return None;
    }
    let mut start = end;
    while start > 0 && bytes[start - 1].is_ascii_digit() {
        start -= 1;
    }
    Some(text[start..end].to_string())
}

fn strip_leading_zeros(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// OCR-confusion values that are never accepted as a valid kill count even
/// though they pass [0, 99] (§4.2).
const KILL_CONFUSION_VALUES: [u8; 2] = [88, 0];

async fn ocr_digits(ocr: &dyn OcrEngine, image: &GrayImage, psm: PageSegMode) -> Option<u8> {
    let raw = ocr.recognize_text(image, Some(psm), Some("0123456789")).await?;
    let digits = trailing_digits(&raw)?;
    let stripped = strip_leading_zeros(&digits);
    let mut value: u32 = stripped.parse().ok()?;
    if stripped.len() == 3 && value >= 100 {
        // Three-digit reads ≥100 are impossible by domain rule; drop the
        // leading digit and reinterpret the remaining two.
        value %= 100;
    }
    u8::try_from(value).ok()
}

/// Reads the `death` or `special` field: a single tall cluster expected,
/// with noisy narrow clusters dropped first.
async fn extract_single_cluster_field(
    frame: &Frame,
    roi: Roi,
    ocr: &dyn OcrEngine,
) -> Option<u8> {
    let binary = preprocess(frame, roi);
    let clusters = column_clusters(&binary);
    let valid = filter_noise_clusters(&clusters);

    let crop = if valid.len() >= 2 {
        let start = valid.iter().map(|c| c.start).min()?;
        let end = valid.iter().map(|c| c.end).max()?;
        crop_range(&binary, start, end)
    } else if let Some(last) = clusters.last() {
        crop_cluster(&binary, *last)
    } else {
        return None;
    };

    ocr_digits(ocr, &crop, PageSegMode::SingleLine).await
}

/// Reads the `kill` field: one or two digits, each OCR'd independently when
/// exactly two valid clusters survive noise filtering (§4.2).
async fn extract_kill_field(frame: &Frame, roi: Roi, ocr: &dyn OcrEngine) -> Option<u8> {
    let binary = preprocess(frame, roi);
    let clusters = column_clusters(&binary);
    let valid = filter_noise_clusters(&clusters);

    if valid.len() == 2 {
        let first = ocr_digits_single_char(ocr, &crop_cluster(&binary, valid[0])).await;
        let second = ocr_digits_single_char(ocr, &crop_cluster(&binary, valid[1])).await;
        if let (Some(a), Some(b)) = (first, second) {
            let value = a * 10 + b;
            if value <= 99 && !KILL_CONFUSION_VALUES.contains(&value) {
                return Some(value);
            }
        }
    }

    let value = ocr_digits(ocr, &binary, PageSegMode::SingleLine).await?;
    (value <= 99 && !KILL_CONFUSION_VALUES.contains(&value)).then_some(value)
}

async fn ocr_digits_single_char(ocr: &dyn OcrEngine, image: &GrayImage) -> Option<u8> {
    let raw = ocr.recognize_text(image, Some(PageSegMode::SingleChar), Some("0123456789")).await?;
    let digit = raw.trim().chars().next()?;
    digit.to_digit(10).map(|d| d as u8)
}

/// Selects which K/D/special pipeline runs. `Fast` skips the erode pass and
/// OCRs the full cluster range unconditionally — cheaper, unverified
/// against real footage, and not used by any default code path (open
/// question, see DESIGN.md).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KdOcrStrategy {
    #[default]
    Standard,
    Fast,
}

/// Reads all three scoreboard fields for a single ROI set. Fails the whole
/// extraction if any field cannot be parsed (§4.2).
pub async fn extract_kill_death_special(
    frame: &Frame,
    ocr: &dyn OcrEngine,
    kill_roi: Roi,
    death_roi: Roi,
    special_roi: Roi,
) -> Option<(u8, u8, u8)> {
    let kill = extract_kill_field(frame, kill_roi, ocr).await?;
    let death = extract_single_cluster_field(frame, death_roi, ocr).await?;
    let special = extract_single_cluster_field(frame, special_roi, ocr).await?;
    Some((kill, death, special))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_digits_extracts_numeric_tail() {
        assert_eq!(trailing_digits("K: 12x"), Some("12".to_string()));
        assert_eq!(trailing_digits("no digits here"), None);
        assert_eq!(trailing_digits("007"), Some("007".to_string()));
    }

    #[test]
    fn strip_leading_zeros_keeps_at_least_one_digit() {
        assert_eq!(strip_leading_zeros("007"), "7");
        assert_eq!(strip_leading_zeros("000"), "0");
    }

    #[test]
    fn column_clusters_finds_two_runs() {
        let mut img = GrayImage::from_pixel(20, 4, Luma([0]));
        for x in 2..5 {
            for y in 0..4 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        for x in 10..13 {
            for y in 0..4 {
                img.put_pixel(x, y, Luma([255]));
            }
        }
        let clusters = column_clusters(&img);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0], Cluster { start: 2, end: 4 });
        assert_eq!(clusters[1], Cluster { start: 10, end: 12 });
    }

    #[test]
    fn filter_noise_clusters_drops_narrow_runs() {
        let clusters = vec![Cluster { start: 0, end: 19 }, Cluster { start: 25, end: 26 }];
        let filtered = filter_noise_clusters(&clusters);
        assert_eq!(filtered.len(), 1);
    }
}
