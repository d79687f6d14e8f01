use crate::domain::{Frame, Roi};

use super::color::{bgr_to_hsv, hsv_in_range};
use super::mask::Mask;

/// Something that can decide, for a single frame, whether a screen
/// condition holds (§4.1). Implementors apply their own ROI crop and mask.
pub trait Matcher: Send + Sync {
    fn is_match(&self, frame: &Frame) -> bool;
}

fn apply_roi<'a>(frame: &'a Frame, roi: Option<Roi>) -> std::borrow::Cow<'a, Frame> {
    match roi {
        Some(roi) => std::borrow::Cow::Owned(frame.crop(roi)),
        None => std::borrow::Cow::Borrowed(frame),
    }
}

/// Exact-digest matcher: no tolerance, used for pixel-perfect screens.
pub struct HashMatcher {
    pub roi: Option<Roi>,
    pub reference_digest: u64,
}

impl HashMatcher {
    pub(crate) fn digest(data: &[u8]) -> u64 {
        // FNV-1a 64-bit, deterministic and allocation-free.
        let mut hash: u64 = 0xcbf29ce484222325;
        for &b in data {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        hash
    }
}

impl Matcher for HashMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        let region = apply_roi(frame, self.roi);
        Self::digest(region.data()) == self.reference_digest
    }
}

/// Downsample threshold from §4.1: HSV/HSV-ratio matchers may subsample by
/// 2x once the ROI area reaches this size, as long as ratio semantics hold.
const SUBSAMPLE_AREA_THRESHOLD: u32 = 60 * 60;

fn hsv_pass_ratio(region: &Frame, mask: Option<&Mask>, lower: [u8; 3], upper: [u8; 3]) -> f64 {
    let step = if region.width() * region.height() >= SUBSAMPLE_AREA_THRESHOLD { 2 } else { 1 };
    let mut total = 0u64;
    let mut matched = 0u64;
    let mut y = 0;
    while y < region.height() {
        let mut x = 0;
        while x < region.width() {
            if mask.is_none_or(|m| m.contains(x, y)) {
                total += 1;
                let hsv = bgr_to_hsv(region.pixel_bgr(x, y));
                if hsv_in_range(hsv, lower, upper) {
                    matched += 1;
                }
            }
            x += step;
        }
        y += step;
    }
    if total == 0 {
        0.0
    } else {
        matched as f64 / total as f64
    }
}

/// HSV in-range ratio matcher, mask-aware; clips to the mask's tight
/// bounding box first when no explicit ROI is given (§4.1).
pub struct HsvMatcher {
    pub roi: Option<Roi>,
    pub mask: Option<Mask>,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
    pub threshold: f64,
}

impl Matcher for HsvMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        let roi = self.roi.or_else(|| self.mask.as_ref().and_then(|m| m.bounding_box()));
        let region = apply_roi(frame, roi);
        hsv_pass_ratio(&region, self.mask.as_ref(), self.lower, self.upper) >= self.threshold
    }
}

/// Same as `HsvMatcher` but always evaluated against the whole ROI, never a
/// mask (§4.1).
pub struct HsvRatioMatcher {
    pub roi: Option<Roi>,
    pub lower: [u8; 3],
    pub upper: [u8; 3],
    pub threshold: f64,
}

impl Matcher for HsvRatioMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        let region = apply_roi(frame, self.roi);
        hsv_pass_ratio(&region, None, self.lower, self.upper) >= self.threshold
    }
}

/// Exact BGR-equality ratio matcher.
pub struct RgbMatcher {
    pub roi: Option<Roi>,
    pub mask: Option<Mask>,
    pub reference: [u8; 3],
    pub threshold: f64,
}

impl Matcher for RgbMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        let region = apply_roi(frame, self.roi);
        let mut total = 0u64;
        let mut matched = 0u64;
        for y in 0..region.height() {
            for x in 0..region.width() {
                if self.mask.as_ref().is_none_or(|m| m.contains(x, y)) {
                    total += 1;
                    if region.pixel_bgr(x, y) == self.reference {
                        matched += 1;
                    }
                }
            }
        }
        if total == 0 {
            return false;
        }
        (matched as f64 / total as f64) >= self.threshold
    }
}

/// Standard deviation of hue over the mask must be at most `hue_threshold`.
pub struct UniformColorMatcher {
    pub roi: Option<Roi>,
    pub mask: Mask,
    pub hue_threshold: f64,
}

impl Matcher for UniformColorMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        let region = apply_roi(frame, self.roi);
        let mut hues = Vec::new();
        for y in 0..region.height().min(self.mask.height()) {
            for x in 0..region.width().min(self.mask.width()) {
                if self.mask.contains(x, y) {
                    hues.push(bgr_to_hsv(region.pixel_bgr(x, y))[0] as f64);
                }
            }
        }
        if hues.is_empty() {
            return false;
        }
        let mean = hues.iter().sum::<f64>() / hues.len() as f64;
        let variance = hues.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / hues.len() as f64;
        variance.sqrt() <= self.hue_threshold
    }
}

/// Maximum grayscale value over the mask lies in `[min_value, max_value]`.
pub struct BrightnessMatcher {
    pub roi: Option<Roi>,
    pub mask: Option<Mask>,
    pub min_value: Option<u8>,
    pub max_value: Option<u8>,
}

impl Matcher for BrightnessMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        let region = apply_roi(frame, self.roi);
        let gray = region.to_gray_image();
        let mut max_v = 0u8;
        let mut any = false;
        for (x, y, px) in gray.enumerate_pixels() {
            if self.mask.as_ref().is_none_or(|m| m.contains(x, y)) {
                any = true;
                max_v = max_v.max(px.0[0]);
            }
        }
        if !any {
            return false;
        }
        let min_ok = self.min_value.is_none_or(|min| max_v >= min);
        let max_ok = self.max_value.is_none_or(|max| max_v <= max);
        min_ok && max_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(w: u32, h: u32, bgr: [u8; 3]) -> Frame {
        let mut data = Vec::with_capacity((w * h * 3) as usize);
        for _ in 0..(w * h) {
            data.extend_from_slice(&bgr);
        }
        Frame::new(w, h, data)
    }

    #[test]
    fn hash_matcher_requires_exact_digest() {
        let frame = solid_frame(8, 8, [1, 2, 3]);
        let reference = solid_frame(8, 8, [1, 2, 3]);
        let matcher = HashMatcher {
            roi: None,
            reference_digest: HashMatcher::digest(reference.data()),
        };
        assert!(matcher.is_match(&frame));

        let different = solid_frame(8, 8, [9, 9, 9]);
        assert!(!matcher.is_match(&different));
    }

    #[test]
    fn hsv_matcher_passes_when_whole_roi_in_range() {
        // pure red in BGR
        let frame = solid_frame(10, 10, [0, 0, 255]);
        let matcher = HsvMatcher {
            roi: None,
            mask: None,
            lower: [0, 100, 100],
            upper: [10, 255, 255],
            threshold: 0.9,
        };
        assert!(matcher.is_match(&frame));
    }

    #[test]
    fn rgb_matcher_ratio_threshold() {
        let frame = solid_frame(4, 4, [10, 20, 30]);
        let matcher = RgbMatcher {
            roi: None,
            mask: None,
            reference: [10, 20, 30],
            threshold: 1.0,
        };
        assert!(matcher.is_match(&frame));

        let matcher_fail = RgbMatcher {
            roi: None,
            mask: None,
            reference: [255, 255, 255],
            threshold: 0.5,
        };
        assert!(!matcher_fail.is_match(&frame));
    }

    #[test]
    fn uniform_color_matcher_passes_solid_region() {
        let frame = solid_frame(4, 4, [10, 20, 30]);
        let mask = Mask::new(4, 4, vec![1u8; 16]);
        let matcher = UniformColorMatcher { roi: None, mask, hue_threshold: 1.0 };
        assert!(matcher.is_match(&frame));
    }

    #[test]
    fn brightness_matcher_checks_bounds() {
        let frame = solid_frame(4, 4, [200, 200, 200]);
        let matcher = BrightnessMatcher {
            roi: None,
            mask: None,
            min_value: Some(100),
            max_value: Some(255),
        };
        assert!(matcher.is_match(&frame));

        let matcher_fail = BrightnessMatcher {
            roi: None,
            mask: None,
            min_value: Some(250),
            max_value: None,
        };
        assert!(!matcher_fail.is_match(&frame));
    }
}
