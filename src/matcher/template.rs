use image::GrayImage;

use crate::domain::{Frame, Roi};

use super::basic::Matcher;

/// Grayscale template matched against a frame region via normalized
/// cross-correlation, OpenCV's `TM_CCOEFF_NORMED` (§9). Scoring can be
/// interrupted between rows by a cancellation check so a long match doesn't
/// block a newer request from superseding it (§4.3).
pub struct TemplateMatcher {
    pub roi: Option<Roi>,
    pub template: GrayImage,
    pub threshold: f64,
}

impl Matcher for TemplateMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        self.score(frame, &mut || false).unwrap_or(0.0) >= self.threshold
    }
}

impl TemplateMatcher {
    /// Best normalized cross-correlation score of `self.template` anywhere
    /// inside the (optionally ROI-cropped) frame. Returns `None` if a
    /// `cancelled` check fires first or the template doesn't fit.
    pub fn score(&self, frame: &Frame, cancelled: &mut dyn FnMut() -> bool) -> Option<f64> {
        let region = match self.roi {
            Some(roi) => frame.crop(roi),
            None => frame.clone(),
        };
        let hay = region.to_gray_image();
        normalized_cross_correlation(&hay, &self.template, cancelled)
    }
}

/// Slides `template` over `haystack`, returning the maximum normalized
/// cross-correlation coefficient in `[-1.0, 1.0]` (matching OpenCV's
/// `TM_CCOEFF_NORMED`), or `None` if cancelled mid-scan or the template is
/// larger than the haystack.
pub fn normalized_cross_correlation(
    haystack: &GrayImage,
    template: &GrayImage,
    cancelled: &mut dyn FnMut() -> bool,
) -> Option<f64> {
    let (hw, hh) = haystack.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > hw || th > hh {
        return None;
    }

    let t_mean = mean(template);
    let mut t_centered = Vec::with_capacity((tw * th) as usize);
    let mut t_sq_sum = 0.0f64;
    for px in template.pixels() {
        let v = px.0[0] as f64 - t_mean;
        t_centered.push(v);
        t_sq_sum += v * v;
    }
    if t_sq_sum <= f64::EPSILON {
        // Flat template: correlation is undefined in OpenCV too (divide by
        // zero guarded against); treat as no match.
        return Some(0.0);
    }

    let mut best = f64::MIN;
    for y in 0..=(hh - th) {
        if cancelled() {
            return None;
        }
        for x in 0..=(hw - tw) {
            let window_mean = mean_window(haystack, x, y, tw, th);
            let mut numerator = 0.0f64;
            let mut window_sq_sum = 0.0f64;
            for (i, ty) in (0..th).enumerate() {
                for tx in 0..tw {
                    let h_val = haystack.get_pixel(x + tx, y + ty).0[0] as f64 - window_mean;
                    let t_val = t_centered[i * tw as usize + tx as usize];
                    numerator += h_val * t_val;
                    window_sq_sum += h_val * h_val;
                }
            }
            if window_sq_sum <= f64::EPSILON {
                continue;
            }
            let score = numerator / (window_sq_sum * t_sq_sum).sqrt();
            if score > best {
                best = score;
            }
        }
    }
    Some(if best == f64::MIN { 0.0 } else { best })
}

fn mean(img: &GrayImage) -> f64 {
    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / (img.width() * img.height()).max(1) as f64
}

fn mean_window(img: &GrayImage, x0: u32, y0: u32, w: u32, h: u32) -> f64 {
    let mut sum = 0u64;
    for y in y0..y0 + h {
        for x in x0..x0 + w {
            sum += img.get_pixel(x, y).0[0] as u64;
        }
    }
    sum as f64 / (w * h).max(1) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn uniform(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn identical_template_scores_near_one() {
        let mut haystack = uniform(10, 10, 50);
        for y in 3..6 {
            for x in 3..6 {
                haystack.put_pixel(x, y, Luma([200]));
            }
        }
        let template = haystack.view(3, 3, 3, 3).to_image();
        let score = normalized_cross_correlation(&haystack, &template, &mut || false).unwrap();
        assert!(score > 0.99, "expected near-perfect match, got {score}");
    }

    #[test]
    fn cancellation_short_circuits() {
        let haystack = uniform(20, 20, 50);
        let template = uniform(3, 3, 50);
        let mut calls = 0;
        let result = normalized_cross_correlation(&haystack, &template, &mut || {
            calls += 1;
            calls > 1
        });
        assert!(result.is_none());
    }

    #[test]
    fn oversized_template_has_no_score() {
        let haystack = uniform(4, 4, 10);
        let template = uniform(8, 8, 10);
        assert!(normalized_cross_correlation(&haystack, &template, &mut || false).is_none());
    }
}
