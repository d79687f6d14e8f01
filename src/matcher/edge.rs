use image::GrayImage;
use imageproc::distance_transform::{distance_transform, Norm};
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;

use crate::domain::{Frame, Roi};

use super::basic::Matcher;

/// Canny thresholds fixed per §9's OpenCV-parity requirement.
const CANNY_LOW: f32 = 50.0;
const CANNY_HIGH: f32 = 150.0;
/// Gaussian blur sigma approximating OpenCV's 5x5 kernel ahead of Canny.
const BLUR_SIGMA: f32 = 1.1;

/// Edge-shape matcher: extracts Canny edges from both the template and the
/// frame region, then scores the template's edge pixels against an L2
/// (Euclidean) distance transform of the frame's edges — a chamfer match
/// (§9). Lower mean distance means a tighter shape match; `max_mean_distance`
/// is the matcher's pass/fail threshold in pixels.
pub struct EdgeMatcher {
    pub roi: Option<Roi>,
    pub template_edges: GrayImage,
    pub max_mean_distance: f64,
}

impl EdgeMatcher {
    /// Builds the template edge map once at load time from a reference
    /// grayscale image, so repeated matching only re-derives frame edges.
    pub fn prepare_template(reference: &GrayImage) -> GrayImage {
        let blurred = gaussian_blur_f32(reference, BLUR_SIGMA);
        canny(&blurred, CANNY_LOW, CANNY_HIGH)
    }

}

impl Matcher for EdgeMatcher {
    fn is_match(&self, frame: &Frame) -> bool {
        self.mean_chamfer_distance(frame).is_some_and(|d| d <= self.max_mean_distance)
    }
}

impl EdgeMatcher {
    fn mean_chamfer_distance(&self, frame: &Frame) -> Option<f64> {
        let region = match self.roi {
            Some(roi) => frame.crop(roi),
            None => frame.clone(),
        };
        let gray = region.to_gray_image();
        if gray.width() < self.template_edges.width() || gray.height() < self.template_edges.height()
        {
            return None;
        }
        let blurred = gaussian_blur_f32(&gray, BLUR_SIGMA);
        let frame_edges = canny(&blurred, CANNY_LOW, CANNY_HIGH);
        let distance_field = distance_transform(&frame_edges, Norm::L2);

        let mut total = 0.0f64;
        let mut count = 0u64;
        for (x, y, px) in self.template_edges.enumerate_pixels() {
            if px.0[0] == 0 {
                continue;
            }
            if x >= distance_field.width() || y >= distance_field.height() {
                continue;
            }
            total += distance_field.get_pixel(x, y).0[0] as f64;
            count += 1;
        }
        if count == 0 {
            return None;
        }
        Some(total / count as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn solid_gray(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn identical_shape_has_zero_distance() {
        let mut reference = solid_gray(20, 20, 0);
        for y in 5..15 {
            for x in 5..15 {
                reference.put_pixel(x, y, Luma([255]));
            }
        }
        let template_edges = EdgeMatcher::prepare_template(&reference);

        let data: Vec<u8> = reference
            .pixels()
            .flat_map(|p| [p.0[0], p.0[0], p.0[0]])
            .collect();
        let frame = Frame::new(reference.width(), reference.height(), data);

        let matcher = EdgeMatcher { roi: None, template_edges, max_mean_distance: 2.0 };
        assert!(matcher.is_match(&frame));
    }

    #[test]
    fn oversized_template_never_matches() {
        let template_edges = solid_gray(50, 50, 255);
        let frame = Frame::new(4, 4, vec![0u8; 4 * 4 * 3]);
        let matcher = EdgeMatcher { roi: None, template_edges, max_mean_distance: 100.0 };
        assert!(!matcher.is_match(&frame));
    }
}
