use image::{GrayImage, Luma};
use imageproc::region_labelling::{connected_components, Connectivity};

use crate::domain::{Frame, Roi, SlotId};
use crate::matcher::color::{bgr_to_hsv, hsv_in_range};

/// HSV bounds as OpenCV represents them: hue in `[0, 180)`, saturation and
/// value in `[0, 255]`.
#[derive(Debug, Clone, Copy)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

/// Static calibration for the weapon-display overlay gate (§4.3). Slot
/// geometry and HSV/mask thresholds are placeholders pending real
/// calibration data (C10); the decision structure follows the spec exactly.
#[derive(Debug, Clone)]
pub struct WeaponDetectionConfig {
    pub slots: Vec<(SlotId, Roi)>,
    /// Fixed offset, within a slot's bounding box, sampled for the RGB
    /// distance gate.
    pub sample_offset: (u32, u32),
    pub allies_max_distance: f64,
    pub enemies_max_distance: f64,
    pub teams_min_distance: f64,
    pub strict_team_color: HsvRange,
    pub relaxed_team_color: HsvRange,
    pub species_mask_ika: GrayImage,
    pub species_mask_tako: GrayImage,
    pub iou_threshold: f64,
    pub min_matching_slots: usize,
    pub max_shift: i32,
}

fn rgb_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| (x as f64 - y as f64).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn sample_slot(frame: &Frame, roi: Roi, offset: (u32, u32)) -> [u8; 3] {
    let x = (roi.x + offset.0).min(frame.width().saturating_sub(1));
    let y = (roi.y + offset.1).min(frame.height().saturating_sub(1));
    frame.pixel_bgr(x, y)
}

/// Gate before spending time on full template recognition: confirms the
/// weapon-display overlay is actually on screen (§4.3).
pub fn detect_weapon_display(frame: &Frame, config: &WeaponDetectionConfig) -> bool {
    let allies: Vec<[u8; 3]> = config
        .slots
        .iter()
        .filter(|(id, _)| id.team == crate::domain::Team::Ally)
        .map(|(_, roi)| sample_slot(frame, *roi, config.sample_offset))
        .collect();
    let enemies: Vec<[u8; 3]> = config
        .slots
        .iter()
        .filter(|(id, _)| id.team == crate::domain::Team::Enemy)
        .map(|(_, roi)| sample_slot(frame, *roi, config.sample_offset))
        .collect();

    if !within_max_pairwise_distance(&allies, config.allies_max_distance) {
        return false;
    }
    if !within_max_pairwise_distance(&enemies, config.enemies_max_distance) {
        return false;
    }
    if !cross_team_min_distance_holds(&allies, &enemies, config.teams_min_distance) {
        return false;
    }

    outline_iou_gate(frame, config)
}

fn within_max_pairwise_distance(samples: &[[u8; 3]], max: f64) -> bool {
    for i in 0..samples.len() {
        for j in (i + 1)..samples.len() {
            if rgb_distance(samples[i], samples[j]) > max {
                return false;
            }
        }
    }
    true
}

fn cross_team_min_distance_holds(allies: &[[u8; 3]], enemies: &[[u8; 3]], min: f64) -> bool {
    let mut observed_min = f64::MAX;
    for &a in allies {
        for &e in enemies {
            observed_min = observed_min.min(rgb_distance(a, e));
        }
    }
    observed_min >= min
}

/// For each slot, extracts the team-color region (strict then relaxed
/// threshold), isolates the connected component containing the sample
/// point, and checks its IoU against the species mask at the best-aligning
/// integer shift.
fn outline_iou_gate(frame: &Frame, config: &WeaponDetectionConfig) -> bool {
    let mut matching = 0usize;
    for &(_, roi) in &config.slots {
        let region = frame.crop(roi);
        let mask = team_color_mask(&region, config.strict_team_color)
            .or_else(|| team_color_mask(&region, config.relaxed_team_color));
        let Some(mask) = mask else { continue };

        let component = component_containing(&mask, config.sample_offset);
        let Some(component) = component else { continue };

        let best_iou = [&config.species_mask_ika, &config.species_mask_tako]
            .into_iter()
            .map(|species_mask| best_shifted_iou(&component, species_mask, config.max_shift))
            .fold(0.0_f64, f64::max);

        if best_iou >= config.iou_threshold {
            matching += 1;
        }
    }
    matching >= config.min_matching_slots
}

fn team_color_mask(region: &Frame, range: HsvRange) -> Option<GrayImage> {
    let mut mask = GrayImage::new(region.width(), region.height());
    let mut any = false;
    for y in 0..region.height() {
        for x in 0..region.width() {
            let hsv = bgr_to_hsv(region.pixel_bgr(x, y));
            if hsv_in_range(hsv, range.lower, range.upper) {
                mask.put_pixel(x, y, Luma([255]));
                any = true;
            }
        }
    }
    any.then_some(mask)
}

/// Runs connected-component labelling and returns the mask of whichever
/// component contains `point`, merging components that touch it.
fn component_containing(mask: &GrayImage, point: (u32, u32)) -> Option<GrayImage> {
    let background = Luma([0u8]);
    let labels = connected_components(mask, Connectivity::Eight, background);
    let (px, py) = (point.0.min(mask.width().saturating_sub(1)), point.1.min(mask.height().saturating_sub(1)));
    let target_label = labels.get_pixel(px, py).0[0];
    if target_label == 0 {
        return None;
    }
    let mut out = GrayImage::new(mask.width(), mask.height());
    for (x, y, px) in labels.enumerate_pixels() {
        if px.0[0] == target_label {
            out.put_pixel(x, y, Luma([255]));
        }
    }
    Some(out)
}

/// Maximizes IoU between `component` and `species_mask` over integer
/// translations in `[-max_shift, max_shift]` on both axes.
fn best_shifted_iou(component: &GrayImage, species_mask: &GrayImage, max_shift: i32) -> f64 {
    let mut best = 0.0f64;
    for dy in -max_shift..=max_shift {
        for dx in -max_shift..=max_shift {
            let iou = shifted_iou(component, species_mask, dx, dy);
            if iou > best {
                best = iou;
            }
        }
    }
    best
}

fn shifted_iou(a: &GrayImage, b: &GrayImage, dx: i32, dy: i32) -> f64 {
    let (w, h) = (a.width().max(b.width()), a.height().max(b.height()));
    let mut intersection = 0u64;
    let mut union = 0u64;
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            let a_on = pixel_on(a, x, y);
            let b_on = pixel_on(b, x - dx, y - dy);
            if a_on || b_on {
                union += 1;
            }
            if a_on && b_on {
                intersection += 1;
            }
        }
    }
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

fn pixel_on(img: &GrayImage, x: i32, y: i32) -> bool {
    if x < 0 || y < 0 || x as u32 >= img.width() || y as u32 >= img.height() {
        return false;
    }
    img.get_pixel(x as u32, y as u32).0[0] > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_masks_have_iou_one() {
        let mut mask = GrayImage::new(4, 4);
        for y in 1..3 {
            for x in 1..3 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        assert!((shifted_iou(&mask, &mask, 0, 0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn disjoint_masks_have_iou_zero() {
        let mut a = GrayImage::new(6, 6);
        a.put_pixel(0, 0, Luma([255]));
        let mut b = GrayImage::new(6, 6);
        b.put_pixel(5, 5, Luma([255]));
        assert_eq!(shifted_iou(&a, &b, 0, 0), 0.0);
    }

    #[test]
    fn shift_recovers_full_overlap() {
        let mut a = GrayImage::new(6, 6);
        a.put_pixel(1, 1, Luma([255]));
        let mut b = GrayImage::new(6, 6);
        b.put_pixel(3, 1, Luma([255]));
        assert_eq!(best_shifted_iou(&a, &b, 3), 1.0);
    }
}
