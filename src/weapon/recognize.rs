use image::{GrayImage, Luma};

use crate::domain::{
    Frame, Roi, SlotId, WeaponCandidate, WeaponRecognitionResult, WeaponSlotResult, UNMATCHED_SENTINEL,
};
use crate::matcher::template::normalized_cross_correlation;

const PAD_PIXELS: u32 = 8;
const TOP_CANDIDATES: usize = 3;

/// One weapon's set of reference templates, matched as a whole — the best
/// score across all templates for a weapon is that weapon's candidate score
/// (§4.3).
#[derive(Debug, Clone)]
pub struct WeaponTemplate {
    pub name: String,
    pub templates: Vec<GrayImage>,
    pub threshold: f64,
}

/// 8-pixel replicate-edge padding on a grayscale query, matching the
/// teacher's image-buffer conventions rather than reaching for an
/// OpenCV-style `copyMakeBorder` equivalent that doesn't exist in `image`.
fn pad_replicate(img: &GrayImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let padded_w = w + 2 * PAD_PIXELS;
    let padded_h = h + 2 * PAD_PIXELS;
    GrayImage::from_fn(padded_w, padded_h, |x, y| {
        let sx = x.saturating_sub(PAD_PIXELS).min(w - 1);
        let sy = y.saturating_sub(PAD_PIXELS).min(h - 1);
        Luma([img.get_pixel(sx, sy).0[0]])
    })
}

fn best_candidate(query: &GrayImage, weapons: &[WeaponTemplate]) -> Vec<WeaponCandidate> {
    let mut candidates: Vec<WeaponCandidate> = weapons
        .iter()
        .map(|weapon| {
            let score = weapon
                .templates
                .iter()
                .filter_map(|template| normalized_cross_correlation(query, template, &mut || false))
                .fold(f64::MIN, f64::max);
            WeaponCandidate { weapon: weapon.name.clone(), score, threshold: weapon.threshold }
        })
        .collect();

    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    candidates.truncate(TOP_CANDIDATES);
    candidates
}

/// Recognizes the weapon shown in each target slot (§4.3). Slots absent
/// from `target_slots` retain whatever the caller already has in
/// `previous_results`.
pub fn recognize_weapons(
    frame: &Frame,
    slot_rois: &[(SlotId, Roi)],
    weapons: &[WeaponTemplate],
    target_slots: &[SlotId],
    previous_results: &[WeaponSlotResult],
) -> WeaponRecognitionResult {
    let mut slot_results: Vec<WeaponSlotResult> = previous_results.to_vec();

    for &slot_id in target_slots {
        let Some(&(_, roi)) = slot_rois.iter().find(|(id, _)| *id == slot_id) else { continue };
        let query = pad_replicate(&frame.crop(roi).to_gray_image());
        let candidates = best_candidate(&query, weapons);

        let result = match candidates.first() {
            Some(top) if top.score >= top.threshold => WeaponSlotResult {
                slot_id,
                predicted_weapon: top.weapon.clone(),
                is_unmatched: false,
                top_candidates: candidates,
            },
            _ => WeaponSlotResult {
                slot_id,
                predicted_weapon: UNMATCHED_SENTINEL.to_string(),
                is_unmatched: true,
                top_candidates: candidates,
            },
        };

        slot_results.retain(|r| r.slot_id != slot_id);
        slot_results.push(result);
    }

    let mut out = WeaponRecognitionResult { slot_results, ..Default::default() };
    for result in &out.slot_results {
        if result.is_unmatched {
            continue;
        }
        let bucket = match result.slot_id.team {
            crate::domain::Team::Ally => &mut out.allies,
            crate::domain::Team::Enemy => &mut out.enemies,
        };
        bucket[(result.slot_id.index - 1) as usize] = Some(result.predicted_weapon.clone());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Team;

    fn solid(w: u32, h: u32, v: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([v]))
    }

    #[test]
    fn pad_replicate_extends_border_pixels() {
        let img = solid(4, 4, 77);
        let padded = pad_replicate(&img);
        assert_eq!(padded.width(), 4 + 2 * PAD_PIXELS);
        assert_eq!(padded.get_pixel(0, 0).0[0], 77);
    }

    #[test]
    fn unmatched_candidate_below_threshold() {
        let weapons = vec![WeaponTemplate {
            name: "Splattershot".to_string(),
            templates: vec![solid(10, 10, 200)],
            threshold: 0.99,
        }];
        let query = solid(10, 10, 10);
        let candidates = best_candidate(&query, &weapons);
        assert!(candidates[0].score < candidates[0].threshold);
    }

    #[test]
    fn recognize_weapons_fills_ally_slot_on_match() {
        let template = solid(10, 10, 150);
        let weapons = vec![WeaponTemplate {
            name: "Splattershot".to_string(),
            templates: vec![template.clone()],
            threshold: 0.5,
        }];
        let slot = SlotId { team: Team::Ally, index: 1 };
        let roi = Roi { x: 0, y: 0, width: 10, height: 10 };
        let mut data = vec![150u8; 10 * 10 * 3];
        for px in data.chunks_mut(3) {
            px[0] = 150;
            px[1] = 150;
            px[2] = 150;
        }
        let frame = Frame::new(10, 10, data);

        let result = recognize_weapons(&frame, &[(slot, roi)], &weapons, &[slot], &[]);
        assert_eq!(result.allies[0].as_deref(), Some("Splattershot"));
    }
}
