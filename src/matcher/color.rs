/// Converts a BGR triple to OpenCV-convention HSV: H in `[0, 180)`, S and V
/// in `[0, 255]` (§9 "numerical parity with OpenCV").
pub fn bgr_to_hsv(bgr: [u8; 3]) -> [u8; 3] {
    let (b, g, r) = (bgr[0] as f32, bgr[1] as f32, bgr[2] as f32);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta <= f32::EPSILON {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };
    // OpenCV halves the 0-360 degree hue into 0-180 for 8-bit images.
    let h180 = (h / 2.0).round().clamp(0.0, 179.0) as u8;

    let s = if max <= f32::EPSILON { 0.0 } else { delta / max };
    let s255 = (s * 255.0).round().clamp(0.0, 255.0) as u8;
    let v255 = max.round().clamp(0.0, 255.0) as u8;

    [h180, s255, v255]
}

/// Inclusive HSV range test, honoring hue wraparound when `lower.0 >
/// upper.0`.
pub fn hsv_in_range(hsv: [u8; 3], lower: [u8; 3], upper: [u8; 3]) -> bool {
    let hue_ok = if lower[0] <= upper[0] {
        (lower[0]..=upper[0]).contains(&hsv[0])
    } else {
        hsv[0] >= lower[0] || hsv[0] <= upper[0]
    };
    hue_ok && (lower[1]..=upper[1]).contains(&hsv[1]) && (lower[2]..=upper[2]).contains(&hsv[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pure_red_has_zero_hue() {
        let hsv = bgr_to_hsv([0, 0, 255]);
        assert_eq!(hsv[0], 0);
        assert_eq!(hsv[1], 255);
        assert_eq!(hsv[2], 255);
    }

    #[test]
    fn gray_has_zero_saturation() {
        let hsv = bgr_to_hsv([128, 128, 128]);
        assert_eq!(hsv[1], 0);
    }

    #[test]
    fn range_respects_wraparound() {
        assert!(hsv_in_range([2, 200, 200], [170, 0, 0], [10, 255, 255]));
        assert!(!hsv_in_range([90, 200, 200], [170, 0, 0], [10, 255, 255]));
    }
}
