use image::{GrayImage, Luma, RgbImage};

/// An immutable captured video frame. Pixels are stored BGR, 8-bit,
/// row-major, no padding — the layout the capture source hands us. Frames
/// carry no timestamp; freshness is implicit in capture order (§3).
#[derive(Debug, Clone)]
pub struct Frame {
    width: u32,
    height: u32,
    /// BGR bytes, 3 per pixel.
    data: Vec<u8>,
}

/// A rectangular region of interest, in pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Self {
        assert_eq!(
            data.len(),
            width as usize * height as usize * 3,
            "frame buffer length must equal width*height*3 (BGR8)"
        );
        Self { width, height, data }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn pixel_bgr(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 3;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Crops to `roi`, clamped to frame bounds. Returns a new owned Frame.
    pub fn crop(&self, roi: Roi) -> Frame {
        let x0 = roi.x.min(self.width);
        let y0 = roi.y.min(self.height);
        let w = roi.width.min(self.width.saturating_sub(x0));
        let h = roi.height.min(self.height.saturating_sub(y0));
        let mut out = Vec::with_capacity(w as usize * h as usize * 3);
        for y in y0..y0 + h {
            let row_start = (y as usize * self.width as usize + x0 as usize) * 3;
            let row_end = row_start + w as usize * 3;
            out.extend_from_slice(&self.data[row_start..row_end]);
        }
        Frame::new(w, h, out)
    }

    pub fn to_rgb_image(&self) -> RgbImage {
        let mut img = RgbImage::new(self.width, self.height);
        for (i, px) in img.pixels_mut().enumerate() {
            let idx = i * 3;
            *px = image::Rgb([self.data[idx + 2], self.data[idx + 1], self.data[idx]]);
        }
        img
    }

    pub fn to_gray_image(&self) -> GrayImage {
        let mut img = GrayImage::new(self.width, self.height);
        for (i, px) in img.pixels_mut().enumerate() {
            let idx = i * 3;
            let (b, g, r) = (
                self.data[idx] as f32,
                self.data[idx + 1] as f32,
                self.data[idx + 2] as f32,
            );
            // ITU-R BT.601 luma, same coefficients OpenCV's cvtColor(GRAY) uses.
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            *px = Luma([y.round().clamp(0.0, 255.0) as u8]);
        }
        img
    }

    /// A 32-bit fingerprint over the blue channel, subsampled every 64
    /// pixels (§4.2). Used only to short-circuit duplicate analyses of
    /// physically identical frames; never persisted as identity.
    pub fn fingerprint(&self) -> u32 {
        let mut hash: u32 = 2166136261; // FNV-1a offset basis
        for chunk in self.data.chunks(3 * 64) {
            if let Some(&b) = chunk.first() {
                hash ^= b as u32;
                hash = hash.wrapping_mul(16777619);
            }
        }
        hash
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
    fn crop_extracts_expected_pixels() {
        let frame = solid_frame(4, 4, [10, 20, 30]);
        let cropped = frame.crop(Roi { x: 1, y: 1, width: 2, height: 2 });
        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.height(), 2);
        assert_eq!(cropped.pixel_bgr(0, 0), [10, 20, 30]);
    }

    #[test]
    fn crop_clamps_to_bounds() {
        let frame = solid_frame(4, 4, [1, 2, 3]);
        let cropped = frame.crop(Roi { x: 2, y: 2, width: 10, height: 10 });
        assert_eq!(cropped.width(), 2);
        assert_eq!(cropped.height(), 2);
    }

    #[test]
    fn identical_frames_fingerprint_equal() {
        let a = solid_frame(128, 128, [5, 6, 7]);
        let b = solid_frame(128, 128, [5, 6, 7]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn different_frames_fingerprint_differ() {
        let a = solid_frame(128, 128, [5, 6, 7]);
        let b = solid_frame(128, 128, [200, 6, 7]);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
