//! RGBA frame view and region-of-interest geometry.

use crate::error::{PpgError, Result};

/// Borrowed RGBA8 pixel grid (row-major, 4 bytes per pixel).
#[derive(Debug, Clone, Copy)]
pub struct RgbaFrame<'a> {
    data: &'a [u8],
    width: u32,
    height: u32,
}

impl<'a> RgbaFrame<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            return Err(PpgError::InvalidFrame(format!("empty frame {}x{}", width, height)));
        }
        if data.len() < expected {
            return Err(PpgError::InvalidFrame(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                width,
                height,
                data.len()
            )));
        }
        Ok(Self { data, width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Get pixel at (x, y) as [R, G, B]; out-of-range reads return black.
    #[inline]
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        if x >= self.width || y >= self.height {
            return [0, 0, 0];
        }
        let idx = ((y as usize * self.width as usize) + x as usize) * 4;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Mean R, G, B over `roi`, reading every `stride`-th pixel per axis.
    pub fn roi_mean_rgb(&self, roi: &Roi, stride: usize) -> [f64; 3] {
        let roi = roi.clipped(self.width, self.height);
        let stride = stride.max(1);
        let mut sum = [0.0f64; 3];
        let mut count = 0u64;

        for y in (roi.y..roi.y + roi.height).step_by(stride) {
            for x in (roi.x..roi.x + roi.width).step_by(stride) {
                let px = self.rgb(x, y);
                sum[0] += px[0] as f64;
                sum[1] += px[1] as f64;
                sum[2] += px[2] as f64;
                count += 1;
            }
        }

        if count == 0 {
            return [0.0, 0.0, 0.0];
        }
        let c = count as f64;
        [sum[0] / c, sum[1] / c, sum[2] / c]
    }
}

/// Axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Roi {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Roi {
    /// Centred rectangle covering `area_fraction` of the frame, keeping
    /// the frame's aspect ratio.
    pub fn centered(frame_width: u32, frame_height: u32, area_fraction: f64) -> Self {
        let side = area_fraction.clamp(0.0, 1.0).sqrt();
        let width = ((frame_width as f64 * side).round() as u32).clamp(1, frame_width.max(1));
        let height = ((frame_height as f64 * side).round() as u32).clamp(1, frame_height.max(1));
        Self {
            x: (frame_width - width) / 2,
            y: (frame_height - height) / 2,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    fn clipped(&self, frame_width: u32, frame_height: u32) -> Roi {
        let x = self.x.min(frame_width);
        let y = self.y.min(frame_height);
        Roi {
            x,
            y,
            width: self.width.min(frame_width - x),
            height: self.height.min(frame_height - y),
        }
    }
}
