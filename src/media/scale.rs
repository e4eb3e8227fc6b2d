// SPDX-License-Identifier: GPL-3.0-only

//! Frame scaling to display geometry
//!
//! Source and destination sizes are independent. Scaling always keeps the
//! whole source picture; nothing is cropped.

use crate::backends::capture::DecodedFrame;
use image::RgbImage;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

/// Resampling filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleFilter {
    /// Nearest neighbour, cheapest on small boards
    #[default]
    Nearest,
    /// Bilinear
    Linear,
}

impl ScaleFilter {
    fn filter_type(&self) -> FilterType {
        match self {
            ScaleFilter::Nearest => FilterType::Nearest,
            ScaleFilter::Linear => FilterType::Triangle,
        }
    }
}

/// How the picture is placed on the display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleMode {
    /// Fill the whole display, aspect ratio may change
    #[default]
    Stretch,
    /// Keep the aspect ratio, black bars on the short axis
    Fit,
}

/// Scaling settings for the display sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScaleOptions {
    pub filter: ScaleFilter,
    pub mode: ScaleMode,
}

/// Destination rectangle of the scaled picture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Whether the picture covers the whole destination
    pub fn covers(&self, width: u32, height: u32) -> bool {
        self.x == 0 && self.y == 0 && self.width == width && self.height == height
    }
}

/// Compute where a `src_w` x `src_h` picture lands on a `dst_w` x `dst_h` display
pub fn placement(src_w: u32, src_h: u32, dst_w: u32, dst_h: u32, mode: ScaleMode) -> Placement {
    let full = Placement {
        x: 0,
        y: 0,
        width: dst_w,
        height: dst_h,
    };

    if mode == ScaleMode::Stretch || src_w == 0 || src_h == 0 {
        return full;
    }

    // Compare aspect ratios without floating point: src_w/src_h vs dst_w/dst_h
    let src_wide = src_w as u64 * dst_h as u64;
    let dst_wide = dst_w as u64 * src_h as u64;

    if src_wide > dst_wide {
        // Source is wider: full width, bars top and bottom
        let height = ((dst_w as u64 * src_h as u64) / src_w as u64).max(1) as u32;
        Placement {
            x: 0,
            y: (dst_h - height) / 2,
            width: dst_w,
            height,
        }
    } else if src_wide < dst_wide {
        let width = ((dst_h as u64 * src_w as u64) / src_h as u64).max(1) as u32;
        Placement {
            x: (dst_w - width) / 2,
            y: 0,
            width,
            height: dst_h,
        }
    } else {
        full
    }
}

/// Resize a frame to exactly `width` x `height`
///
/// The result is tightly packed, three bytes per pixel, in the frame's
/// channel order (resampling does not care which channel is which).
pub fn resize(frame: &DecodedFrame, width: u32, height: u32, filter: ScaleFilter) -> RgbImage {
    let packed = frame.packed_data();
    let source = match RgbImage::from_raw(frame.width, frame.height, packed) {
        Some(img) => img,
        None => return RgbImage::new(width, height),
    };

    if frame.width == width && frame.height == height {
        return source;
    }

    imageops::resize(&source, width, height, filter.filter_type())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stretch_covers_display() {
        let p = placement(640, 480, 480, 320, ScaleMode::Stretch);
        assert!(p.covers(480, 320));
    }

    #[test]
    fn test_fit_letterboxes_wide_source() {
        // 16:9 into 4:3
        let p = placement(1280, 720, 640, 480, ScaleMode::Fit);
        assert_eq!(
            p,
            Placement {
                x: 0,
                y: 60,
                width: 640,
                height: 360
            }
        );
    }

    #[test]
    fn test_fit_pillarboxes_tall_source() {
        // 4:3 into 3:2
        let p = placement(640, 480, 480, 320, ScaleMode::Fit);
        assert_eq!(p.height, 320);
        assert_eq!(p.width, 426);
        assert_eq!(p.x, 27);
    }

    #[test]
    fn test_fit_same_aspect_covers() {
        assert!(placement(640, 480, 320, 240, ScaleMode::Fit).covers(320, 240));
    }

    #[test]
    fn test_resize_solid_stays_solid() {
        let frame = DecodedFrame::solid(64, 48, [128, 128, 128]);
        for filter in [ScaleFilter::Nearest, ScaleFilter::Linear] {
            let out = resize(&frame, 48, 32, filter);
            assert_eq!(out.dimensions(), (48, 32));
            assert!(out.pixels().all(|p| p.0 == [128, 128, 128]));
        }
    }

    #[test]
    fn test_resize_identity_keeps_pixels() {
        let data: Vec<u8> = (0..2 * 2 * 3).map(|v| v as u8).collect();
        let frame = DecodedFrame::from_rgb(2, 2, data.clone()).unwrap();
        assert_eq!(resize(&frame, 2, 2, ScaleFilter::Linear).into_raw(), data);
    }
}
