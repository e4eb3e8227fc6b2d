// SPDX-License-Identifier: GPL-3.0-only

//! Frame to display memory copy
//!
//! Writes exactly `height` rows of `width * bytes_per_pixel` bytes, each at
//! `origin + y * stride`. Row padding and anything past the visible area are
//! never touched.

use super::DisplayGeometry;
use crate::backends::capture::{ChannelOrder, DecodedFrame};
use crate::errors::{DisplayError, DisplayResult};
use crate::media::pixel::{PixelEncoder, PixelLayout};
use crate::media::scale::{self, ScaleMode, ScaleOptions};

/// Converts frames for one validated display
#[derive(Debug, Clone)]
pub struct Blitter {
    geometry: DisplayGeometry,
    encoder: PixelEncoder,
    scale: ScaleOptions,
    /// Encoded black, used for letterbox bars
    background: Vec<u8>,
}

impl Blitter {
    /// Validate geometry and pixel layout together
    pub fn new(
        geometry: DisplayGeometry,
        layout: PixelLayout,
        scale: ScaleOptions,
    ) -> DisplayResult<Self> {
        if geometry.bits_per_pixel != layout.bits_per_pixel {
            return Err(DisplayError::UnsupportedPixelFormat(format!(
                "geometry reports {} bpp but layout is {} bpp",
                geometry.bits_per_pixel, layout.bits_per_pixel
            )));
        }

        let encoder = PixelEncoder::new(layout)?;
        geometry.validate()?;

        let mut background = vec![0u8; encoder.bytes_per_pixel()];
        encoder.write([0, 0, 0], &mut background);

        Ok(Self {
            geometry,
            encoder,
            scale,
            background,
        })
    }

    pub fn geometry(&self) -> &DisplayGeometry {
        &self.geometry
    }

    pub fn layout(&self) -> &PixelLayout {
        self.encoder.layout()
    }

    /// Bytes `target` must have for [`Blitter::blit`]
    pub fn required_len(&self) -> usize {
        self.geometry.visible_end()
    }

    /// Scale, convert and copy `frame` into `target`
    ///
    /// `target` is the whole mapped region. `FramebufferSink::open` checks
    /// its length against [`Blitter::required_len`] once; rows that would
    /// fall outside a shorter slice are skipped rather than written.
    pub fn blit(&self, frame: &DecodedFrame, target: &mut [u8]) {
        let g = &self.geometry;
        let bpp = self.encoder.bytes_per_pixel();
        let row_bytes = g.row_bytes();
        let stride = g.stride as usize;

        let place = scale::placement(frame.width, frame.height, g.width, g.height, self.scale.mode);
        let scaled = scale::resize(frame, place.width, place.height, self.scale.filter);
        let letterboxed = self.scale.mode == ScaleMode::Fit && !place.covers(g.width, g.height);

        let order = frame.order;
        let origin = g.origin();

        for y in 0..g.height {
            let start = origin + y as usize * stride;
            let Some(row) = target.get_mut(start..start + row_bytes) else {
                break;
            };

            if letterboxed {
                for px in row.chunks_exact_mut(bpp) {
                    px.copy_from_slice(&self.background);
                }
            }

            if y < place.y || y >= place.y + place.height {
                continue;
            }

            let src_y = y - place.y;
            let src_row = &scaled.as_raw()[src_y as usize * place.width as usize * 3..]
                [..place.width as usize * 3];
            let dst = &mut row[place.x as usize * bpp..(place.x + place.width) as usize * bpp];

            for (src, out) in src_row.chunks_exact(3).zip(dst.chunks_exact_mut(bpp)) {
                let rgb = match order {
                    ChannelOrder::Rgb => [src[0], src[1], src[2]],
                    ChannelOrder::Bgr => [src[2], src[1], src[0]],
                };
                self.encoder.write(rgb, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::scale::ScaleFilter;

    const SENTINEL: u8 = 0xAA;

    fn geometry(width: u32, height: u32, bpp: u32, stride: u32) -> DisplayGeometry {
        DisplayGeometry {
            width,
            height,
            bits_per_pixel: bpp,
            stride,
            mapped_size: stride as usize * height as usize,
            x_offset: 0,
            y_offset: 0,
        }
    }

    #[test]
    fn test_depth_mismatch_rejected() {
        let err = Blitter::new(
            geometry(4, 4, 16, 8),
            PixelLayout::xrgb8888(),
            ScaleOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, DisplayError::UnsupportedPixelFormat(_)));
    }

    #[test]
    fn test_required_len_includes_panning() {
        let g = geometry(480, 320, 16, 960);
        let blitter = Blitter::new(g, PixelLayout::rgb565(), ScaleOptions::default()).unwrap();
        assert_eq!(blitter.required_len(), 960 * 320);

        // Second page of a double-height virtual screen
        let panned = DisplayGeometry {
            y_offset: 320,
            mapped_size: 960 * 640,
            ..g
        };
        let blitter = Blitter::new(panned, PixelLayout::rgb565(), ScaleOptions::default()).unwrap();
        assert_eq!(blitter.required_len(), 960 * 640);
    }

    #[test]
    fn test_padding_untouched() {
        // 4 pixels of 2 bytes plus 4 bytes of padding per row
        let g = geometry(4, 3, 16, 12);
        let blitter = Blitter::new(g, PixelLayout::rgb565(), ScaleOptions::default()).unwrap();
        let mut target = vec![SENTINEL; g.mapped_size];

        blitter.blit(&DecodedFrame::solid(4, 3, [255, 255, 255]), &mut target);

        for row in target.chunks(12) {
            assert!(row[..8].iter().all(|&b| b == 0xFF));
            assert!(row[8..].iter().all(|&b| b == SENTINEL));
        }
    }

    #[test]
    fn test_bgr_source_order() {
        let g = geometry(1, 1, 32, 4);
        let blitter = Blitter::new(g, PixelLayout::xrgb8888(), ScaleOptions::default()).unwrap();
        let frame =
            DecodedFrame::with_layout(1, 1, 3, ChannelOrder::Bgr, vec![0x56, 0x34, 0x12]).unwrap();
        let mut target = vec![0u8; 4];

        blitter.blit(&frame, &mut target);

        assert_eq!(u32::from_ne_bytes(target.try_into().unwrap()), 0xFF12_3456);
    }

    #[test]
    fn test_fit_draws_black_bars() {
        // 2:1 source on a square display: rows 0 and 3 are bars
        let g = geometry(4, 4, 16, 8);
        let options = ScaleOptions {
            filter: ScaleFilter::Nearest,
            mode: ScaleMode::Fit,
        };
        let blitter = Blitter::new(g, PixelLayout::rgb565(), options).unwrap();
        let mut target = vec![SENTINEL; g.mapped_size];

        blitter.blit(&DecodedFrame::solid(8, 4, [255, 255, 255]), &mut target);

        let rows: Vec<&[u8]> = target.chunks(8).collect();
        assert!(rows[0].iter().all(|&b| b == 0x00));
        assert!(rows[1].iter().all(|&b| b == 0xFF));
        assert!(rows[2].iter().all(|&b| b == 0xFF));
        assert!(rows[3].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_short_target_does_not_panic() {
        let g = geometry(4, 4, 16, 8);
        let blitter = Blitter::new(g, PixelLayout::rgb565(), ScaleOptions::default()).unwrap();
        let mut target = vec![SENTINEL; 20];

        blitter.blit(&DecodedFrame::solid(4, 4, [0, 0, 0]), &mut target);

        assert!(target[..16].iter().all(|&b| b == 0));
        assert!(target[16..].iter().all(|&b| b == SENTINEL));
    }
}
