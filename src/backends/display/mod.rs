// SPDX-License-Identifier: GPL-3.0-only

//! Display sink abstraction
//!
//! The sink owns a memory-mapped display region and writes converted frames
//! straight into it. There is no back buffer: every blit is visible as it
//! happens, and a torn frame is an accepted transient artifact.

pub mod blit;
pub mod fbdev;
pub mod framebuffer;
pub mod mapped;
pub mod provision;

pub use blit::Blitter;
pub use framebuffer::FramebufferSink;
pub use mapped::MappedRegion;

use crate::backends::capture::DecodedFrame;
use crate::errors::{DisplayError, DisplayResult};
use crate::media::scale::ScaleOptions;
use std::path::PathBuf;

/// Display sink parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    /// Framebuffer device node
    pub device_path: PathBuf,
    /// Try to load framebuffer modules when the node is missing
    pub provision: bool,
    pub scale: ScaleOptions,
}

/// Fixed screen geometry reported by the display device
///
/// Queried once at open time; live mode changes are not followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayGeometry {
    /// Visible width in pixels
    pub width: u32,
    /// Visible height in pixels
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Bytes between the starts of two rows, padding included
    pub stride: u32,
    /// Size of the mappable region in bytes
    pub mapped_size: usize,
    /// Visible area offset inside the virtual screen (panning)
    pub x_offset: u32,
    pub y_offset: u32,
}

impl DisplayGeometry {
    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// Pixel bytes in one row, excluding padding
    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.bytes_per_pixel()
    }

    /// Byte offset of the first visible pixel
    pub fn origin(&self) -> usize {
        self.y_offset as usize * self.stride as usize + self.origin_in_row()
    }

    /// Bytes the visible area spans from the start of the mapping
    pub fn visible_end(&self) -> usize {
        self.origin() + self.stride as usize * self.height as usize
    }

    /// Check the invariants the blitter relies on
    pub fn validate(&self) -> DisplayResult<()> {
        if self.bits_per_pixel % 8 != 0 || self.bits_per_pixel == 0 {
            return Err(DisplayError::UnsupportedPixelFormat(format!(
                "{} bits per pixel",
                self.bits_per_pixel
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(DisplayError::InvalidGeometry(format!(
                "empty screen {}x{}",
                self.width, self.height
            )));
        }
        if (self.stride as usize) < self.origin_in_row() + self.row_bytes() {
            return Err(DisplayError::InvalidGeometry(format!(
                "stride {} is shorter than a {}-pixel row at {} bpp",
                self.stride, self.width, self.bits_per_pixel
            )));
        }
        if self.mapped_size < self.visible_end() {
            return Err(DisplayError::InvalidGeometry(format!(
                "mapped size {} cannot hold {} rows of {} bytes",
                self.mapped_size, self.height, self.stride
            )));
        }
        Ok(())
    }

    /// Horizontal part of the origin, which must fit in a row with the pixels
    fn origin_in_row(&self) -> usize {
        self.x_offset as usize * self.bytes_per_pixel()
    }
}

impl std::fmt::Display for DisplayGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{} {}bpp stride={} size={}",
            self.width, self.height, self.bits_per_pixel, self.stride, self.mapped_size
        )
    }
}

/// Memory-mapped display output
pub trait DisplaySink {
    /// Open the device, validate its geometry and map it
    ///
    /// Opening an already open sink is a no-op.
    fn open(&mut self) -> DisplayResult<()>;

    /// Convert, scale and copy one frame into the display
    ///
    /// Cannot fail: everything that could go wrong is checked by `open`.
    /// Does nothing while the sink is closed.
    fn blit(&mut self, frame: &DecodedFrame);

    /// Unmap the region and release the device; idempotent
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Geometry of the open device
    fn geometry(&self) -> Option<DisplayGeometry>;
}
