// SPDX-License-Identifier: GPL-3.0-only

//! Display pixel layouts and color packing
//!
//! A framebuffer describes its pixel encoding as one bitfield (offset and
//! length) per channel. Packing works from those bitfields directly, so
//! RGB565, BGR565, RGB888 and XRGB8888 panels all go through the same path.
//!
//! Quantization rounds to nearest. Expanding a packed value back to 8 bits
//! reproduces the source within [`PixelLayout::tolerance`].

use crate::errors::{DisplayError, DisplayResult};

/// Depths the display sink can drive
pub const SUPPORTED_DEPTHS: [u32; 3] = [16, 24, 32];

/// Position of one channel inside a packed pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bitfield {
    /// Bit offset from the least significant bit
    pub offset: u32,
    /// Number of bits, 0 when the channel is absent
    pub length: u32,
}

impl Bitfield {
    pub const fn new(offset: u32, length: u32) -> Self {
        Self { offset, length }
    }

    /// Largest quantized value for this channel
    fn max_value(&self) -> u32 {
        (1u32 << self.length) - 1
    }

    /// Mask of the bits occupied by this channel
    fn mask(&self) -> u32 {
        if self.length == 0 {
            0
        } else {
            self.max_value() << self.offset
        }
    }

    /// Round-to-nearest reduction of an 8-bit value
    fn quantize(&self, value: u8) -> u32 {
        let max = self.max_value();
        (value as u32 * max + 127) / 255
    }

    /// Round-to-nearest expansion back to 8 bits
    fn expand(&self, quantized: u32) -> u8 {
        let max = self.max_value();
        if max == 0 {
            return 0;
        }
        ((quantized * 255 + max / 2) / max) as u8
    }
}

/// Pixel encoding reported by the display device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub bits_per_pixel: u32,
    pub red: Bitfield,
    pub green: Bitfield,
    pub blue: Bitfield,
    /// Alpha or padding; zero length means the bits are unused
    pub alpha: Bitfield,
}

impl PixelLayout {
    /// 16-bit RGB565
    pub const fn rgb565() -> Self {
        Self {
            bits_per_pixel: 16,
            red: Bitfield::new(11, 5),
            green: Bitfield::new(5, 6),
            blue: Bitfield::new(0, 5),
            alpha: Bitfield::new(0, 0),
        }
    }

    /// 24-bit packed, blue in the lowest byte
    pub const fn rgb888() -> Self {
        Self {
            bits_per_pixel: 24,
            red: Bitfield::new(16, 8),
            green: Bitfield::new(8, 8),
            blue: Bitfield::new(0, 8),
            alpha: Bitfield::new(0, 0),
        }
    }

    /// 32-bit with padding byte on top, blue in the lowest byte
    pub const fn xrgb8888() -> Self {
        Self {
            bits_per_pixel: 32,
            red: Bitfield::new(16, 8),
            green: Bitfield::new(8, 8),
            blue: Bitfield::new(0, 8),
            alpha: Bitfield::new(24, 0),
        }
    }

    /// Conventional layout for a depth, used when a driver reports empty bitfields
    pub fn default_for_depth(bits_per_pixel: u32) -> DisplayResult<Self> {
        match bits_per_pixel {
            16 => Ok(Self::rgb565()),
            24 => Ok(Self::rgb888()),
            32 => Ok(Self::xrgb8888()),
            other => Err(DisplayError::UnsupportedPixelFormat(format!(
                "{} bits per pixel",
                other
            ))),
        }
    }

    pub fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_pixel / 8) as usize
    }

    /// Check that every pixel of this layout can be packed
    pub fn validate(&self) -> DisplayResult<()> {
        if !SUPPORTED_DEPTHS.contains(&self.bits_per_pixel) {
            return Err(DisplayError::UnsupportedPixelFormat(format!(
                "{} bits per pixel (supported: 16, 24, 32)",
                self.bits_per_pixel
            )));
        }

        for (name, field) in [("red", self.red), ("green", self.green), ("blue", self.blue)] {
            if field.length == 0 || field.length > 8 {
                return Err(DisplayError::UnsupportedPixelFormat(format!(
                    "{} channel is {} bits wide",
                    name, field.length
                )));
            }
            if field.offset + field.length > self.bits_per_pixel {
                return Err(DisplayError::UnsupportedPixelFormat(format!(
                    "{} channel at bit {} overflows a {}-bit pixel",
                    name, field.offset, self.bits_per_pixel
                )));
            }
        }

        let (r, g, b) = (self.red.mask(), self.green.mask(), self.blue.mask());
        if r & g != 0 || r & b != 0 || g & b != 0 {
            return Err(DisplayError::UnsupportedPixelFormat(
                "color channels overlap".to_string(),
            ));
        }

        Ok(())
    }

    /// Largest per-channel error of a pack/unpack round trip
    pub fn tolerance(&self) -> u8 {
        [self.red, self.green, self.blue]
            .iter()
            .filter(|field| field.length > 0)
            .map(|field| (255 / field.max_value() / 2 + 1) as u8)
            .max()
            .unwrap_or(1)
    }

    /// Bits not covered by a color channel; written as ones (opaque alpha)
    fn fill_mask(&self) -> u32 {
        let all = if self.bits_per_pixel >= 32 {
            u32::MAX
        } else {
            (1u32 << self.bits_per_pixel) - 1
        };
        all & !(self.red.mask() | self.green.mask() | self.blue.mask())
    }

    /// Pack one color into a device pixel value
    pub fn pack(&self, rgb: [u8; 3]) -> u32 {
        (self.red.quantize(rgb[0]) << self.red.offset)
            | (self.green.quantize(rgb[1]) << self.green.offset)
            | (self.blue.quantize(rgb[2]) << self.blue.offset)
            | self.fill_mask()
    }

    /// Expand a device pixel value back to 8-bit RGB
    pub fn unpack(&self, value: u32) -> [u8; 3] {
        let channel = |field: Bitfield| field.expand((value >> field.offset) & field.max_value());
        [channel(self.red), channel(self.green), channel(self.blue)]
    }
}

/// Lookup-table packer for one validated layout
///
/// Per-channel tables turn packing into three loads and an OR, which keeps
/// full-screen conversion cheap on small ARM boards.
#[derive(Debug, Clone)]
pub struct PixelEncoder {
    layout: PixelLayout,
    red: [u32; 256],
    green: [u32; 256],
    blue: [u32; 256],
    fill: u32,
}

impl PixelEncoder {
    pub fn new(layout: PixelLayout) -> DisplayResult<Self> {
        layout.validate()?;

        let table = |field: Bitfield| {
            let mut lut = [0u32; 256];
            for (value, entry) in lut.iter_mut().enumerate() {
                *entry = field.quantize(value as u8) << field.offset;
            }
            lut
        };

        Ok(Self {
            layout,
            red: table(layout.red),
            green: table(layout.green),
            blue: table(layout.blue),
            fill: layout.fill_mask(),
        })
    }

    pub fn layout(&self) -> &PixelLayout {
        &self.layout
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.layout.bytes_per_pixel()
    }

    #[inline]
    pub fn pack(&self, rgb: [u8; 3]) -> u32 {
        self.red[rgb[0] as usize]
            | self.green[rgb[1] as usize]
            | self.blue[rgb[2] as usize]
            | self.fill
    }

    /// Write one pixel in native byte order; `out` must be `bytes_per_pixel` long
    #[inline]
    pub fn write(&self, rgb: [u8; 3], out: &mut [u8]) {
        let bytes = self.pack(rgb).to_ne_bytes();
        let n = out.len();
        if cfg!(target_endian = "little") {
            out.copy_from_slice(&bytes[..n]);
        } else {
            out.copy_from_slice(&bytes[4 - n..]);
        }
    }
}
