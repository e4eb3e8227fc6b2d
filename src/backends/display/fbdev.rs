// SPDX-License-Identifier: GPL-3.0-only

//! Linux fbdev screen information
//!
//! Reads the variable and fixed screen info of a framebuffer device with the
//! FBIOGET ioctls and turns them into a [`DisplayGeometry`] and a
//! [`PixelLayout`].

use super::DisplayGeometry;
use crate::errors::{DisplayError, DisplayResult};
use crate::media::pixel::{Bitfield, PixelLayout};
use std::fs::File;
use std::os::unix::io::AsRawFd;
use tracing::debug;

// ===== fbdev ioctl Numbers =====

const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;

// ===== fbdev Visual Types =====

pub const FB_VISUAL_TRUECOLOR: u32 = 2;
pub const FB_VISUAL_DIRECTCOLOR: u32 = 4;

// ===== fbdev ioctl Structures =====

/// struct fb_bitfield
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbBitfield {
    pub offset: u32,
    pub length: u32,
    pub msb_right: u32,
}

/// struct fb_var_screeninfo
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbVarScreeninfo {
    pub xres: u32,
    pub yres: u32,
    pub xres_virtual: u32,
    pub yres_virtual: u32,
    pub xoffset: u32,
    pub yoffset: u32,
    pub bits_per_pixel: u32,
    pub grayscale: u32,
    pub red: FbBitfield,
    pub green: FbBitfield,
    pub blue: FbBitfield,
    pub transp: FbBitfield,
    pub nonstd: u32,
    pub activate: u32,
    pub height: u32,
    pub width: u32,
    pub accel_flags: u32,
    pub pixclock: u32,
    pub left_margin: u32,
    pub right_margin: u32,
    pub upper_margin: u32,
    pub lower_margin: u32,
    pub hsync_len: u32,
    pub vsync_len: u32,
    pub sync: u32,
    pub vmode: u32,
    pub rotate: u32,
    pub colorspace: u32,
    pub reserved: [u32; 4],
}

/// struct fb_fix_screeninfo
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FbFixScreeninfo {
    pub id: [u8; 16],
    pub smem_start: libc::c_ulong,
    pub smem_len: u32,
    pub type_: u32,
    pub type_aux: u32,
    pub visual: u32,
    pub xpanstep: u16,
    pub ypanstep: u16,
    pub ywrapstep: u16,
    pub line_length: u32,
    pub mmio_start: libc::c_ulong,
    pub mmio_len: u32,
    pub accel: u32,
    pub capabilities: u16,
    pub reserved: [u16; 2],
}

impl FbFixScreeninfo {
    /// Driver identification string
    pub fn id(&self) -> String {
        let end = self.id.iter().position(|&b| b == 0).unwrap_or(self.id.len());
        String::from_utf8_lossy(&self.id[..end]).into_owned()
    }
}

/// Query both screen info blocks from an open framebuffer device
pub fn query(file: &File) -> DisplayResult<(DisplayGeometry, PixelLayout)> {
    let fd = file.as_raw_fd();

    let mut var = FbVarScreeninfo::default();
    let result = unsafe { libc::ioctl(fd, FBIOGET_VSCREENINFO, &mut var as *mut FbVarScreeninfo) };
    if result < 0 {
        return Err(DisplayError::DeviceUnavailable(format!(
            "FBIOGET_VSCREENINFO failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    let mut fix = FbFixScreeninfo::default();
    let result = unsafe { libc::ioctl(fd, FBIOGET_FSCREENINFO, &mut fix as *mut FbFixScreeninfo) };
    if result < 0 {
        return Err(DisplayError::DeviceUnavailable(format!(
            "FBIOGET_FSCREENINFO failed: {}",
            std::io::Error::last_os_error()
        )));
    }

    debug!(
        driver = %fix.id(),
        xres = var.xres,
        yres = var.yres,
        xres_virtual = var.xres_virtual,
        yres_virtual = var.yres_virtual,
        bpp = var.bits_per_pixel,
        line_length = fix.line_length,
        smem_len = fix.smem_len,
        visual = fix.visual,
        "Framebuffer screen info"
    );

    screen_info_to_geometry(&var, &fix)
}

/// Interpret raw screen info
///
/// Drivers that leave every bitfield empty get the conventional layout for
/// their depth.
pub fn screen_info_to_geometry(
    var: &FbVarScreeninfo,
    fix: &FbFixScreeninfo,
) -> DisplayResult<(DisplayGeometry, PixelLayout)> {
    if var.grayscale != 0 {
        return Err(DisplayError::UnsupportedPixelFormat(
            "grayscale framebuffer".to_string(),
        ));
    }
    if fix.visual != FB_VISUAL_TRUECOLOR && fix.visual != FB_VISUAL_DIRECTCOLOR {
        return Err(DisplayError::UnsupportedPixelFormat(format!(
            "visual type {} is not true color",
            fix.visual
        )));
    }

    let fields = [var.red, var.green, var.blue, var.transp];
    if fields.iter().any(|f| f.msb_right != 0) {
        return Err(DisplayError::UnsupportedPixelFormat(
            "channels stored most significant bit right".to_string(),
        ));
    }

    let layout = if var.red.length == 0 && var.green.length == 0 && var.blue.length == 0 {
        PixelLayout::default_for_depth(var.bits_per_pixel)?
    } else {
        let bitfield = |f: FbBitfield| Bitfield::new(f.offset, f.length);
        PixelLayout {
            bits_per_pixel: var.bits_per_pixel,
            red: bitfield(var.red),
            green: bitfield(var.green),
            blue: bitfield(var.blue),
            alpha: bitfield(var.transp),
        }
    };
    layout.validate()?;

    let geometry = DisplayGeometry {
        width: var.xres,
        height: var.yres,
        bits_per_pixel: var.bits_per_pixel,
        stride: fix.line_length,
        mapped_size: fix.smem_len as usize,
        x_offset: var.xoffset,
        y_offset: var.yoffset,
    };
    geometry.validate()?;

    Ok((geometry, layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(offset: u32, length: u32) -> FbBitfield {
        FbBitfield {
            offset,
            length,
            msb_right: 0,
        }
    }

    fn rgb565_screen() -> (FbVarScreeninfo, FbFixScreeninfo) {
        let var = FbVarScreeninfo {
            xres: 480,
            yres: 320,
            xres_virtual: 480,
            yres_virtual: 320,
            bits_per_pixel: 16,
            red: field(11, 5),
            green: field(5, 6),
            blue: field(0, 5),
            ..Default::default()
        };
        let fix = FbFixScreeninfo {
            smem_len: 960 * 320,
            visual: FB_VISUAL_TRUECOLOR,
            line_length: 960,
            ..Default::default()
        };
        (var, fix)
    }

    #[test]
    fn test_rgb565_panel() {
        let (var, fix) = rgb565_screen();
        let (geometry, layout) = screen_info_to_geometry(&var, &fix).unwrap();
        assert_eq!(geometry.width, 480);
        assert_eq!(geometry.stride, 960);
        assert_eq!(geometry.mapped_size, 960 * 320);
        assert_eq!(layout, PixelLayout::rgb565());
    }

    #[test]
    fn test_bgr_bitfields_are_honored() {
        let (mut var, fix) = rgb565_screen();
        var.red = field(0, 5);
        var.blue = field(11, 5);
        let (_, layout) = screen_info_to_geometry(&var, &fix).unwrap();
        assert_eq!(layout.pack([255, 0, 0]), 0x001F);
    }

    #[test]
    fn test_empty_bitfields_use_depth_default() {
        let (mut var, mut fix) = rgb565_screen();
        var.bits_per_pixel = 32;
        var.red = FbBitfield::default();
        var.green = FbBitfield::default();
        var.blue = FbBitfield::default();
        fix.line_length = 480 * 4;
        fix.smem_len = 480 * 4 * 320;
        let (_, layout) = screen_info_to_geometry(&var, &fix).unwrap();
        assert_eq!(layout, PixelLayout::xrgb8888());
    }

    #[test]
    fn test_pseudocolor_rejected() {
        let (var, mut fix) = rgb565_screen();
        fix.visual = 3;
        assert!(matches!(
            screen_info_to_geometry(&var, &fix),
            Err(DisplayError::UnsupportedPixelFormat(_))
        ));
    }

    #[test]
    fn test_eight_bit_rejected() {
        let (mut var, fix) = rgb565_screen();
        var.bits_per_pixel = 8;
        var.red = field(5, 3);
        var.green = field(2, 3);
        var.blue = field(0, 2);
        assert!(screen_info_to_geometry(&var, &fix).is_err());
    }

    #[test]
    fn test_line_length_too_short() {
        let (var, mut fix) = rgb565_screen();
        fix.line_length = 480;
        assert!(matches!(
            screen_info_to_geometry(&var, &fix),
            Err(DisplayError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_fix_id_trims_nul() {
        let mut fix = FbFixScreeninfo::default();
        fix.id[..6].copy_from_slice(b"BCM270");
        assert_eq!(fix.id(), "BCM270");
    }

    #[test]
    fn test_struct_sizes_match_kernel() {
        assert_eq!(std::mem::size_of::<FbVarScreeninfo>(), 160);
        let expected_fix = if std::mem::size_of::<libc::c_ulong>() == 8 { 80 } else { 68 };
        assert_eq!(std::mem::size_of::<FbFixScreeninfo>(), expected_fix);
    }
}
