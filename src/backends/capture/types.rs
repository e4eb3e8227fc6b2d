// SPDX-License-Identifier: GPL-3.0-only

//! Shared types for capture sources

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Transport codec requested from the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Motion JPEG - compressed, lets USB 2.0 cameras reach full rate at 640x480
    #[default]
    Mjpeg,
    /// YUYV 4:2:2 - raw, no decode cost but heavy on USB bandwidth
    Yuyv,
}

impl Codec {
    /// V4L2 FourCC for this codec
    pub fn fourcc(&self) -> &'static [u8; 4] {
        match self {
            Codec::Mjpeg => b"MJPG",
            Codec::Yuyv => b"YUYV",
        }
    }

    /// Map a negotiated FourCC back to a codec this crate can decode
    pub fn from_fourcc(fourcc: &[u8; 4]) -> Option<Self> {
        match fourcc {
            b"MJPG" | b"JPEG" => Some(Codec::Mjpeg),
            b"YUYV" | b"YUY2" => Some(Codec::Yuyv),
            _ => None,
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.fourcc()))
    }
}

/// Requested capture parameters
///
/// Immutable once a source is opened; a different request means a new source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device index, resolved to `/dev/videoN`
    pub device_index: u32,
    /// Requested width
    pub width: u32,
    /// Requested height
    pub height: u32,
    /// Requested transport codec
    pub codec: Codec,
    /// Frames the driver may hold
    pub buffer_depth: u32,
    /// Requested frame interval
    pub frame_interval: Duration,
    /// Upper bound for a single dequeue
    pub read_timeout: Duration,
}

impl CaptureConfig {
    /// Requested frame rate, rounded to the nearest integer
    pub fn fps(&self) -> u32 {
        let secs = self.frame_interval.as_secs_f64();
        if secs > 0.0 {
            (1.0 / secs).round() as u32
        } else {
            0
        }
    }
}

/// Format the device actually agreed to
///
/// Drivers silently adjust resolution and codec requests; everything after
/// open works from these values, never from the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub width: u32,
    pub height: u32,
    pub codec: Codec,
    /// Bytes per line for raw transports, 0 when the driver leaves it unset
    pub stride: u32,
}

impl std::fmt::Display for NegotiatedFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{} {}", self.width, self.height, self.codec)
    }
}

/// Byte order of the three color channels in a decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

/// One decoded color frame
///
/// Produced fresh by every successful read and owned by the caller for one
/// pipeline iteration. Three bytes per pixel, rows `stride` bytes apart.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub width: u32,
    pub height: u32,
    /// Row length in bytes, at least `width * 3`
    pub stride: u32,
    pub order: ChannelOrder,
    pub data: Vec<u8>,
}

impl DecodedFrame {
    /// Bytes per pixel of every decoded frame
    pub const CHANNELS: usize = 3;

    /// Wrap a tightly packed RGB buffer
    ///
    /// Returns `None` if the buffer is too small for the dimensions.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        Self::with_layout(width, height, width * Self::CHANNELS as u32, ChannelOrder::Rgb, data)
    }

    /// Wrap a buffer with explicit stride and channel order
    pub fn with_layout(
        width: u32,
        height: u32,
        stride: u32,
        order: ChannelOrder,
        data: Vec<u8>,
    ) -> Option<Self> {
        let row_bytes = width as usize * Self::CHANNELS;
        if (stride as usize) < row_bytes {
            return None;
        }
        let required = match height as usize {
            0 => 0,
            h => (h - 1) * stride as usize + row_bytes,
        };
        if data.len() < required {
            return None;
        }

        Some(Self {
            width,
            height,
            stride,
            order,
            data,
        })
    }

    /// A frame filled with one color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Self {
        let data = rgb.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            stride: width * Self::CHANNELS as u32,
            order: ChannelOrder::Rgb,
            data,
        }
    }

    /// Pixel bytes of one row, without padding
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride as usize;
        &self.data[start..start + self.width as usize * Self::CHANNELS]
    }

    /// Pixel at (x, y) in R, G, B order regardless of storage order
    pub fn rgb_at(&self, x: u32, y: u32) -> [u8; 3] {
        let i = x as usize * Self::CHANNELS;
        let px = &self.row(y)[i..i + Self::CHANNELS];
        match self.order {
            ChannelOrder::Rgb => [px[0], px[1], px[2]],
            ChannelOrder::Bgr => [px[2], px[1], px[0]],
        }
    }

    /// Whether rows carry trailing padding
    pub fn is_packed(&self) -> bool {
        self.stride as usize == self.width as usize * Self::CHANNELS
    }

    /// Tightly packed copy of the pixel data (no row padding)
    pub fn packed_data(&self) -> Vec<u8> {
        if self.is_packed() {
            let len = self.width as usize * self.height as usize * Self::CHANNELS;
            return self.data[..len].to_vec();
        }
        let mut out =
            Vec::with_capacity(self.width as usize * self.height as usize * Self::CHANNELS);
        for y in 0..self.height {
            out.extend_from_slice(self.row(y));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fourcc_roundtrip() {
        assert_eq!(Codec::from_fourcc(Codec::Mjpeg.fourcc()), Some(Codec::Mjpeg));
        assert_eq!(Codec::from_fourcc(b"YUY2"), Some(Codec::Yuyv));
        assert_eq!(Codec::from_fourcc(b"H264"), None);
    }

    #[test]
    fn test_codec_display() {
        assert_eq!(Codec::Mjpeg.to_string(), "MJPG");
    }

    #[test]
    fn test_with_layout_rejects_short_buffer() {
        assert!(DecodedFrame::from_rgb(4, 2, vec![0; 23]).is_none());
        assert!(DecodedFrame::from_rgb(4, 2, vec![0; 24]).is_some());
        // stride smaller than a row
        assert!(DecodedFrame::with_layout(4, 2, 10, ChannelOrder::Rgb, vec![0; 64]).is_none());
    }

    #[test]
    fn test_bgr_pixel_access() {
        let frame =
            DecodedFrame::with_layout(1, 1, 4, ChannelOrder::Bgr, vec![10, 20, 30, 0]).unwrap();
        assert_eq!(frame.rgb_at(0, 0), [30, 20, 10]);
    }

    #[test]
    fn test_packed_data_strips_padding() {
        let data = vec![1, 2, 3, 0xEE, 4, 5, 6, 0xEE];
        let frame = DecodedFrame::with_layout(1, 2, 4, ChannelOrder::Rgb, data).unwrap();
        assert_eq!(frame.packed_data(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_fps_from_interval() {
        let config = CaptureConfig {
            device_index: 0,
            width: 640,
            height: 480,
            codec: Codec::Mjpeg,
            buffer_depth: 1,
            frame_interval: Duration::from_secs_f64(1.0 / 15.0),
            read_timeout: Duration::from_secs(2),
        };
        assert_eq!(config.fps(), 15);
    }
}
