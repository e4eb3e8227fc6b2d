// SPDX-License-Identifier: GPL-3.0-only

//! Transport decoding
//!
//! Turns one dequeued capture buffer into a [`DecodedFrame`]. MJPEG goes
//! through the `image` JPEG decoder; YUYV is converted on the CPU.

use crate::backends::capture::{Codec, DecodedFrame, NegotiatedFormat};
use crate::errors::{CaptureError, CaptureResult};
use image::ImageFormat;

/// Decode a capture buffer according to the negotiated format
pub fn decode_frame(format: &NegotiatedFormat, data: &[u8]) -> CaptureResult<DecodedFrame> {
    if data.is_empty() {
        return Err(CaptureError::ReadFailure("empty buffer".to_string()));
    }

    match format.codec {
        Codec::Mjpeg => decode_mjpeg(data),
        Codec::Yuyv => decode_yuyv(data, format.width, format.height, format.stride),
    }
}

/// Decode one MJPEG frame
///
/// The decoded dimensions are authoritative: some UVC cameras keep sending
/// the previous mode for a few frames after a format switch.
pub fn decode_mjpeg(data: &[u8]) -> CaptureResult<DecodedFrame> {
    let img = image::load_from_memory_with_format(data, ImageFormat::Jpeg)
        .map_err(|e| CaptureError::Decode(e.to_string()))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    DecodedFrame::from_rgb(width, height, rgb.into_raw())
        .ok_or_else(|| CaptureError::Decode("decoder returned a short buffer".to_string()))
}

/// Convert YUYV (YUV 4:2:2) to RGB
///
/// YUYV format: Y0 U Y1 V - each 4-byte group encodes 2 pixels.
/// Uses BT.601 coefficients. `stride` of 0 means tightly packed rows.
pub fn decode_yuyv(
    data: &[u8],
    width: u32,
    height: u32,
    stride: u32,
) -> CaptureResult<DecodedFrame> {
    let packed_row = width as usize * 2;
    let stride = if stride == 0 { packed_row } else { stride as usize };
    let required = match height as usize {
        0 => 0,
        h => (h - 1) * stride + packed_row,
    };

    if width % 2 != 0 || stride < packed_row || data.len() < required {
        return Err(CaptureError::Decode(format!(
            "YUYV buffer of {} bytes does not hold {}x{} (stride {})",
            data.len(),
            width,
            height,
            stride
        )));
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * DecodedFrame::CHANNELS);

    for y in 0..height as usize {
        let row = &data[y * stride..y * stride + packed_row];
        for chunk in row.chunks_exact(4) {
            let y0 = chunk[0] as f32;
            let u = chunk[1] as f32 - 128.0;
            let y1 = chunk[2] as f32;
            let v = chunk[3] as f32 - 128.0;

            for luma in [y0, y1] {
                rgb.push((luma + 1.402 * v).clamp(0.0, 255.0) as u8);
                rgb.push((luma - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8);
                rgb.push((luma + 1.772 * u).clamp(0.0, 255.0) as u8);
            }
        }
    }

    DecodedFrame::from_rgb(width, height, rgb)
        .ok_or_else(|| CaptureError::Decode("YUYV conversion produced a short buffer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{ExtendedColorType, RgbImage};

    fn encode_jpeg(img: &RgbImage) -> Vec<u8> {
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, 95)
            .encode(img.as_raw(), img.width(), img.height(), ExtendedColorType::Rgb8)
            .unwrap();
        out
    }

    #[test]
    fn test_mjpeg_gray_frame() {
        let img = RgbImage::from_pixel(32, 16, image::Rgb([128, 128, 128]));
        let frame = decode_mjpeg(&encode_jpeg(&img)).unwrap();

        assert_eq!((frame.width, frame.height), (32, 16));
        assert!(frame.is_packed());
        for px in frame.data.chunks_exact(3) {
            for &c in px {
                assert!(c.abs_diff(128) <= 3, "channel {} too far from 128", c);
            }
        }
    }

    #[test]
    fn test_mjpeg_garbage_is_decode_error() {
        let err = decode_mjpeg(&[0xFF, 0xD8, 0x00, 0x01, 0x02]).unwrap_err();
        assert!(matches!(err, CaptureError::Decode(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_yuyv_white_and_black() {
        // white pixel pair then black pixel pair
        let data = vec![255u8, 128, 255, 128, 0, 128, 0, 128];
        let frame = decode_yuyv(&data, 4, 1, 0).unwrap();

        assert!(frame.rgb_at(0, 0).iter().all(|&c| c > 250));
        assert!(frame.rgb_at(1, 0).iter().all(|&c| c > 250));
        assert_eq!(frame.rgb_at(2, 0), [0, 0, 0]);
        assert_eq!(frame.rgb_at(3, 0), [0, 0, 0]);
    }

    #[test]
    fn test_yuyv_honors_stride() {
        // 2x2, rows padded to 8 bytes; padding must not leak into pixels
        let data = vec![
            255u8, 128, 255, 128, 9, 9, 9, 9, //
            0, 128, 0, 128, 9, 9, 9, 9,
        ];
        let frame = decode_yuyv(&data, 2, 2, 8).unwrap();

        assert!(frame.rgb_at(0, 0)[0] > 250);
        assert_eq!(frame.rgb_at(0, 1), [0, 0, 0]);
        assert_eq!(frame.data.len(), 12);
    }

    #[test]
    fn test_yuyv_short_buffer() {
        assert!(decode_yuyv(&[0u8; 6], 4, 1, 0).is_err());
    }

    #[test]
    fn test_empty_buffer_is_read_failure() {
        let format = NegotiatedFormat {
            width: 640,
            height: 480,
            codec: Codec::Mjpeg,
            stride: 0,
        };
        assert!(matches!(
            decode_frame(&format, &[]),
            Err(CaptureError::ReadFailure(_))
        ));
    }
}
