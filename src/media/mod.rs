// SPDX-License-Identifier: GPL-3.0-only

//! Media processing between capture and display
//!
//! # Decoding
//!
//! Capture buffers arrive as MJPEG or YUYV. The [`decode`] module turns one
//! buffer into a [`DecodedFrame`](crate::backends::capture::DecodedFrame).
//!
//! # Scaling
//!
//! The [`scale`] module resizes decoded frames to the display resolution,
//! either stretched or letterboxed.
//!
//! # Pixel packing
//!
//! The [`pixel`] module packs 8-bit RGB into whatever bit layout the display
//! device declares (RGB565, XRGB8888, ...).

pub mod decode;
pub mod pixel;
pub mod scale;

// Re-export commonly used types
pub use decode::decode_frame;
pub use pixel::{Bitfield, PixelEncoder, PixelLayout};
pub use scale::{ScaleFilter, ScaleMode, ScaleOptions};
