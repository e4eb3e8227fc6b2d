// SPDX-License-Identifier: GPL-3.0-only

//! Device backends
//!
//! ```text
//! ┌──────────────────┐    DecodedFrame    ┌──────────────────┐
//! │  Capture Source  │ ─────────────────▶ │   Display Sink   │
//! │  (V4L2 camera)   │                    │ (fbdev mmap)     │
//! └──────────────────┘                    └──────────────────┘
//! ```
//!
//! Both sides are traits so the pipeline controller can be driven by
//! in-memory fakes in tests.
//!
//! # Modules
//!
//! - [`capture`]: camera device open, format negotiation, frame reads
//! - [`display`]: framebuffer geometry query, mapping, pixel conversion

pub mod capture;
pub mod display;
