// SPDX-License-Identifier: GPL-3.0-only

//! Capture source abstraction
//!
//! A capture source owns one camera device handle. The controller opens it,
//! pulls frames one at a time and closes it; reopening after repeated read
//! failures is just `close` followed by `open`.

pub mod types;
pub mod v4l2;

pub use types::*;
pub use v4l2::V4l2Source;

use crate::errors::CaptureResult;

/// Pull-based camera source
///
/// Implementations hold at most one frame in flight. Frames the caller is too
/// slow to take are dropped by the driver's own buffering, never queued here.
pub trait FrameSource {
    /// Open the device and negotiate the capture format
    ///
    /// Opening an already open source is a no-op.
    fn open(&mut self) -> CaptureResult<()>;

    /// Block until the next frame is available or the read timeout expires
    fn read(&mut self) -> CaptureResult<DecodedFrame>;

    /// Release the device handle
    ///
    /// Idempotent, and safe to call when `open` never succeeded.
    fn close(&mut self);

    /// Whether the device handle is currently held
    fn is_open(&self) -> bool;

    /// Format agreed with the device, `None` while closed
    fn negotiated(&self) -> Option<NegotiatedFormat>;
}
