// SPDX-License-Identifier: GPL-3.0-only

//! V4L2 capture source
//!
//! Uses the v4l crate for format negotiation and memory-mapped streaming.
//! The driver keeps `buffer_depth` buffers; with one or two buffers the frame
//! we dequeue is close to the newest the sensor produced.

use super::types::*;
use super::FrameSource;
use crate::constants::devices::VIDEO_DEVICE_PREFIX;
use crate::errors::{CaptureError, CaptureResult};
use crate::media::decode_frame;
use std::io;
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::traits::{CaptureStream, Stream};
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::video::capture::Parameters;
use v4l::{Format, FourCC};

/// Camera source backed by a `/dev/videoN` node
pub struct V4l2Source {
    config: CaptureConfig,
    /// Declared before `device` so the stream is torn down first
    stream: Option<MmapStream<'static>>,
    device: Option<Device>,
    negotiated: Option<NegotiatedFormat>,
    frames_read: u64,
    /// Driver sequence number of the last frame read
    last_sequence: Option<u32>,
    frames_dropped: u64,
}

impl V4l2Source {
    /// Create an unopened source for the given request
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stream: None,
            device: None,
            negotiated: None,
            frames_read: 0,
            last_sequence: None,
            frames_dropped: 0,
        }
    }

    /// Device node for the configured index
    pub fn device_path(&self) -> String {
        format!("{}{}", VIDEO_DEVICE_PREFIX, self.config.device_index)
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Request resolution and codec, then read back what the driver chose
    fn negotiate(&self, device: &Device) -> CaptureResult<NegotiatedFormat> {
        let requested = Format::new(
            self.config.width,
            self.config.height,
            FourCC::new(self.config.codec.fourcc()),
        );

        let actual = match device.set_format(&requested) {
            Ok(format) => format,
            Err(e) => {
                warn!(error = %e, "Could not set format, using current device format");
                device.format().map_err(|e| {
                    CaptureError::DeviceUnavailable(format!("Failed to query format: {}", e))
                })?
            }
        };

        let codec = Codec::from_fourcc(&actual.fourcc.repr).ok_or_else(|| {
            CaptureError::DeviceUnavailable(format!(
                "Device negotiated {} which cannot be decoded",
                actual.fourcc
            ))
        })?;

        if codec != self.config.codec {
            warn!(
                requested = %self.config.codec,
                got = %codec,
                "Device did not accept requested codec"
            );
        }
        if actual.width != self.config.width || actual.height != self.config.height {
            warn!(
                requested_width = self.config.width,
                requested_height = self.config.height,
                width = actual.width,
                height = actual.height,
                "Device adjusted the requested resolution"
            );
        }

        Ok(NegotiatedFormat {
            width: actual.width,
            height: actual.height,
            codec,
            stride: actual.stride,
        })
    }
}

impl FrameSource for V4l2Source {
    fn open(&mut self) -> CaptureResult<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let path = self.device_path();
        info!(
            device_path = %path,
            width = self.config.width,
            height = self.config.height,
            codec = %self.config.codec,
            "Opening capture device"
        );

        let device = Device::with_path(&path).map_err(|e| {
            CaptureError::DeviceUnavailable(format!("Failed to open {}: {}", path, e))
        })?;

        let negotiated = self.negotiate(&device)?;

        let fps = self.config.fps();
        if fps > 0 {
            match device.set_params(&Parameters::with_fps(fps)) {
                Ok(params) => debug!(interval = %params.interval, "Set frame interval"),
                Err(e) => warn!(error = %e, fps, "Device rejected frame interval"),
            }
        }

        let mut stream =
            MmapStream::with_buffers(&device, Type::VideoCapture, self.config.buffer_depth)
                .map_err(|e| {
                    CaptureError::DeviceUnavailable(format!(
                        "Failed to create buffer stream: {}",
                        e
                    ))
                })?;
        stream.set_timeout(self.config.read_timeout);

        info!(
            format = %negotiated,
            buffers = self.config.buffer_depth,
            "Capture device opened"
        );

        self.negotiated = Some(negotiated);
        self.stream = Some(stream);
        self.device = Some(device);
        Ok(())
    }

    fn read(&mut self) -> CaptureResult<DecodedFrame> {
        let (Some(stream), Some(format)) = (self.stream.as_mut(), self.negotiated) else {
            return Err(CaptureError::ReadFailure("capture device not open".to_string()));
        };

        let (buf, meta) = match stream.next() {
            Ok(next) => next,
            Err(e) => return Err(rearm(stream, e)),
        };

        // bytesused is 0 on some drivers for raw formats
        let used = match meta.bytesused as usize {
            0 => buf.len(),
            n => n.min(buf.len()),
        };

        let sequence = meta.sequence;
        let frame = decode_frame(&format, &buf[..used])?;

        let skipped = skipped_frames(self.last_sequence, sequence);
        if skipped > 0 {
            debug!(skipped, sequence, "Driver dropped frames");
            self.frames_dropped += u64::from(skipped);
        }
        self.last_sequence = Some(sequence);

        self.frames_read += 1;
        if self.frames_read % crate::constants::timing::FRAME_LOG_INTERVAL == 0 {
            debug!(
                frames = self.frames_read,
                dropped = self.frames_dropped,
                sequence,
                bytes = used,
                "Capture progress"
            );
        }

        Ok(frame)
    }

    fn close(&mut self) {
        if self.stream.is_none() && self.device.is_none() {
            return;
        }

        // Stream first: dropping it stops streaming and unmaps driver buffers
        self.stream = None;
        self.device = None;
        self.negotiated = None;
        self.last_sequence = None;
        info!(
            device_path = %self.device_path(),
            frames = self.frames_read,
            dropped = self.frames_dropped,
            "Capture device closed"
        );
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    fn negotiated(&self) -> Option<NegotiatedFormat> {
        self.negotiated
    }
}

/// Recover a stream after a failed dequeue
///
/// A timed-out dequeue leaves the current buffer queued in the driver, and
/// queueing it again on the next read fails. Stopping the stream returns
/// every buffer to userspace so the next read queues them all and restarts
/// streaming.
fn rearm<S: Stream>(stream: &mut S, error: io::Error) -> CaptureError {
    if let Err(e) = stream.stop() {
        warn!(error = %e, "Failed to stop capture stream after read error");
    }
    CaptureError::ReadFailure(error.to_string())
}

/// Frames missing between two driver sequence numbers
fn skipped_frames(previous: Option<u32>, current: u32) -> u32 {
    match previous {
        Some(prev) => current.wrapping_sub(prev).saturating_sub(1),
        None => 0,
    }
}

impl Drop for V4l2Source {
    fn drop(&mut self) {
        self.close();
    }
}
