// SPDX-License-Identifier: MPL-2.0

//! fbcam - USB camera to Linux framebuffer
//!
//! Pulls frames from a V4L2 camera, decodes and scales them, and writes them
//! straight into a memory-mapped framebuffer at a bounded frame rate. Meant
//! to run unattended on small boards driving an HDMI panel.
//!
//! # Architecture
//!
//! - [`backends`]: capture source (V4L2) and display sink (fbdev)
//! - [`media`]: transport decoding, scaling and pixel packing
//! - [`pipeline`]: controller state machine, pacing and failure escalation
//! - [`config`]: runtime configuration
//!
//! # Example
//!
//! ```ignore
//! let config = Config::resolve(None)?;
//! let source = V4l2Source::new(config.capture_config());
//! let display = FramebufferSink::new(config.display_config());
//! let stop = Arc::new(AtomicBool::new(false));
//! let outcome = PipelineController::new(source, display, config.pipeline_config(), stop).run()?;
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod media;
pub mod pipeline;

// Re-export commonly used types
pub use backends::capture::{CaptureConfig, DecodedFrame, FrameSource, V4l2Source};
pub use backends::display::{DisplayConfig, DisplayGeometry, DisplaySink, FramebufferSink};
pub use config::Config;
pub use errors::{CaptureError, DisplayError, PipelineError, PipelineResult};
pub use pipeline::{PipelineConfig, PipelineController, PipelineState, RunOutcome};
