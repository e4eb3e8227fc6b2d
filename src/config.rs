// SPDX-License-Identifier: GPL-3.0-only

//! Runtime configuration
//!
//! The configuration is resolved once at startup (file, then command line
//! overrides) and handed to the pipeline as immutable values. Nothing re-reads
//! it while frames are flowing.

use crate::backends::capture::{CaptureConfig, Codec};
use crate::backends::display::DisplayConfig;
use crate::constants::{capture, devices, pipeline};
use crate::errors::{PipelineError, PipelineResult};
use crate::media::scale::{ScaleFilter, ScaleMode, ScaleOptions};
use crate::pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// File name looked up under the user configuration directory
const CONFIG_FILE_NAME: &str = "config.json";

/// Application directory under the user configuration directory
const CONFIG_DIR_NAME: &str = "fbcam";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// V4L2 device index (`/dev/videoN`)
    pub device_index: u32,
    /// Framebuffer device path
    pub fb_device: PathBuf,
    /// Requested capture width
    pub capture_width: u32,
    /// Requested capture height
    pub capture_height: u32,
    /// Transport codec requested from the camera
    pub codec: Codec,
    /// Frames held by the driver
    pub buffer_depth: u32,
    /// Target frame rate for both the camera and the display loop
    pub target_fps: u32,
    /// Upper bound for a single frame read
    pub read_timeout_ms: u64,
    /// Consecutive read failures that trigger a capture reopen
    pub failure_threshold: u32,
    /// Pause after a failed read
    pub retry_pause_ms: u64,
    /// Capture open attempts at startup
    pub open_attempts: u32,
    /// First backoff between open attempts, doubled each time
    pub open_backoff_ms: u64,
    /// Backoff ceiling
    pub open_backoff_max_ms: u64,
    /// Resampling filter
    pub scale_filter: ScaleFilter,
    /// Stretch to fill or letterbox
    pub scale_mode: ScaleMode,
    /// Try loading framebuffer kernel modules when the device node is missing
    pub provision_framebuffer: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_index: 0,
            fb_device: PathBuf::from(devices::DEFAULT_FRAMEBUFFER),
            capture_width: capture::DEFAULT_WIDTH,
            capture_height: capture::DEFAULT_HEIGHT,
            codec: Codec::Mjpeg,
            buffer_depth: capture::DEFAULT_BUFFER_DEPTH,
            target_fps: capture::DEFAULT_TARGET_FPS,
            read_timeout_ms: capture::DEFAULT_READ_TIMEOUT_MS,
            failure_threshold: pipeline::DEFAULT_FAILURE_THRESHOLD,
            retry_pause_ms: pipeline::DEFAULT_RETRY_PAUSE_MS,
            open_attempts: pipeline::DEFAULT_OPEN_ATTEMPTS,
            open_backoff_ms: pipeline::DEFAULT_OPEN_BACKOFF_MS,
            open_backoff_max_ms: pipeline::DEFAULT_OPEN_BACKOFF_MAX_MS,
            scale_filter: ScaleFilter::default(),
            scale_mode: ScaleMode::default(),
            provision_framebuffer: true,
        }
    }
}

impl Config {
    /// Default location of the configuration file (`~/.config/fbcam/config.json`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Parse a configuration file
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Resolve the configuration for this run
    ///
    /// An explicit path must exist. Without one, the default location is used
    /// if present, otherwise built-in defaults apply.
    pub fn resolve(explicit: Option<&Path>) -> PipelineResult<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No configuration file, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> PipelineResult<()> {
        let checks = [
            (self.capture_width == 0, "capture_width must be non-zero"),
            (self.capture_height == 0, "capture_height must be non-zero"),
            (self.target_fps == 0, "target_fps must be non-zero"),
            (self.buffer_depth == 0, "buffer_depth must be non-zero"),
            (self.failure_threshold == 0, "failure_threshold must be non-zero"),
            (self.open_attempts == 0, "open_attempts must be non-zero"),
        ];

        match checks.iter().find(|(failed, _)| *failed) {
            Some((_, msg)) => Err(PipelineError::Config(msg.to_string())),
            None => Ok(()),
        }
    }

    /// Target period between loop iterations
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.target_fps.max(1) as f64)
    }

    /// Capture source parameters
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            device_index: self.device_index,
            width: self.capture_width,
            height: self.capture_height,
            codec: self.codec,
            buffer_depth: self.buffer_depth,
            frame_interval: self.frame_interval(),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
        }
    }

    /// Display sink parameters
    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            device_path: self.fb_device.clone(),
            provision: self.provision_framebuffer,
            scale: ScaleOptions {
                filter: self.scale_filter,
                mode: self.scale_mode,
            },
        }
    }

    /// Controller parameters
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            frame_interval: self.frame_interval(),
            failure_threshold: self.failure_threshold,
            retry_pause: Duration::from_millis(self.retry_pause_ms),
            open_attempts: self.open_attempts,
            open_backoff: Duration::from_millis(self.open_backoff_ms),
            open_backoff_max: Duration::from_millis(self.open_backoff_max_ms),
        }
    }
}
