// SPDX-License-Identifier: GPL-3.0-only

//! Capture to display pipeline control
//!
//! One synchronous loop owns both devices. A termination signal only flips a
//! shared flag; the controller notices it at the next loop boundary, so a
//! blit in progress always completes before the display is unmapped.

pub mod controller;
pub mod escalation;
pub mod pacing;

pub use controller::PipelineController;
pub use escalation::FailureTracker;
pub use pacing::{FpsMeter, Pacer};

use crate::constants::pipeline as defaults;
use crate::errors::PipelineResult;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::info;

/// Exit status for a startup failure (device missing, bad config)
pub const EXIT_FATAL_STARTUP: u8 = 1;

/// Exit status when capture could not be recovered
pub const EXIT_DEGRADED: u8 = 2;

/// Controller timing and recovery parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Target period of one capture/blit iteration
    pub frame_interval: Duration,
    /// Consecutive read failures that trigger one capture reopen
    pub failure_threshold: u32,
    /// Pause after a failed read
    pub retry_pause: Duration,
    /// Capture open attempts before startup gives up
    pub open_attempts: u32,
    /// First delay between open attempts
    pub open_backoff: Duration,
    /// Ceiling for the doubling open delay
    pub open_backoff_max: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            frame_interval: Duration::from_secs_f64(
                1.0 / crate::constants::capture::DEFAULT_TARGET_FPS as f64,
            ),
            failure_threshold: defaults::DEFAULT_FAILURE_THRESHOLD,
            retry_pause: Duration::from_millis(defaults::DEFAULT_RETRY_PAUSE_MS),
            open_attempts: defaults::DEFAULT_OPEN_ATTEMPTS,
            open_backoff: Duration::from_millis(defaults::DEFAULT_OPEN_BACKOFF_MS),
            open_backoff_max: Duration::from_millis(defaults::DEFAULT_OPEN_BACKOFF_MAX_MS),
        }
    }
}

/// Controller lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Opening capture, then display
    Starting,
    /// Capture, blit, pace
    Running,
    /// Closing display, then capture
    Draining,
    /// Terminal
    Stopped,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineState::Starting => "starting",
            PipelineState::Running => "running",
            PipelineState::Draining => "draining",
            PipelineState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// How a run that got past startup ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Stopped by a termination signal
    Clean,
    /// Capture failed and could not be reopened
    Degraded,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Clean => 0,
            RunOutcome::Degraded => EXIT_DEGRADED,
        }
    }
}

/// Route SIGINT, SIGTERM and SIGHUP to `stop`
///
/// May only be called once per process.
pub fn install_signal_handler(stop: Arc<AtomicBool>) -> PipelineResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
    })?;
    info!("Termination signal handler installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Clean.exit_code(), 0);
        assert_eq!(RunOutcome::Degraded.exit_code(), 2);
        assert_ne!(EXIT_FATAL_STARTUP, RunOutcome::Clean.exit_code());
    }

    #[test]
    fn test_default_interval_is_fifteen_fps() {
        let config = PipelineConfig::default();
        assert_eq!(config.frame_interval.as_micros(), 66_666);
        assert_eq!(config.failure_threshold, 30);
    }
}
