// SPDX-License-Identifier: GPL-3.0-only

//! Pipeline controller state machine
//!
//! ```text
//! Starting ──> Running ──> Draining ──> Stopped
//!     │                                    ^
//!     └──────── startup failure ───────────┘
//! ```
//!
//! Capture is opened before the display and closed after it. Any startup
//! failure releases whatever was already acquired before returning.

use super::{FailureTracker, FpsMeter, Pacer, PipelineConfig, PipelineState, RunOutcome};
use crate::backends::capture::FrameSource;
use crate::backends::display::DisplaySink;
use crate::constants::timing::FPS_REPORT_INTERVAL_SECS;
use crate::errors::{CaptureError, PipelineError, PipelineResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Longest single sleep before the stop flag is checked again
const STOP_POLL_SLICE: Duration = Duration::from_millis(50);

/// Result of one capture-blit iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Blitted,
    Failed,
    CaptureLost,
}

/// Owns a capture source and a display sink and drives frames between them
pub struct PipelineController<S: FrameSource, D: DisplaySink> {
    source: S,
    display: D,
    config: PipelineConfig,
    stop: Arc<AtomicBool>,
    state: PipelineState,
    history: Vec<PipelineState>,
    failures: FailureTracker,
    pacer: Pacer,
    frames_blitted: u64,
    reopen_count: u32,
}

impl<S: FrameSource, D: DisplaySink> PipelineController<S, D> {
    pub fn new(source: S, display: D, config: PipelineConfig, stop: Arc<AtomicBool>) -> Self {
        Self {
            source,
            display,
            failures: FailureTracker::new(config.failure_threshold),
            pacer: Pacer::new(config.frame_interval),
            config,
            stop,
            state: PipelineState::Starting,
            history: vec![PipelineState::Starting],
            frames_blitted: 0,
            reopen_count: 0,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Every state entered so far, in order
    pub fn history(&self) -> &[PipelineState] {
        &self.history
    }

    pub fn frames_blitted(&self) -> u64 {
        self.frames_blitted
    }

    /// Capture reopen attempts made by failure escalation
    pub fn reopen_count(&self) -> u32 {
        self.reopen_count
    }

    pub fn failures(&self) -> &FailureTracker {
        &self.failures
    }

    pub fn into_parts(self) -> (S, D) {
        (self.source, self.display)
    }

    /// Run until a termination signal or unrecoverable capture loss
    ///
    /// Returns an error only for startup failures; both devices are closed
    /// in every case by the time this returns.
    pub fn run(&mut self) -> PipelineResult<RunOutcome> {
        if let Err(e) = self.start() {
            self.transition(PipelineState::Stopped);
            return Err(e);
        }

        if self.stop_requested() {
            // Signal arrived while capture was still being opened
            self.drain();
            return Ok(RunOutcome::Clean);
        }

        self.transition(PipelineState::Running);
        let outcome = self.run_loop();
        self.drain();

        match outcome {
            RunOutcome::Clean => info!(frames = self.frames_blitted, "Pipeline stopped"),
            RunOutcome::Degraded => error!(
                frames = self.frames_blitted,
                failures = self.failures.total(),
                "Pipeline stopped after capture could not be recovered"
            ),
        }
        Ok(outcome)
    }

    fn start(&mut self) -> PipelineResult<()> {
        self.open_source()?;
        if !self.source.is_open() {
            return Ok(());
        }

        if let Err(e) = self.display.open() {
            error!(error = %e, "Display open failed, releasing capture");
            self.source.close();
            return Err(e.into());
        }

        let ready = (self.source.negotiated(), self.display.geometry());
        if let (Some(format), Some(geometry)) = ready {
            info!(capture = %format, display = %geometry, "Pipeline ready");
        }
        Ok(())
    }

    /// Open capture with doubling backoff; the camera may still be enumerating
    ///
    /// Leaves the source closed without error if a stop is requested while
    /// waiting.
    fn open_source(&mut self) -> PipelineResult<()> {
        let attempts = self.config.open_attempts.max(1);
        let mut backoff = self.config.open_backoff;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.source.open() {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "Capture open failed");
                    last_error = Some(e);
                }
            }

            if attempt == attempts {
                break;
            }
            if !self.sleep_unless_stopped(backoff) {
                info!("Stop requested while waiting for capture device");
                return Ok(());
            }
            backoff = (backoff * 2).min(self.config.open_backoff_max);
        }

        let error = last_error
            .unwrap_or_else(|| CaptureError::DeviceUnavailable("no open attempt made".to_string()));
        Err(PipelineError::Capture(error))
    }

    fn run_loop(&mut self) -> RunOutcome {
        let mut fps = FpsMeter::new(Duration::from_secs(FPS_REPORT_INTERVAL_SECS), Instant::now());

        while !self.stop_requested() {
            let started = Instant::now();

            match self.step() {
                Step::Blitted => {
                    if let Some(rate) = fps.record(Instant::now()) {
                        info!("Throughput: {:.1} FPS", rate);
                    }
                    if let Some(idle) = self.pacer.idle_for(started.elapsed()) {
                        self.sleep_unless_stopped(idle);
                    }
                }
                Step::Failed => {
                    self.sleep_unless_stopped(self.config.retry_pause);
                }
                Step::CaptureLost => return RunOutcome::Degraded,
            }
        }

        info!("Termination requested");
        RunOutcome::Clean
    }

    fn step(&mut self) -> Step {
        let error = match self.source.read() {
            Ok(frame) => {
                self.failures.record_success();
                self.display.blit(&frame);
                self.frames_blitted += 1;
                return Step::Blitted;
            }
            Err(e) => e,
        };

        let escalate = self.failures.record_failure() || !error.is_transient();
        warn!(
            error = %error,
            consecutive = self.failures.consecutive(),
            threshold = self.failures.threshold(),
            "Failed to grab frame"
        );

        if !escalate {
            return Step::Failed;
        }
        if self.reopen_source() {
            Step::Failed
        } else {
            Step::CaptureLost
        }
    }

    /// One close + open cycle of the capture source
    fn reopen_source(&mut self) -> bool {
        self.reopen_count += 1;
        warn!(
            consecutive = self.failures.consecutive(),
            "Too many consecutive read failures, reopening capture device"
        );

        self.source.close();
        match self.source.open() {
            Ok(()) => {
                info!("Capture device reopened");
                self.failures.reset();
                true
            }
            Err(e) => {
                error!(error = %e, "Capture reopen failed");
                false
            }
        }
    }

    /// Display first, then capture
    fn drain(&mut self) {
        self.transition(PipelineState::Draining);
        self.display.close();
        self.source.close();
        self.transition(PipelineState::Stopped);
    }

    fn transition(&mut self, next: PipelineState) {
        if self.state == next {
            return;
        }
        debug!(from = %self.state, to = %next, "Pipeline state");
        self.state = next;
        self.history.push(next);
    }

    fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    /// Sleep in short slices; false if a stop was requested
    fn sleep_unless_stopped(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.stop_requested() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep((deadline - now).min(STOP_POLL_SLICE));
        }
    }
}
