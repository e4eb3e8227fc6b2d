// SPDX-License-Identifier: GPL-3.0-only

//! Loop pacing and throughput measurement

use std::time::{Duration, Instant};

/// Cooperative frame pacing
///
/// There is no catch-up: an iteration that overruns the interval is followed
/// immediately by the next one, and nothing is skipped.
#[derive(Debug, Clone, Copy)]
pub struct Pacer {
    interval: Duration,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Idle time left after an iteration that took `elapsed`
    pub fn idle_for(&self, elapsed: Duration) -> Option<Duration> {
        self.interval
            .checked_sub(elapsed)
            .filter(|remaining| !remaining.is_zero())
    }
}

/// Frames-per-second over fixed reporting windows
#[derive(Debug, Clone)]
pub struct FpsMeter {
    window: Duration,
    started: Instant,
    frames: u64,
}

impl FpsMeter {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            started: now,
            frames: 0,
        }
    }

    /// Count one frame; returns the rate when a window has completed
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.started);
        if elapsed < self.window {
            return None;
        }

        let fps = self.frames as f64 / elapsed.as_secs_f64();
        self.frames = 0;
        self.started = now;
        Some(fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_fills_remaining_interval() {
        let pacer = Pacer::new(Duration::from_secs_f64(1.0 / 15.0));
        let idle = pacer.idle_for(Duration::from_millis(10)).unwrap();
        let ms = idle.as_secs_f64() * 1000.0;
        assert!((ms - 56.667).abs() < 0.01, "idle was {ms} ms");
    }

    #[test]
    fn test_overrun_does_not_idle() {
        let pacer = Pacer::new(Duration::from_millis(66));
        assert_eq!(pacer.idle_for(Duration::from_millis(80)), None);
        assert_eq!(pacer.idle_for(Duration::from_millis(66)), None);
    }

    #[test]
    fn test_fps_reported_once_per_window() {
        let start = Instant::now();
        let mut meter = FpsMeter::new(Duration::from_secs(5), start);

        for i in 1..75 {
            assert!(meter.record(start + Duration::from_millis(i * 66)).is_none());
        }
        let fps = meter.record(start + Duration::from_secs(5)).unwrap();
        assert!((fps - 15.0).abs() < 0.01);

        // Counter restarts with the new window
        assert!(meter.record(start + Duration::from_secs(6)).is_none());
    }
}
