// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Default device paths
pub mod devices {
    /// Framebuffer device used when none is configured
    pub const DEFAULT_FRAMEBUFFER: &str = "/dev/fb0";

    /// Prefix for V4L2 capture nodes, suffixed with the device index
    pub const VIDEO_DEVICE_PREFIX: &str = "/dev/video";
}

/// Capture defaults
pub mod capture {
    /// Default capture width (C270 class webcams)
    pub const DEFAULT_WIDTH: u32 = 640;

    /// Default capture height
    pub const DEFAULT_HEIGHT: u32 = 480;

    /// Driver-side buffer depth; one frame keeps capture-to-glass latency minimal
    pub const DEFAULT_BUFFER_DEPTH: u32 = 1;

    /// Default target frame rate
    pub const DEFAULT_TARGET_FPS: u32 = 15;

    /// Upper bound on a single dequeue before it counts as a failed read
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 2000;
}

/// Pipeline controller defaults
pub mod pipeline {
    /// Consecutive read failures before the capture device is reopened
    pub const DEFAULT_FAILURE_THRESHOLD: u32 = 30;

    /// Pause after a failed read before the next attempt
    pub const DEFAULT_RETRY_PAUSE_MS: u64 = 100;

    /// Capture open attempts at startup (the camera may still be enumerating)
    pub const DEFAULT_OPEN_ATTEMPTS: u32 = 10;

    /// First backoff between capture open attempts
    pub const DEFAULT_OPEN_BACKOFF_MS: u64 = 1000;

    /// Backoff ceiling between capture open attempts
    pub const DEFAULT_OPEN_BACKOFF_MAX_MS: u64 = 8000;
}

/// Timing constants
pub mod timing {
    /// Interval between throughput reports
    pub const FPS_REPORT_INTERVAL_SECS: u64 = 5;

    /// Frame counter modulo for periodic debug logging
    pub const FRAME_LOG_INTERVAL: u64 = 150;
}

/// Framebuffer provisioning
pub mod provisioning {
    /// Kernel modules that may expose a framebuffer, most likely first
    pub const FB_MODULES: &[&str] = &["bcm2708_fb", "vc4", "drm_fbdev_generic"];

    /// Boot firmware configuration locations (older and newer Raspberry Pi OS)
    pub const BOOT_CONFIGS: &[&str] = &["/boot/config.txt", "/boot/firmware/config.txt"];

    /// Overlay lines that enable the vc4 display driver
    pub const VC4_OVERLAYS: &[&str] = &["dtoverlay=vc4-kms-v3d", "dtoverlay=vc4-fkms-v3d"];

    /// How long to wait for the device node after a successful modprobe
    pub const DEVICE_WAIT_MS: u64 = 2000;

    /// Poll period while waiting for the device node
    pub const DEVICE_POLL_MS: u64 = 200;
}
