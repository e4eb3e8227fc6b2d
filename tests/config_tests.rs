// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use fbcam::Config;
use fbcam::media::{ScaleFilter, ScaleMode};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert_eq!(config.device_index, 0);
    assert_eq!(config.fb_device, PathBuf::from("/dev/fb0"));
    assert_eq!((config.capture_width, config.capture_height), (640, 480));
    assert_eq!(config.target_fps, 15);
    assert!(config.provision_framebuffer);
    assert!(config.validate().is_ok(), "Defaults should be runnable");
}

#[test]
fn test_config_json_roundtrip_keeps_values() {
    let config = Config {
        device_index: 1,
        scale_mode: ScaleMode::Fit,
        scale_filter: ScaleFilter::Linear,
        ..Default::default()
    };

    let json = serde_json::to_string_pretty(&config).unwrap();
    assert!(json.contains("\"scale_mode\": \"fit\""));
    let parsed: Config = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_config_load_from_file() {
    let path = std::env::temp_dir().join(format!("fbcam-config-{}.json", std::process::id()));
    std::fs::write(&path, r#"{ "fb_device": "/dev/fb1", "target_fps": 30 }"#).unwrap();

    let config = Config::resolve(Some(&path)).unwrap();
    assert_eq!(config.fb_device, PathBuf::from("/dev/fb1"));
    assert_eq!(config.target_fps, 30);
    assert_eq!(config.failure_threshold, 30);
    std::fs::remove_file(path).ok();
}

#[test]
fn test_config_rejects_malformed_file() {
    let path = std::env::temp_dir().join(format!("fbcam-bad-{}.json", std::process::id()));
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::resolve(Some(&path)).is_err());
    std::fs::remove_file(path).ok();
}

#[test]
fn test_config_derived_values() {
    let config = Config::default();

    let pipeline = config.pipeline_config();
    assert_eq!(pipeline.failure_threshold, 30);
    assert_eq!(pipeline.retry_pause, Duration::from_millis(100));
    assert_eq!(pipeline.open_backoff, Duration::from_secs(1));
    assert_eq!(pipeline.open_backoff_max, Duration::from_secs(8));

    let display = config.display_config();
    assert_eq!(display.device_path, PathBuf::from("/dev/fb0"));
    assert_eq!(display.scale.mode, ScaleMode::Stretch);
    assert_eq!(display.scale.filter, ScaleFilter::Nearest);

    let capture = config.capture_config();
    assert_eq!(capture.read_timeout, Duration::from_secs(2));
    assert_eq!(capture.fps(), 15);
}

#[test]
fn test_config_zero_threshold_invalid() {
    let config = Config {
        failure_threshold: 0,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}
