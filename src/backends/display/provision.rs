// SPDX-License-Identifier: GPL-3.0-only

//! Framebuffer device provisioning
//!
//! On boards where the display driver is built as a module, `/dev/fb0` may
//! not exist until the module is loaded. This tries the usual candidates and,
//! if none produces the node, explains what the boot configuration is
//! missing. The boot configuration itself is only read, never edited.

use crate::constants::provisioning::{
    BOOT_CONFIGS, DEVICE_POLL_MS, DEVICE_WAIT_MS, FB_MODULES, VC4_OVERLAYS,
};
use crate::errors::{DisplayError, DisplayResult};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Make sure `device` exists, loading framebuffer modules if it does not
pub fn ensure_framebuffer(device: &Path) -> DisplayResult<()> {
    ensure_with(device, FB_MODULES, modprobe, Duration::from_millis(DEVICE_WAIT_MS))?;
    Ok(())
}

/// Provisioning with an injectable module loader
///
/// Returns the module that made the node appear, or `None` if it already
/// existed.
pub fn ensure_with<F>(
    device: &Path,
    modules: &[&str],
    mut load: F,
    wait: Duration,
) -> DisplayResult<Option<String>>
where
    F: FnMut(&str) -> bool,
{
    if device.exists() {
        return Ok(None);
    }

    warn!(device = %device.display(), "Framebuffer device missing, loading modules");

    for &module in modules {
        debug!(module, "Trying modprobe");
        if !load(module) {
            debug!(module, "modprobe failed");
            continue;
        }
        if wait_for(device, wait) {
            info!(device = %device.display(), module, "Framebuffer device appeared");
            return Ok(Some(module.to_string()));
        }
    }

    let boot_paths: Vec<&Path> = BOOT_CONFIGS.iter().map(Path::new).collect();
    Err(DisplayError::DeviceUnavailable(format!(
        "{} could not be created (tried modprobe for: {}). {}",
        device.display(),
        modules.join(", "),
        boot_config_hint(&boot_paths)
    )))
}

/// Load one kernel module, quietly
fn modprobe(module: &str) -> bool {
    match Command::new("modprobe")
        .arg(module)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        Ok(status) => status.success(),
        Err(e) => {
            debug!(error = %e, "Could not run modprobe");
            false
        }
    }
}

/// Poll for the device node until `timeout` elapses
fn wait_for(device: &Path, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if device.exists() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(Duration::from_millis(DEVICE_POLL_MS));
    }
}

/// Diagnostic derived from the first readable boot configuration file
pub fn boot_config_hint(paths: &[&Path]) -> String {
    for path in paths {
        let Ok(text) = std::fs::read_to_string(path) else {
            continue;
        };

        let has_overlay = text
            .lines()
            .map(str::trim)
            .any(|line| VC4_OVERLAYS.iter().any(|overlay| line.starts_with(overlay)));

        return if has_overlay {
            format!(
                "Found a vc4 overlay in {}, but the framebuffer device still did not appear. \
                 A reboot may be required.",
                path.display()
            )
        } else {
            format!(
                "No vc4 overlay found in {}. Add one of the following lines and reboot: {}",
                path.display(),
                VC4_OVERLAYS.join(" or ")
            )
        };
    }

    "Could not locate a boot config.txt to check for display overlays.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("fbcam-provision-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_existing_device_loads_nothing() {
        let path = temp_path("exists");
        std::fs::write(&path, b"").unwrap();

        let mut calls = 0;
        let result = ensure_with(
            &path,
            FB_MODULES,
            |_| {
                calls += 1;
                true
            },
            Duration::ZERO,
        );

        assert_eq!(result.unwrap(), None);
        assert_eq!(calls, 0);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_modules_tried_in_order() {
        let path = temp_path("appears");
        let _ = std::fs::remove_file(&path);

        let mut tried = Vec::new();
        let result = ensure_with(
            &path,
            FB_MODULES,
            |module| {
                tried.push(module.to_string());
                if module == "vc4" {
                    std::fs::write(&path, b"").unwrap();
                }
                module != "bcm2708_fb"
            },
            Duration::ZERO,
        );

        assert_eq!(result.unwrap().as_deref(), Some("vc4"));
        assert_eq!(tried, vec!["bcm2708_fb", "vc4"]);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_failure_is_device_unavailable() {
        let path = temp_path("never");
        let err = ensure_with(&path, FB_MODULES, |_| false, Duration::ZERO).unwrap_err();
        match err {
            DisplayError::DeviceUnavailable(msg) => assert!(msg.contains("drm_fbdev_generic")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hint_with_overlay() {
        let path = temp_path("config-with");
        std::fs::write(&path, "[all]\ndtoverlay=vc4-kms-v3d\n").unwrap();
        let hint = boot_config_hint(&[Path::new("/nonexistent/config.txt"), path.as_path()]);
        assert!(hint.contains("reboot may be required"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_hint_without_overlay() {
        let path = temp_path("config-without");
        std::fs::write(&path, "dtparam=audio=on\n").unwrap();
        let hint = boot_config_hint(&[path.as_path()]);
        assert!(hint.contains("No vc4 overlay"));
        assert!(hint.contains("dtoverlay=vc4-fkms-v3d"));
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_hint_without_config() {
        let hint = boot_config_hint(&[Path::new("/nonexistent/config.txt")]);
        assert!(hint.starts_with("Could not locate"));
    }
}
