// SPDX-License-Identifier: GPL-3.0-only

//! Linux framebuffer display sink

use super::blit::Blitter;
use super::mapped::MappedRegion;
use super::{DisplayConfig, DisplayGeometry, DisplaySink, fbdev, provision};
use crate::backends::capture::DecodedFrame;
use crate::errors::{DisplayError, DisplayResult};
use std::fs::{File, OpenOptions};
use tracing::{debug, info};

/// Display sink writing into a memory-mapped `/dev/fbN`
pub struct FramebufferSink {
    config: DisplayConfig,
    /// Declared before `file` so the mapping is released first
    region: Option<MappedRegion>,
    file: Option<File>,
    blitter: Option<Blitter>,
    frames_blitted: u64,
}

impl FramebufferSink {
    pub fn new(config: DisplayConfig) -> Self {
        Self {
            config,
            region: None,
            file: None,
            blitter: None,
            frames_blitted: 0,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn frames_blitted(&self) -> u64 {
        self.frames_blitted
    }
}

impl DisplaySink for FramebufferSink {
    fn open(&mut self) -> DisplayResult<()> {
        if self.region.is_some() {
            return Ok(());
        }

        let path = &self.config.device_path;
        if self.config.provision {
            provision::ensure_framebuffer(path)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| {
                DisplayError::DeviceUnavailable(format!("Failed to open {}: {}", path.display(), e))
            })?;

        let (geometry, layout) = fbdev::query(&file)?;
        let blitter = Blitter::new(geometry, layout, self.config.scale)?;

        let region = MappedRegion::map(&file, geometry.mapped_size).map_err(|e| {
            DisplayError::DeviceUnavailable(format!(
                "Failed to map {} bytes of {}: {}",
                geometry.mapped_size,
                path.display(),
                e
            ))
        })?;
        check_mapping(region.len(), &blitter)?;

        info!(
            device = %path.display(),
            geometry = %geometry,
            red = ?layout.red,
            green = ?layout.green,
            blue = ?layout.blue,
            scale_mode = ?self.config.scale.mode,
            "Framebuffer opened"
        );

        self.region = Some(region);
        self.file = Some(file);
        self.blitter = Some(blitter);
        Ok(())
    }

    fn blit(&mut self, frame: &DecodedFrame) {
        let (Some(region), Some(blitter)) = (self.region.as_mut(), self.blitter.as_ref()) else {
            return;
        };
        blitter.blit(frame, region.as_mut_slice());
        self.frames_blitted += 1;
    }

    fn close(&mut self) {
        if self.region.is_none() && self.file.is_none() {
            return;
        }

        self.region = None;
        self.file = None;
        self.blitter = None;
        debug!(frames = self.frames_blitted, "Framebuffer frames written");
        info!(device = %self.config.device_path.display(), "Framebuffer closed");
    }

    fn is_open(&self) -> bool {
        self.region.is_some()
    }

    fn geometry(&self) -> Option<DisplayGeometry> {
        self.blitter.as_ref().map(|b| *b.geometry())
    }
}

/// Reject a mapping that cannot hold every row the blitter writes
fn check_mapping(mapped: usize, blitter: &Blitter) -> DisplayResult<()> {
    let required = blitter.required_len();
    if mapped < required {
        return Err(DisplayError::InvalidGeometry(format!(
            "mapping of {} bytes is shorter than the {} bytes the visible area spans",
            mapped, required
        )));
    }
    Ok(())
}

impl Drop for FramebufferSink {
    fn drop(&mut self) {
        self.close();
    }
}
