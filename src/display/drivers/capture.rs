/*
 *  display/drivers/capture.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Emulated panel that writes every flushed frame to a PBM file
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::DisplayConfig;
use crate::display::error::DisplayError;
use crate::display::traits::{unpack_bits, DisplayCapabilities, DisplayDriver};

use log::{debug, info};

/// Headless stand-in for the panel.
///
/// The capture file always holds the last flushed frame as a plain (P1)
/// PBM, so it can be inspected with any image viewer while the daemon runs.
/// A 180° panel is written upside down like the glass shows it; quarter
/// turns are written in drawing orientation.
#[derive(Debug)]
pub struct CaptureDriver {
    path: PathBuf,
    capabilities: DisplayCapabilities,
    rotation: u16,
    pending: Vec<u8>,
    contrast: Option<u8>,
    frames: usize,
}

impl CaptureDriver {
    /// Built at the configured size, unrotated. Rotation is applied after
    /// init through [`DisplayDriver::set_rotation`].
    pub fn new(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let width = config.width();
        let height = config.height();
        if width == 0 || height == 0 {
            return Err(DisplayError::InvalidConfiguration(format!(
                "Invalid capture size: {}x{}",
                width, height
            )));
        }

        Ok(Self {
            path: config.capture_path(),
            capabilities: DisplayCapabilities {
                width,
                height,
                supports_rotation: true,
                supports_contrast: true,
            },
            rotation: 0,
            pending: Vec::new(),
            contrast: None,
            frames: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Frames written so far
    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn contrast(&self) -> Option<u8> {
        self.contrast
    }

    fn to_pbm(&self) -> String {
        let (w, h) = (self.capabilities.width as usize, self.capabilities.height as usize);
        let mut out = String::with_capacity(w * h * 2 + 16);
        let _ = writeln!(out, "P1\n{} {}", w, h);
        let mut pixels: Vec<bool> = unpack_bits(&self.pending, w * h).collect();
        if self.rotation == 180 {
            pixels.reverse();
        }
        for (i, on) in pixels.into_iter().enumerate() {
            out.push(if on { '1' } else { '0' });
            out.push(if (i + 1) % w == 0 { '\n' } else { ' ' });
        }
        out
    }
}

impl DisplayDriver for CaptureDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        self.pending = vec![0; self.buffer_len()];
        info!(
            "Capture display {}x{} -> {}",
            self.capabilities.width,
            self.capabilities.height,
            self.path.display()
        );
        Ok(())
    }

    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError> {
        self.contrast = Some(value);
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.buffer_len();
        if buffer.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: buffer.len() });
        }
        self.pending.clear();
        self.pending.extend_from_slice(buffer);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        fs::write(&self.path, self.to_pbm())?;
        self.frames += 1;
        debug!("Captured frame {} to {}", self.frames, self.path.display());
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.pending = vec![0; self.buffer_len()];
        self.flush()
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let caps = &mut self.capabilities;
        let landscape = caps.width >= caps.height;
        let (long, short) = if landscape { (caps.width, caps.height) } else { (caps.height, caps.width) };
        (caps.width, caps.height) = match degrees {
            0 | 180 => (long, short),
            90 | 270 => (short, long),
            other => return Err(DisplayError::InvalidRotation(other)),
        };
        self.rotation = degrees;
        self.pending = vec![0; self.buffer_len()];
        debug!("Capture rotation {}°", degrees);
        Ok(())
    }
}
