/*
 *  geometry.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Panel geometry detection from hardware identity
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

use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::Config;
use crate::constants::{COMPUTE_MODULE_MARKER, USB_DEVICES_PATH};

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("cannot read device identity {path}: {source}")]
    Identity {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Height and rotation profile of the attached panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub height: u32,
    pub rotation: u16,
}

/// Compute-module carrier boards ship the 128x64 panel mounted upside down.
pub const LARGE_PANEL: Geometry = Geometry { height: 64, rotation: 180 };
pub const SMALL_PANEL: Geometry = Geometry { height: 32, rotation: 0 };

/// Enumerates attached USB peripherals.
pub trait UsbProbe {
    fn peripheral_count(&self) -> usize;
}

/// Walks `/sys/bus/usb/devices`, skipping root hubs and interface nodes.
#[derive(Debug, Clone)]
pub struct SysfsUsbProbe {
    root: PathBuf,
    filter: Option<(u16, u16)>,
}

impl SysfsUsbProbe {
    pub fn new(filter: Option<(u16, u16)>) -> Self {
        Self::with_root(USB_DEVICES_PATH, filter)
    }

    pub fn with_root(root: impl Into<PathBuf>, filter: Option<(u16, u16)>) -> Self {
        Self { root: root.into(), filter }
    }

    fn read_id(dir: &Path, name: &str) -> Option<u16> {
        let raw = fs::read_to_string(dir.join(name)).ok()?;
        u16::from_str_radix(raw.trim(), 16).ok()
    }

    fn matches(&self, dir: &Path) -> bool {
        match self.filter {
            None => dir.join("idVendor").exists(),
            Some((vendor, product)) => {
                Self::read_id(dir, "idVendor") == Some(vendor)
                    && Self::read_id(dir, "idProduct") == Some(product)
            }
        }
    }
}

impl UsbProbe for SysfsUsbProbe {
    fn peripheral_count(&self) -> usize {
        let Ok(entries) = fs::read_dir(&self.root) else {
            debug!("USB enumeration unavailable at {}", self.root.display());
            return 0;
        };

        entries
            .flatten()
            .filter(|entry| {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                !name.starts_with("usb") && !name.contains(':')
            })
            .filter(|entry| self.matches(&entry.path()))
            .count()
    }
}

/// Parse a `vendor:product` pair written in hex, e.g. `1d6b:0104`.
pub fn parse_usb_id(s: &str) -> Option<(u16, u16)> {
    let (vendor, product) = s.split_once(':')?;
    Some((
        u16::from_str_radix(vendor.trim(), 16).ok()?,
        u16::from_str_radix(product.trim(), 16).ok()?,
    ))
}

/// Pick the panel profile from the device-tree model and USB enumeration.
pub fn detect(model_path: &Path, probe: &dyn UsbProbe) -> Result<Geometry, GeometryError> {
    let model = fs::read_to_string(model_path).map_err(|source| GeometryError::Identity {
        path: model_path.to_path_buf(),
        source,
    })?;
    let model = model.trim_end_matches('\0').trim();

    let geometry = if model.contains(COMPUTE_MODULE_MARKER) && probe.peripheral_count() > 0 {
        LARGE_PANEL
    } else {
        SMALL_PANEL
    };

    info!("Detected '{}' -> {}px panel, rotation {}", model, geometry.height, geometry.rotation);
    Ok(geometry)
}

/// Fill in height and rotation the user did not set explicitly.
pub fn apply(cfg: &mut Config, probe: &dyn UsbProbe) -> Result<(), GeometryError> {
    let metrics = cfg.metrics();
    let display = cfg.display.get_or_insert_with(Default::default);
    if display.height.is_some() && display.rotate_deg.is_some() {
        debug!("Panel geometry given explicitly, skipping detection");
        return Ok(());
    }

    let detected = detect(&metrics.model_path(), probe)?;
    display.height.get_or_insert(detected.height);
    display.rotate_deg.get_or_insert(detected.rotation);
    Ok(())
}
