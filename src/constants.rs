/*
 *  constants.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
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

// panel
pub const DEFAULT_WIDTH: u32 = 128;
pub const DEFAULT_HEIGHT: u32 = 64;
pub const DEFAULT_I2C_BUS: &str = "/dev/i2c-1";
pub const DEFAULT_I2C_ADDRESS: u8 = 0x3C;
pub const DEFAULT_CAPTURE_PATH: &str = "/tmp/kvm-oled.pbm";

// text layout
pub const DEFAULT_FONT_SIZE: f32 = 10.0;
pub const DEFAULT_FONT_SPACING: i32 = 0;
pub const DEFAULT_INTERVAL_SECS: f64 = 5.0;

// hardware identity
pub const MODEL_PATH: &str = "/proc/device-tree/model";
pub const USB_DEVICES_PATH: &str = "/sys/bus/usb/devices";
pub const COMPUTE_MODULE_MARKER: &str = "Compute Module";

// metric sources
pub const THERMAL_PATH: &str = "/sys/class/thermal/thermal_zone0/temp";
pub const PROC_STAT_PATH: &str = "/proc/stat";
pub const OS_RELEASE_PATH: &str = "/etc/os-release";
pub const DEFAULT_MOUNT: &str = "/";

/// Shown in place of a numeric metric that could not be read.
pub const PLACEHOLDER: &str = "N/A";
/// Shown in place of an identity string that could not be read.
pub const IDENTITY_PLACEHOLDER: &str = "-";

pub const SPLASH_TEXT: &str = "Initializing...";
