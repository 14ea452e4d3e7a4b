/*
 *  display/traits.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Core trait definitions for display driver abstraction
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

use crate::display::error::DisplayError;

/// Display capabilities and metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayCapabilities {
    /// Display width in pixels
    pub width: u32,

    /// Display height in pixels
    pub height: u32,

    /// Whether the display supports hardware rotation
    pub supports_rotation: bool,

    /// Whether the display supports contrast control
    pub supports_contrast: bool,
}

/// Minimal hardware abstraction over a monochrome panel.
///
/// Frames arrive packed as produced by [`crate::display::MonoFrame::to_packed_bytes`]:
/// row-major, 8 pixels per byte, least significant bit first.
pub trait DisplayDriver: Send {
    /// Returns the capabilities of this display
    fn capabilities(&self) -> &DisplayCapabilities;

    /// Returns the display dimensions as (width, height)
    fn dimensions(&self) -> (u32, u32) {
        let caps = self.capabilities();
        (caps.width, caps.height)
    }

    /// Initialize the display hardware
    fn init(&mut self) -> Result<(), DisplayError>;

    /// Set panel contrast (0-255)
    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError>;

    /// Replace the pending frame. Nothing is visible until [`DisplayDriver::flush`].
    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError>;

    /// Push the pending frame to the panel
    fn flush(&mut self) -> Result<(), DisplayError>;

    /// Blank the panel
    fn clear(&mut self) -> Result<(), DisplayError>;

    /// Set display rotation (if supported)
    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        if degrees != 0 && degrees != 90 && degrees != 180 && degrees != 270 {
            return Err(DisplayError::InvalidRotation(degrees));
        }
        Err(DisplayError::UnsupportedOperation)
    }

    /// Expected length of a packed frame
    fn buffer_len(&self) -> usize {
        let (w, h) = self.dimensions();
        ((w * h) as usize).div_ceil(8)
    }
}

/// Unpack an LSB-first packed frame into on/off pixels.
pub fn unpack_bits(buffer: &[u8], pixels: usize) -> impl Iterator<Item = bool> + '_ {
    (0..pixels).map(move |i| buffer.get(i / 8).is_some_and(|byte| byte & (1 << (i % 8)) != 0))
}
