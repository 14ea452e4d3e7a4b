/*
 *  display/drivers/ssd1306.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  SSD1306 OLED display driver implementation
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

use linux_embedded_hal::I2cdev;
use ssd1306::{
    mode::BufferedGraphicsMode,
    prelude::*,
    size::{DisplaySize128x32, DisplaySize128x64},
    I2CDisplayInterface,
    Ssd1306,
};
// crate::config::DisplayConfig shadows the prelude trait of the same name
use ssd1306::prelude::DisplayConfig as _;

use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;

use crate::config::{BusConfig, DisplayConfig};
use crate::display::error::DisplayError;
use crate::display::traits::{unpack_bits, DisplayCapabilities, DisplayDriver};

use log::{debug, info};

type Panel<S> = Ssd1306<I2CInterface<I2cdev>, S, BufferedGraphicsMode<S>>;

/// Both supported panel sizes share one code path through [`with_panel!`].
enum Ssd1306Variants {
    Size128x64(Panel<DisplaySize128x64>),
    Size128x32(Panel<DisplaySize128x32>),
}

macro_rules! with_panel {
    ($variants:expr, $panel:ident => $body:expr) => {
        match $variants {
            Ssd1306Variants::Size128x64($panel) => $body,
            Ssd1306Variants::Size128x32($panel) => $body,
        }
    };
}

/// SSD1306 panel on a Linux I²C bus
pub struct Ssd1306Driver {
    display: Ssd1306Variants,
    capabilities: DisplayCapabilities,
    pending: Vec<u8>,
}

fn to_rotation(degrees: u16) -> Result<DisplayRotation, DisplayError> {
    match degrees {
        0 => Ok(DisplayRotation::Rotate0),
        90 => Ok(DisplayRotation::Rotate90),
        180 => Ok(DisplayRotation::Rotate180),
        270 => Ok(DisplayRotation::Rotate270),
        _ => Err(DisplayError::InvalidRotation(degrees)),
    }
}

/// Logical drawing size once the panel is rotated.
fn logical_size(width: u32, height: u32, degrees: u16) -> (u32, u32) {
    match degrees {
        90 | 270 => (height, width),
        _ => (width, height),
    }
}

/// Copy a packed frame into the controller's buffer.
fn blit<D>(display: &mut D, frame: &[u8], width: u32, height: u32) -> Result<(), DisplayError>
where
    D: DrawTarget<Color = BinaryColor>,
    D::Error: core::fmt::Debug,
{
    display
        .clear(BinaryColor::Off)
        .map_err(|e| DisplayError::DrawingError(format!("{:?}", e)))?;

    let width = width as usize;
    let lit = unpack_bits(frame, width * height as usize)
        .enumerate()
        .filter(|(_, on)| *on)
        .map(|(i, _)| Pixel(Point::new((i % width) as i32, (i / width) as i32), BinaryColor::On));

    display
        .draw_iter(lit)
        .map_err(|e| DisplayError::DrawingError(format!("{:?}", e)))
}

impl Ssd1306Driver {
    /// Open the I²C bus and bind a 128x64 or 128x32 panel.
    ///
    /// The controller is not touched until [`DisplayDriver::init`]. The panel
    /// starts unrotated; rotation follows through [`DisplayDriver::set_rotation`].
    pub fn new_i2c(config: &DisplayConfig) -> Result<Self, DisplayError> {
        let BusConfig::I2c { bus, address } = config.bus();
        info!("Opening SSD1306 on {} at address 0x{:02X}", bus, address);

        let i2c = I2cdev::new(&bus)
            .map_err(|e| DisplayError::I2cError(format!("Failed to open {}: {}", bus, e)))?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, address);

        let width = config.width();
        let height = config.height();
        let rotation = DisplayRotation::Rotate0;

        let display = match (width, height) {
            (128, 64) => Ssd1306Variants::Size128x64(
                Ssd1306::new(interface, DisplaySize128x64, rotation).into_buffered_graphics_mode(),
            ),
            (128, 32) => Ssd1306Variants::Size128x32(
                Ssd1306::new(interface, DisplaySize128x32, rotation).into_buffered_graphics_mode(),
            ),
            _ => {
                return Err(DisplayError::InvalidConfiguration(format!(
                    "Unsupported SSD1306 size: {}x{}",
                    width, height
                )));
            }
        };

        Ok(Self {
            display,
            capabilities: DisplayCapabilities {
                width,
                height,
                supports_rotation: true,
                supports_contrast: true,
            },
            pending: Vec::new(),
        })
    }
}

impl DisplayDriver for Ssd1306Driver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        with_panel!(&mut self.display, panel => panel.init())
            .map_err(|e| DisplayError::InitializationFailed(format!("{:?}", e)))?;
        info!(
            "SSD1306 initialized ({}x{})",
            self.capabilities.width, self.capabilities.height
        );
        Ok(())
    }

    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError> {
        debug!("SSD1306 contrast {}", value);
        let brightness = Brightness::custom(0x2, value);
        with_panel!(&mut self.display, panel => panel.set_brightness(brightness))?;
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
        let (w, h) = (self.capabilities.width, self.capabilities.height);
        let frame = &self.pending;
        with_panel!(&mut self.display, panel => {
            blit(panel, frame, w, h)?;
            panel.flush()?;
        });
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.pending = vec![0; self.buffer_len()];
        self.flush()
    }

    fn set_rotation(&mut self, degrees: u16) -> Result<(), DisplayError> {
        let rotation = to_rotation(degrees)?;
        with_panel!(&mut self.display, panel => panel.set_rotation(rotation))?;

        let native = match self.display {
            Ssd1306Variants::Size128x64(_) => (128, 64),
            Ssd1306Variants::Size128x32(_) => (128, 32),
        };
        let (width, height) = logical_size(native.0, native.1, degrees);
        self.capabilities.width = width;
        self.capabilities.height = height;
        self.pending.clear();
        debug!("SSD1306 rotation {}°", degrees);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_mapping() {
        assert!(matches!(to_rotation(180), Ok(DisplayRotation::Rotate180)));
        assert!(matches!(to_rotation(45), Err(DisplayError::InvalidRotation(45))));
    }

    #[test]
    fn test_quarter_turns_swap_axes() {
        assert_eq!(logical_size(128, 64, 0), (128, 64));
        assert_eq!(logical_size(128, 64, 180), (128, 64));
        assert_eq!(logical_size(128, 32, 90), (32, 128));
        assert_eq!(logical_size(128, 32, 270), (32, 128));
    }

    #[test]
    fn test_missing_bus_is_i2c_error() {
        let config = DisplayConfig {
            bus: Some(BusConfig::I2c { bus: "/nonexistent/i2c-9".into(), address: 0x3C }),
            ..Default::default()
        };
        assert!(matches!(Ssd1306Driver::new_i2c(&config), Err(DisplayError::I2cError(_))));
    }
}
