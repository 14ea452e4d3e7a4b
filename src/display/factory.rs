/*
 *  display/factory.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Driver factory for creating display drivers from configuration
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

use crate::config::{DisplayConfig, DriverKind};
use crate::display::drivers::capture::CaptureDriver;
use crate::display::error::DisplayError;
use crate::display::traits::DisplayDriver;
use log::info;

#[cfg(feature = "driver-ssd1306")]
use crate::display::drivers::ssd1306::Ssd1306Driver;

/// Type alias for boxed display driver trait objects
pub type BoxedDriver = Box<dyn DisplayDriver>;

/// Factory for creating display drivers from configuration
pub struct DisplayDriverFactory;

impl DisplayDriverFactory {
    /// Build the driver selected by `config.driver` (SSD1306 when unset).
    ///
    /// The returned driver has not been initialised yet.
    ///
    /// ```ignore
    /// let config = DisplayConfig {
    ///     driver: Some(DriverKind::Capture),
    ///     capture_path: Some("/tmp/panel.pbm".into()),
    ///     ..Default::default()
    /// };
    /// let mut driver = DisplayDriverFactory::create_from_config(&config)?;
    /// DisplayDriverFactory::init_driver(&mut driver, &config)?;
    /// ```
    pub fn create_from_config(config: &DisplayConfig) -> Result<BoxedDriver, DisplayError> {
        Self::validate_config(config)?;

        let kind = config.driver();
        info!("Creating {:?} display driver", kind);

        match kind {
            #[cfg(feature = "driver-ssd1306")]
            DriverKind::Ssd1306 => Ok(Box::new(Ssd1306Driver::new_i2c(config)?)),

            #[cfg(not(feature = "driver-ssd1306"))]
            DriverKind::Ssd1306 => Err(DisplayError::InvalidConfiguration(
                "SSD1306 driver not enabled. Enable with --features driver-ssd1306".to_string(),
            )),

            DriverKind::Capture => Ok(Box::new(CaptureDriver::new(config)?)),
        }
    }

    /// Initialise the panel, then turn it to `config.rotate_deg`.
    pub fn init_driver(driver: &mut BoxedDriver, config: &DisplayConfig) -> Result<(), DisplayError> {
        driver.init()?;

        let degrees = config.rotate_deg.unwrap_or(0);
        if degrees == 0 {
            return Ok(());
        }
        if !driver.capabilities().supports_rotation {
            return Err(DisplayError::UnsupportedOperation);
        }
        driver.set_rotation(degrees)?;
        info!("Display rotated {}°, drawing area {:?}", degrees, driver.dimensions());
        Ok(())
    }

    /// Validate a configuration without touching any hardware
    pub fn validate_config(config: &DisplayConfig) -> Result<(), DisplayError> {
        if let Some(rotation) = config.rotate_deg {
            if !matches!(rotation, 0 | 90 | 180 | 270) {
                return Err(DisplayError::InvalidRotation(rotation));
            }
        }

        let width = config.width();
        let height = config.height();
        match config.driver() {
            DriverKind::Ssd1306 if width != 128 || !matches!(height, 32 | 64) => {
                Err(DisplayError::InvalidConfiguration(format!(
                    "Unsupported SSD1306 size: {}x{} (expected 128x64 or 128x32)",
                    width, height
                )))
            }
            _ if width == 0 || height == 0 => Err(DisplayError::InvalidConfiguration(format!(
                "Invalid display size: {}x{}",
                width, height
            ))),
            _ => Ok(()),
        }
    }
}
