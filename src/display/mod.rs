/*
 *  display/mod.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Display subsystem - drivers, frame, fonts, images and rendering
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

// Core trait definitions
pub mod traits;
pub mod error;
pub mod factory;

// Drawing surface and what gets drawn on it
pub mod frame;
pub mod canvas;
pub mod font;
pub mod image;
pub mod renderer;

// Display drivers (ssd1306 only with the driver-ssd1306 feature)
pub mod drivers;

// Re-exports for convenience
pub use traits::{DisplayDriver, DisplayCapabilities};
pub use error::DisplayError;
pub use factory::{DisplayDriverFactory, BoxedDriver};
pub use frame::MonoFrame;
pub use canvas::Canvas;
pub use font::TextFont;
pub use image::MonoImage;
pub use renderer::ScreenRenderer;
pub use drivers::capture::CaptureDriver;

#[cfg(feature = "driver-ssd1306")]
pub use drivers::ssd1306::Ssd1306Driver;
