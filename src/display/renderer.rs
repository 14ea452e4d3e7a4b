/*
 *  display/renderer.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Full-frame text and image rendering over a display driver
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

use std::path::Path;

use embedded_graphics::prelude::*;
use log::{debug, info};

use crate::config::DisplayConfig;
use crate::constants::SPLASH_TEXT;
use crate::display::canvas::Canvas;
use crate::display::error::DisplayError;
use crate::display::factory::BoxedDriver;
use crate::display::font::TextFont;
use crate::display::frame::MonoFrame;
use crate::display::image::MonoImage;

/// Owns the driver and the single frame drawn into it.
///
/// Every draw call replaces the whole visible frame.
pub struct ScreenRenderer {
    driver: BoxedDriver,
    frame: MonoFrame,
    font: TextFont,
    spacing: i32,
    offset: Point,
}

impl ScreenRenderer {
    pub fn new(driver: BoxedDriver, font: TextFont, config: &DisplayConfig) -> Self {
        let (width, height) = driver.dimensions();
        let (x, y) = config.offset();
        debug!("Renderer {}x{} font {:?} offset ({}, {})", width, height, font, x, y);
        Self {
            driver,
            frame: MonoFrame::new(width, height),
            font,
            spacing: config.font_spacing(),
            offset: Point::new(x, y),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.driver.dimensions()
    }

    /// Open a blank frame. It is shown when the returned canvas is committed or dropped.
    pub fn canvas(&mut self) -> Canvas<'_> {
        Canvas::acquire(&mut self.frame, &mut self.driver)
    }

    /// Render multi-line text at the base offset shifted right by `x_adjust`.
    pub fn draw_text(&mut self, text: &str, x_adjust: i32) -> Result<(), DisplayError> {
        let pitch = self.font.line_height() + self.spacing;
        let left = self.offset.x + x_adjust;
        let top = self.offset.y;

        let mut canvas = Canvas::acquire(&mut self.frame, &mut self.driver);
        for (row, line) in text.lines().enumerate() {
            let origin = Point::new(left, top + row as i32 * pitch);
            self.font.draw_line(&mut canvas, origin, line);
        }
        canvas.commit()
    }

    /// Render a PNG or SVG as a 1-bit image at the base offset.
    ///
    /// A load failure still releases the canvas, leaving a blank frame.
    pub fn draw_image(&mut self, path: &Path) -> Result<(), DisplayError> {
        let offset = self.offset;
        let mut canvas = Canvas::acquire(&mut self.frame, &mut self.driver);
        let image = MonoImage::load(path, canvas.size())?;
        image.blit(&mut canvas, offset);
        canvas.commit()
    }

    pub fn splash(&mut self) -> Result<(), DisplayError> {
        info!("{}", SPLASH_TEXT);
        self.draw_text(SPLASH_TEXT, 0)
    }

    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.driver.clear()
    }

    pub fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError> {
        if !self.driver.capabilities().supports_contrast {
            return Err(DisplayError::UnsupportedOperation);
        }
        debug!("Contrast {}", value);
        self.driver.set_contrast(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::drivers::mock::MockDriver;
    use crate::display::traits::unpack_bits;
    use embedded_graphics::pixelcolor::BinaryColor;

    fn renderer(config: &DisplayConfig) -> (MockDriver, ScreenRenderer) {
        let mock = MockDriver::new(128, 32);
        let font = TextFont::load(None, 10.0).unwrap();
        let r = ScreenRenderer::new(Box::new(mock.clone()), font, config);
        (mock, r)
    }

    fn last_frame(mock: &MockDriver) -> MonoFrame {
        let state = mock.state();
        let state = state.lock().unwrap();
        let packed = state.shown.last().cloned().unwrap_or_default();
        let mut frame = MonoFrame::new(128, 32);
        let lit = unpack_bits(&packed, 128 * 32)
            .enumerate()
            .filter(|(_, on)| *on)
            .map(|(i, _)| Pixel(Point::new((i % 128) as i32, (i / 128) as i32), BinaryColor::On));
        let _ = frame.draw_iter(lit);
        frame
    }

    fn leftmost_lit(frame: &MonoFrame) -> Option<u32> {
        (0..frame.width()).find(|&x| (0..frame.height()).any(|y| frame.pixel(x, y).is_some_and(|p| p.is_on())))
    }

    fn lit_rows(frame: &MonoFrame) -> Vec<u32> {
        (0..frame.height())
            .filter(|&y| (0..frame.width()).any(|x| frame.pixel(x, y).is_some_and(|p| p.is_on())))
            .collect()
    }

    #[test]
    fn test_draw_text_commits_one_frame() {
        let (mock, mut r) = renderer(&DisplayConfig::default());
        r.draw_text("hello", 0).unwrap();
        let state = mock.state();
        let state = state.lock().unwrap();
        assert_eq!(state.flush_count, 1);
        assert_eq!(state.shown.len(), 1);
    }

    #[test]
    fn test_offset_and_adjust_shift_text() {
        let (mock, mut r) = renderer(&DisplayConfig::default());
        r.draw_text("|", 0).unwrap();
        let base = leftmost_lit(&last_frame(&mock)).unwrap();

        let config = DisplayConfig { offset_x: Some(4), ..Default::default() };
        let (mock, mut r) = renderer(&config);
        r.draw_text("|", 3).unwrap();
        assert_eq!(leftmost_lit(&last_frame(&mock)).unwrap(), base + 7);
    }

    #[test]
    fn test_line_spacing_moves_second_line() {
        let (mock, mut r) = renderer(&DisplayConfig::default());
        r.draw_text("_\n_", 0).unwrap();
        let tight = lit_rows(&last_frame(&mock));

        let config = DisplayConfig { font_spacing: Some(3), ..Default::default() };
        let (mock, mut r) = renderer(&config);
        r.draw_text("_\n_", 0).unwrap();
        let loose = lit_rows(&last_frame(&mock));

        assert_eq!(loose.first(), tight.first());
        assert_eq!(loose.last().unwrap(), &(tight.last().unwrap() + 3));
    }

    #[test]
    fn test_each_draw_replaces_frame() {
        let (mock, mut r) = renderer(&DisplayConfig::default());
        r.draw_text("WWWWWWWWWW", 0).unwrap();
        r.draw_text("", 0).unwrap();
        assert_eq!(mock.lit_pixels(), 0);
    }

    #[test]
    fn test_missing_image_still_releases_canvas() {
        let (mock, mut r) = renderer(&DisplayConfig::default());
        assert!(r.draw_image(Path::new("/nonexistent/logo.png")).is_err());
        assert_eq!(mock.state().lock().unwrap().flush_count, 1);
        assert_eq!(mock.lit_pixels(), 0);
    }

    #[test]
    fn test_contrast_reaches_driver() {
        let (mock, mut r) = renderer(&DisplayConfig::default());
        r.set_contrast(200).unwrap();
        assert_eq!(mock.state().lock().unwrap().last_contrast, Some(200));
    }
}
