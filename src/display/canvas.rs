/*
 *  display/canvas.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Scoped drawing surface that commits its frame when released
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

use std::ops::{Deref, DerefMut};

use log::error;

use crate::display::error::DisplayError;
use crate::display::factory::BoxedDriver;
use crate::display::frame::MonoFrame;

/// One open frame.
///
/// Acquiring a canvas blanks the frame; whatever is drawn through it is
/// written and flushed to the driver when the canvas is committed or
/// dropped, including on early return or unwinding. Holding `&mut` on both
/// the frame and the driver keeps a second canvas from being opened.
pub struct Canvas<'a> {
    frame: &'a mut MonoFrame,
    driver: &'a mut BoxedDriver,
    committed: bool,
}

impl<'a> Canvas<'a> {
    pub fn acquire(frame: &'a mut MonoFrame, driver: &'a mut BoxedDriver) -> Self {
        let (w, h) = driver.dimensions();
        if frame.width() != w || frame.height() != h {
            *frame = MonoFrame::new(w, h);
        } else {
            frame.blank();
        }
        Self { frame, driver, committed: false }
    }

    /// Commit now and report the outcome instead of only logging it.
    pub fn commit(mut self) -> Result<(), DisplayError> {
        self.committed = true;
        self.push()
    }

    fn push(&mut self) -> Result<(), DisplayError> {
        self.driver.write_buffer(&self.frame.to_packed_bytes())?;
        self.driver.flush()
    }
}

impl Deref for Canvas<'_> {
    type Target = MonoFrame;

    fn deref(&self) -> &MonoFrame {
        self.frame
    }
}

impl DerefMut for Canvas<'_> {
    fn deref_mut(&mut self) -> &mut MonoFrame {
        self.frame
    }
}

impl Drop for Canvas<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.committed = true;
            if let Err(e) = self.push() {
                error!("Failed to commit frame: {}", e);
            }
        }
    }
}
