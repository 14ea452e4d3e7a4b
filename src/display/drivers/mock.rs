/*
 *  display/drivers/mock.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Mock display driver for testing
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

use std::sync::{Arc, Mutex};

use crate::display::error::DisplayError;
use crate::display::traits::{unpack_bits, DisplayCapabilities, DisplayDriver};

/// Records every operation so tests can inspect it after the driver has
/// been boxed and handed to the renderer.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: DisplayCapabilities,
    state: Arc<Mutex<MockDriverState>>,
}

#[derive(Debug, Default)]
pub struct MockDriverState {
    pub init_count: usize,
    pub flush_count: usize,
    pub clear_count: usize,
    pub write_count: usize,
    pub last_contrast: Option<u8>,
    /// Frame staged by write_buffer, not yet flushed
    pub pending: Vec<u8>,
    /// Every frame that reached flush, in order
    pub shown: Vec<Vec<u8>>,
    pub simulate_flush_failure: bool,
}

impl MockDriver {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            capabilities: DisplayCapabilities {
                width,
                height,
                supports_rotation: false,
                supports_contrast: true,
            },
            state: Arc::new(Mutex::new(MockDriverState::default())),
        }
    }

    pub fn state(&self) -> Arc<Mutex<MockDriverState>> {
        Arc::clone(&self.state)
    }

    /// Lit pixels in the most recently shown frame
    pub fn lit_pixels(&self) -> usize {
        let state = self.state.lock().unwrap();
        let pixels = (self.capabilities.width * self.capabilities.height) as usize;
        state
            .shown
            .last()
            .map(|frame| unpack_bits(frame, pixels).filter(|on| *on).count())
            .unwrap_or(0)
    }
}

impl DisplayDriver for MockDriver {
    fn capabilities(&self) -> &DisplayCapabilities {
        &self.capabilities
    }

    fn init(&mut self) -> Result<(), DisplayError> {
        self.state.lock().unwrap().init_count += 1;
        Ok(())
    }

    fn set_contrast(&mut self, value: u8) -> Result<(), DisplayError> {
        self.state.lock().unwrap().last_contrast = Some(value);
        Ok(())
    }

    fn write_buffer(&mut self, buffer: &[u8]) -> Result<(), DisplayError> {
        let expected = self.buffer_len();
        if buffer.len() != expected {
            return Err(DisplayError::BufferSizeMismatch { expected, actual: buffer.len() });
        }
        let mut state = self.state.lock().unwrap();
        state.write_count += 1;
        state.pending = buffer.to_vec();
        Ok(())
    }

    fn flush(&mut self) -> Result<(), DisplayError> {
        let mut state = self.state.lock().unwrap();
        if state.simulate_flush_failure {
            return Err(DisplayError::I2cError("simulated flush failure".to_string()));
        }
        state.flush_count += 1;
        let frame = state.pending.clone();
        state.shown.push(frame);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        let blank = vec![0; self.buffer_len()];
        {
            let mut state = self.state.lock().unwrap();
            state.clear_count += 1;
            state.pending = blank;
        }
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_records_pending_frame() {
        let mut mock = MockDriver::new(8, 2);
        mock.write_buffer(&[0x01, 0x80]).unwrap();
        mock.flush().unwrap();
        assert_eq!(mock.lit_pixels(), 2);
        assert_eq!(mock.state().lock().unwrap().flush_count, 1);
    }

    #[test]
    fn test_simulated_failure() {
        let mut mock = MockDriver::new(8, 2);
        mock.state().lock().unwrap().simulate_flush_failure = true;
        assert!(mock.flush().is_err());
        assert!(mock.state().lock().unwrap().shown.is_empty());
    }
}
