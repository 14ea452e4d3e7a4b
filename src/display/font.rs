/*
 *  display/font.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  Text fonts: built-in bitmap faces or TrueType via fontdue
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

use std::fmt;
use std::fs;
use std::path::Path;

use embedded_graphics::{
    mono_font::{
        iso_8859_1::{FONT_5X8, FONT_6X10, FONT_7X13, FONT_9X15},
        MonoFont, MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use fontdue::{Font, FontSettings};
use log::info;

use crate::display::error::DisplayError;
use crate::display::frame::MonoFrame;

/// Coverage at or above this is drawn as a lit pixel.
const ALPHA_THRESHOLD: u8 = 128;

pub enum TextFont {
    Builtin(&'static MonoFont<'static>),
    TrueType { font: Box<Font>, size: f32 },
}

impl fmt::Debug for TextFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFont::Builtin(font) => write!(
                f,
                "Builtin({}x{})",
                font.character_size.width, font.character_size.height
            ),
            TextFont::TrueType { size, .. } => write!(f, "TrueType({}px)", size),
        }
    }
}

/// Closest built-in face for a requested pixel size.
pub fn builtin_for_size(size: f32) -> &'static MonoFont<'static> {
    match size {
        s if s < 9.0 => &FONT_5X8,
        s if s < 12.0 => &FONT_6X10,
        s if s < 14.0 => &FONT_7X13,
        _ => &FONT_9X15,
    }
}

impl TextFont {
    /// Load `path` at `size` pixels, or pick a built-in face when no path is given.
    ///
    /// A path that cannot be read or parsed is an error; there is no silent
    /// fallback to the built-in face.
    pub fn load(path: Option<&Path>, size: f32) -> Result<Self, DisplayError> {
        let Some(path) = path else {
            return Ok(TextFont::Builtin(builtin_for_size(size)));
        };

        let bytes = fs::read(path).map_err(|e| DisplayError::Font {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let font = Self::from_bytes(&bytes, size).map_err(|reason| DisplayError::Font {
            path: path.to_path_buf(),
            reason,
        })?;
        info!("Loaded font {} at {}px", path.display(), size);
        Ok(font)
    }

    pub fn from_bytes(bytes: &[u8], size: f32) -> Result<Self, String> {
        let font = Font::from_bytes(bytes, FontSettings::default()).map_err(|e| e.to_string())?;
        Ok(TextFont::TrueType { font: Box::new(font), size })
    }

    /// Natural distance between successive baselines, in pixels.
    pub fn line_height(&self) -> i32 {
        match self {
            TextFont::Builtin(font) => font.character_size.height as i32,
            TextFont::TrueType { font, size } => font
                .horizontal_line_metrics(*size)
                .map_or(*size, |m| m.new_line_size)
                .ceil() as i32,
        }
    }

    /// Draw one line with its top-left corner at `origin`.
    pub fn draw_line(&self, frame: &mut MonoFrame, origin: Point, line: &str) {
        match self {
            TextFont::Builtin(font) => {
                let style = MonoTextStyle::new(*font, BinaryColor::On);
                // MonoFrame is infallible
                let _ = Text::with_baseline(line, origin, style, Baseline::Top).draw(frame);
            }
            TextFont::TrueType { font, size } => {
                let ascent = font
                    .horizontal_line_metrics(*size)
                    .map_or(*size, |m| m.ascent)
                    .round() as i32;
                let baseline = origin.y + ascent;
                let mut cursor = origin.x as f32;

                for c in line.chars() {
                    let (metrics, bitmap) = font.rasterize(c, *size);
                    let left = cursor.round() as i32 + metrics.xmin;
                    let top = baseline - metrics.height as i32 - metrics.ymin;

                    let lit = bitmap
                        .iter()
                        .enumerate()
                        .filter(|(_, alpha)| **alpha >= ALPHA_THRESHOLD)
                        .map(|(i, _)| {
                            let x = left + (i % metrics.width.max(1)) as i32;
                            let y = top + (i / metrics.width.max(1)) as i32;
                            Pixel(Point::new(x, y), BinaryColor::On)
                        });
                    let _ = frame.draw_iter(lit);

                    cursor += metrics.advance_width;
                }
            }
        }
    }
}
