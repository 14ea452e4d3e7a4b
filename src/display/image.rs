/*
 *  display/image.rs
 *
 *  kvm-oled - appliance status panel
 *  (c) 2025-26 kvm-oled contributors
 *
 *  PNG and SVG loading, reduced to 1-bit monochrome
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

//! Images are flattened onto black: pixels are premultiplied, so the
//! luminance of a partly transparent pixel already accounts for its alpha.

use std::fs;
use std::path::Path;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use log::debug;
use resvg::{
    render,
    usvg::{Options, Transform, Tree},
};
use tiny_skia::Pixmap;

use crate::display::error::DisplayError;
use crate::display::frame::MonoFrame;

const LUMA_THRESHOLD: f32 = 128.0;

/// A 1-bit image ready to be blitted.
#[derive(Debug, Clone, PartialEq)]
pub struct MonoImage {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl MonoImage {
    /// Load a PNG at its native size, or rasterise an SVG scaled to fit
    /// within `fit` while keeping its aspect ratio.
    pub fn load(path: &Path, fit: Size) -> Result<Self, DisplayError> {
        let is_svg = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("svg") || e.eq_ignore_ascii_case("svgz"));

        let fail = |reason: String| DisplayError::Image { path: path.to_path_buf(), reason };
        let pixmap = if is_svg {
            let data = fs::read(path).map_err(|e| fail(e.to_string()))?;
            rasterize_svg(&data, fit).map_err(fail)?
        } else {
            Pixmap::load_png(path).map_err(|e| fail(e.to_string()))?
        };

        debug!("Loaded image {} ({}x{})", path.display(), pixmap.width(), pixmap.height());
        Ok(Self::from_pixmap(&pixmap))
    }

    pub fn from_pixmap(pixmap: &Pixmap) -> Self {
        let bits = pixmap
            .pixels()
            .iter()
            .map(|p| {
                let luma = 0.299 * p.red() as f32 + 0.587 * p.green() as f32 + 0.114 * p.blue() as f32;
                luma >= LUMA_THRESHOLD
            })
            .collect();
        Self { width: pixmap.width(), height: pixmap.height(), bits }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Draw lit pixels with the image's top-left corner at `origin`; the rest is clipped.
    pub fn blit(&self, frame: &mut MonoFrame, origin: Point) {
        let w = self.width as usize;
        let lit = self.bits.iter().enumerate().filter(|(_, on)| **on).map(|(i, _)| {
            Pixel(origin + Point::new((i % w) as i32, (i / w) as i32), BinaryColor::On)
        });
        let _ = frame.draw_iter(lit);
    }
}

fn rasterize_svg(data: &[u8], fit: Size) -> Result<Pixmap, String> {
    let tree = Tree::from_data(data, &Options::default()).map_err(|e| format!("Failed to parse SVG: {}", e))?;

    let svg_size = tree.size();
    let scale = (fit.width as f32 / svg_size.width()).min(fit.height as f32 / svg_size.height());
    let width = (svg_size.width() * scale).round().max(1.0) as u32;
    let height = (svg_size.height() * scale).round().max(1.0) as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or_else(|| "Failed to create pixmap".to_string())?;
    render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());
    Ok(pixmap)
}
