// THEORY:
// A `Canvas` is the mutable frame that the interpreter and the renderer draw on.
// Drawing happens in place and the frame only lives for one loop iteration.
//
// The trait keeps the drawing vocabulary deliberately small (rectangle, label,
// filled circle) so a backend only has to map three primitives. The library ships
// an implementation for `image::RgbImage`, drawn with `imageproc`, which is what
// headless runs and tests use. The OpenCV backend lives next to the capture code.

use crate::core_modules::detection::BoundingBox;
use anyhow::Result;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;

/// An RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channel order used by OpenCV matrices.
    pub fn to_bgr(self) -> [u8; 3] {
        [self.b, self.g, self.r]
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        Rgb([color.r, color.g, color.b])
    }
}

/// A frame that can be annotated in place.
pub trait Canvas {
    /// Frame size as `(width, height)` in pixels.
    fn dimensions(&self) -> (u32, u32);

    /// Draws the outline of `bbox`, including both corner pixels.
    fn draw_rect(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> Result<()>;

    /// Draws `text` with its baseline starting at `origin`.
    fn draw_label(&mut self, text: &str, origin: (i32, i32), color: Color) -> Result<()>;

    /// Draws a filled circle.
    fn fill_circle(&mut self, center: (i32, i32), radius: u32, color: Color) -> Result<()>;
}

/// Approximate glyph cell used to size label plates on the headless canvas.
const LABEL_GLYPH_WIDTH: u32 = 8;
const LABEL_HEIGHT: u32 = 14;

impl Canvas for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        RgbImage::dimensions(self)
    }

    fn draw_rect(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> Result<()> {
        let pixel: Rgb<u8> = color.into();
        // Both corners are inclusive, so the outline spans width + 1 pixels.
        let (span_x, span_y) = (bbox.width() + 1, bbox.height() + 1);
        for ring in 0..thickness.max(1) {
            let inset = ring as i32;
            let width = span_x.saturating_sub(2 * ring);
            let height = span_y.saturating_sub(2 * ring);
            if width == 0 || height == 0 {
                break;
            }
            let rect = Rect::at(bbox.x1 + inset, bbox.y1 + inset).of_size(width, height);
            if width <= 2 || height <= 2 {
                draw_filled_rect_mut(self, rect, pixel);
            } else {
                draw_hollow_rect_mut(self, rect, pixel);
            }
        }
        Ok(())
    }

    // No font is bundled, so the label is rendered as a solid plate sized to the text.
    fn draw_label(&mut self, text: &str, origin: (i32, i32), color: Color) -> Result<()> {
        let width = (text.chars().count() as u32 * LABEL_GLYPH_WIDTH).max(1);
        let rect = Rect::at(origin.0, origin.1 - LABEL_HEIGHT as i32).of_size(width, LABEL_HEIGHT);
        draw_filled_rect_mut(self, rect, color.into());
        Ok(())
    }

    fn fill_circle(&mut self, center: (i32, i32), radius: u32, color: Color) -> Result<()> {
        draw_filled_circle_mut(self, center, radius as i32, color.into());
        Ok(())
    }
}

/// Test double that records every drawing call instead of touching pixels.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingCanvas {
    pub(crate) ops: Vec<DrawOp>,
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum DrawOp {
    Rect(BoundingBox, Color, u32),
    Label(String, (i32, i32), Color),
    Circle((i32, i32), u32, Color),
}

#[cfg(test)]
impl Canvas for RecordingCanvas {
    fn dimensions(&self) -> (u32, u32) {
        (640, 480)
    }

    fn draw_rect(&mut self, bbox: &BoundingBox, color: Color, thickness: u32) -> Result<()> {
        self.ops.push(DrawOp::Rect(*bbox, color, thickness));
        Ok(())
    }

    fn draw_label(&mut self, text: &str, origin: (i32, i32), color: Color) -> Result<()> {
        self.ops.push(DrawOp::Label(text.to_string(), origin, color));
        Ok(())
    }

    fn fill_circle(&mut self, center: (i32, i32), radius: u32, color: Color) -> Result<()> {
        self.ops.push(DrawOp::Circle(center, radius, color));
        Ok(())
    }
}
