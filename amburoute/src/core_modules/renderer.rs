use crate::core_modules::canvas::Canvas;
use crate::core_modules::signal::SignalState;
use anyhow::Result;

/// Where the traffic light is painted on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightStyle {
    pub center: (i32, i32),
    pub radius: u32,
}

impl Default for LightStyle {
    fn default() -> Self {
        Self {
            center: (50, 50),
            radius: 30,
        }
    }
}

/// Paints the light as a filled circle in the state's color.
pub fn draw_signal<C: Canvas + ?Sized>(canvas: &mut C, state: SignalState, style: &LightStyle) -> Result<()> {
    canvas.fill_circle(style.center, style.radius, state.color())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::canvas::{Color, DrawOp, RecordingCanvas};
    use image::{Rgb, RgbImage};

    #[test]
    fn draws_one_circle_at_fixed_position() {
        let mut canvas = RecordingCanvas::default();
        draw_signal(&mut canvas, SignalState::Stop, &LightStyle::default()).unwrap();
        assert_eq!(canvas.ops, vec![DrawOp::Circle((50, 50), 30, Color::RED)]);
    }

    #[test]
    fn go_paints_green_pixels() {
        let mut frame = RgbImage::new(120, 120);
        draw_signal(&mut frame, SignalState::Go, &LightStyle::default()).unwrap();
        assert_eq!(*frame.get_pixel(50, 50), Rgb([0, 255, 0]));
        assert_eq!(*frame.get_pixel(110, 110), Rgb([0, 0, 0]));
    }
}
