//! Drawing interface the world renders through
//!
//! Coordinates passed to a [`Canvas`] are world units. Implementations map them
//! to the screen using the viewport handed to [`Canvas::begin`].

use crate::actor::Actor;
use crate::arena::Rect;
use crate::viewport::Viewport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontAlign {
    Left,
    Center,
    Right,
}

pub trait Canvas {
    fn begin(&mut self, viewport: &Viewport);
    fn draw_block(&mut self, block: &Rect);
    fn draw_actor(&mut self, actor: &Actor);
    /// Screen-space text, `x` and `y` in pixels.
    fn draw_text(&mut self, x: f32, y: f32, text: &str, align: FontAlign);
}
