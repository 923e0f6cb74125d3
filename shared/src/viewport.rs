//! Camera framing in world units

use crate::arena::{Rect, Vec2};

/// Space kept around the outermost actors.
const MARGIN: f32 = 3.0;
/// Narrowest view, in world units.
const MIN_WIDTH: f32 = 10.0;
/// Fraction of the remaining distance covered per update.
const SMOOTHING: f32 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Shows the whole world.
    pub fn full(world_width: f32, world_height: f32) -> Self {
        Self {
            center: Vec2::new(world_width / 2.0, world_height / 2.0),
            width: world_width,
            height: world_height,
        }
    }

    pub fn left(&self) -> f32 {
        self.center.x - self.width / 2.0
    }

    pub fn top(&self) -> f32 {
        self.center.y - self.height / 2.0
    }

    /// Smallest view with the world's aspect ratio that frames every box.
    pub fn framing(boxes: &[Rect], world_width: f32, world_height: f32) -> Self {
        if boxes.is_empty() {
            return Self::full(world_width, world_height);
        }

        let min_x = boxes.iter().map(|b| b.x).fold(f32::INFINITY, f32::min) - MARGIN;
        let min_y = boxes.iter().map(|b| b.y).fold(f32::INFINITY, f32::min) - MARGIN;
        let max_x = boxes.iter().map(|b| b.right()).fold(f32::NEG_INFINITY, f32::max) + MARGIN;
        let max_y = boxes.iter().map(|b| b.bottom()).fold(f32::NEG_INFINITY, f32::max) + MARGIN;

        let aspect = world_height / world_width;
        let width = (max_x - min_x)
            .max((max_y - min_y) / aspect)
            .clamp(MIN_WIDTH.min(world_width), world_width);
        let height = width * aspect;

        let center = Vec2::new(
            ((min_x + max_x) / 2.0).clamp(width / 2.0, world_width - width / 2.0),
            ((min_y + max_y) / 2.0).clamp(height / 2.0, world_height - height / 2.0),
        );

        Self {
            center,
            width,
            height,
        }
    }

    /// Moves part of the way towards `target`.
    pub fn approach(&mut self, target: &Viewport) {
        self.center.x += (target.center.x - self.center.x) * SMOOTHING;
        self.center.y += (target.center.y - self.center.y) * SMOOTHING;
        self.width += (target.width - self.width) * SMOOTHING;
        self.height += (target.height - self.height) * SMOOTHING;
    }
}
