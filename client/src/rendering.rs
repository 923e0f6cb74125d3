use crate::assets::Textures;
use macroquad::prelude::*;
use shared::{Actor, ActorId, Canvas, FontAlign, Rect, Viewport, ACTOR_SIZE};

const BACKGROUND: Color = Color::new(0.1, 0.1, 0.1, 1.0);
const BLOCK: Color = Color::new(0.27, 0.27, 0.27, 1.0);
const FONT_SIZE: f32 = 20.0;

/// Fill color for an actor, cycled by id.
pub fn actor_color(id: ActorId) -> Color {
    match id % 8 {
        0 => WHITE,
        1 => RED,
        2 => GREEN,
        3 => BLUE,
        4 => YELLOW,
        5 => MAGENTA,
        6 => Color::from_rgba(0, 255, 255, 255),
        _ => Color::from_rgba(136, 136, 136, 255),
    }
}

/// Left edge of a `width` wide text anchored at `x`.
pub fn aligned_x(x: f32, width: f32, align: FontAlign) -> f32 {
    match align {
        FontAlign::Left => x,
        FontAlign::Center => x - width / 2.0,
        FontAlign::Right => x - width,
    }
}

/// Maps world units to screen pixels for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub scale: f32,
    pub left: f32,
    pub top: f32,
}

impl Projection {
    pub fn new(viewport: &Viewport, screen_width: f32) -> Self {
        Self {
            scale: screen_width / viewport.width,
            left: viewport.left(),
            top: viewport.top(),
        }
    }

    pub fn point(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.left) * self.scale, (y - self.top) * self.scale)
    }

    pub fn length(&self, units: f32) -> f32 {
        units * self.scale
    }
}

/// [`Canvas`] drawing straight to the macroquad window.
pub struct MacroquadCanvas {
    projection: Projection,
}

impl MacroquadCanvas {
    pub fn new() -> Self {
        Self {
            projection: Projection {
                scale: 1.0,
                left: 0.0,
                top: 0.0,
            },
        }
    }
}

impl Default for MacroquadCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for MacroquadCanvas {
    fn begin(&mut self, viewport: &Viewport) {
        self.projection = Projection::new(viewport, screen_width());
        clear_background(BACKGROUND);
    }

    fn draw_block(&mut self, block: &Rect) {
        let (x, y) = self.projection.point(block.x, block.y);
        draw_rectangle(
            x,
            y,
            self.projection.length(block.w),
            self.projection.length(block.h),
            BLOCK,
        );
    }

    fn draw_actor(&mut self, actor: &Actor) {
        let (x, y) = self.projection.point(actor.body.x, actor.body.y);
        let size = self.projection.length(ACTOR_SIZE);

        draw_rectangle(x, y, size, size, actor_color(actor.id));
        if actor.is_local() {
            draw_rectangle_lines(x, y, size, size, 2.0, WHITE);
        }

        // Eye on the side the actor faces
        let eye = size * 0.2;
        let eye_x = if actor.body.facing < 0.0 {
            x + size * 0.15
        } else {
            x + size * 0.85 - eye
        };
        draw_rectangle(eye_x, y + size * 0.25, eye, eye, BLACK);

        let label = measure_text(&actor.name, None, 14, 1.0);
        draw_text(
            &actor.name,
            aligned_x(x + size / 2.0, label.width, FontAlign::Center),
            y - 4.0,
            14.0,
            WHITE,
        );
    }

    fn draw_text(&mut self, x: f32, y: f32, text: &str, align: FontAlign) {
        let size = measure_text(text, None, FONT_SIZE as u16, 1.0);
        draw_text(text, aligned_x(x, size.width, align), y, FONT_SIZE, WHITE);
    }
}

/// Lobby screen shown until enough players joined.
pub fn draw_waiting(players: usize, needed: usize, textures: &Textures) {
    clear_background(BACKGROUND);

    let (cx, cy) = (screen_width() / 2.0, screen_height() / 2.0);
    if let Some(title) = textures.get("title") {
        draw_texture(title, cx - title.width() / 2.0, cy - title.height() - 40.0, WHITE);
    }

    let mut canvas = MacroquadCanvas::new();
    canvas.draw_text(cx, cy, "Waiting for players...", FontAlign::Center);
    canvas.draw_text(
        cx,
        cy + 30.0,
        &format!("{} / {}", players, needed),
        FontAlign::Center,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::Vec2;

    #[test]
    fn test_aligned_x() {
        assert_approx_eq!(aligned_x(100.0, 40.0, FontAlign::Left), 100.0);
        assert_approx_eq!(aligned_x(100.0, 40.0, FontAlign::Center), 80.0);
        assert_approx_eq!(aligned_x(100.0, 40.0, FontAlign::Right), 60.0);
    }

    #[test]
    fn test_full_viewport_projection() {
        let projection = Projection::new(&Viewport::full(25.0, 18.75), 800.0);

        assert_approx_eq!(projection.scale, 32.0);
        let (x, y) = projection.point(25.0, 18.75);
        assert_approx_eq!(x, 800.0);
        assert_approx_eq!(y, 600.0);
    }

    #[test]
    fn test_zoomed_projection() {
        let viewport = Viewport {
            center: Vec2::new(10.0, 5.0),
            width: 10.0,
            height: 7.5,
        };
        let projection = Projection::new(&viewport, 800.0);

        assert_approx_eq!(projection.scale, 80.0);
        let (x, y) = projection.point(5.0, 1.25);
        assert_approx_eq!(x, 0.0);
        assert_approx_eq!(y, 0.0);
        assert_approx_eq!(projection.length(ACTOR_SIZE), 80.0);
    }

    #[test]
    fn test_actor_colors_cycle() {
        assert_eq!(actor_color(1), actor_color(9));
        assert_ne!(actor_color(1), actor_color(2));
    }
}
