//! Static arena geometry: solid blocks and spawn candidates

use crate::ACTOR_SIZE;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle, `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Box an actor would occupy with its top-left corner at `pos`.
    pub fn actor_at(pos: Vec2) -> Self {
        Self::new(pos.x, pos.y, ACTOR_SIZE, ACTOR_SIZE)
    }

    pub fn right(&self) -> f32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h
    }

    /// Touching edges do not count as an intersection.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<Rect>,
    pub spawns: Vec<Vec2>,
}

impl Arena {
    /// Floor plus five platforms laid out relative to the world size.
    pub fn standard(width: f32, height: f32) -> Self {
        const THICKNESS: f32 = 0.5;

        let floor = Rect::new(0.0, height - 1.0, width, 1.0);
        let platforms = [
            Rect::new(width * 0.10, height * 0.70, width * 0.25, THICKNESS),
            Rect::new(width * 0.65, height * 0.70, width * 0.25, THICKNESS),
            Rect::new(width * 0.375, height * 0.45, width * 0.25, THICKNESS),
            Rect::new(width * 0.05, height * 0.22, width * 0.20, THICKNESS),
            Rect::new(width * 0.75, height * 0.22, width * 0.20, THICKNESS),
        ];

        let mut spawns = Vec::new();
        for platform in &platforms {
            let y = platform.y - ACTOR_SIZE;
            spawns.push(Vec2::new(platform.x + platform.w * 0.25 - ACTOR_SIZE / 2.0, y));
            spawns.push(Vec2::new(platform.x + platform.w * 0.75 - ACTOR_SIZE / 2.0, y));
        }
        for fraction in [0.1, 0.35, 0.65, 0.9] {
            spawns.push(Vec2::new(width * fraction - ACTOR_SIZE / 2.0, floor.y - ACTOR_SIZE));
        }

        let mut blocks = vec![floor];
        blocks.extend(platforms);

        Self {
            width,
            height,
            blocks,
            spawns,
        }
    }

    pub fn is_solid(&self, rect: &Rect) -> bool {
        self.blocks.iter().any(|b| b.intersects(rect))
    }
}
