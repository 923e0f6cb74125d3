//! Actors: bodies, key state, controls and scores

use crate::arena::{Rect, Vec2};
use crate::keys::{Action, Key, KeyBindings};
use crate::snapshot::ActorState;
use crate::{ACTOR_SIZE, MAX_NAME_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type ActorId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorKind {
    /// Driven by keys pressed on this machine.
    Human,
    /// Driven by an [`AiBrain`].
    Ai,
    /// Driven by input received over the network (or not at all on a mirror).
    Remote,
}

/// Continuous control signal consumed by the physics step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub jump: bool,
    pub down: bool,
}

impl Controls {
    fn press(&mut self, action: Action) {
        match action {
            Action::Left => self.left = true,
            Action::Right => self.right = true,
            Action::Jump => self.jump = true,
            Action::Down => self.down = true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Score {
    pub round_score: u32,
    pub wins: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Body {
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub on_ground: bool,
    /// -1.0 facing left, 1.0 facing right.
    pub facing: f32,
}

impl Body {
    pub fn new(pos: Vec2) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            vel_x: 0.0,
            vel_y: 0.0,
            on_ground: false,
            facing: 1.0,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, ACTOR_SIZE, ACTOR_SIZE)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + ACTOR_SIZE / 2.0, self.y + ACTOR_SIZE / 2.0)
    }

    pub fn teleport(&mut self, pos: Vec2) {
        *self = Body {
            facing: self.facing,
            ..Body::new(pos)
        };
    }
}

/// Trims `name` and cuts it to [`MAX_NAME_LEN`] characters.
pub fn clean_name(name: &str) -> String {
    name.trim()
        .chars()
        .take(MAX_NAME_LEN)
        .collect::<String>()
        .trim_end()
        .to_string()
}

pub fn check_collision(a: &Body, b: &Body) -> bool {
    a.rect().intersects(&b.rect())
}

/// True when `attacker` is dropping onto the top half of `victim`.
pub fn is_stomp(attacker: &Body, victim: &Body) -> bool {
    let (_, attacker_y) = attacker.center();
    let (_, victim_y) = victim.center();

    attacker.vel_y > 0.0 && attacker.vel_y > victim.vel_y && attacker_y + ACTOR_SIZE * 0.25 < victim_y
}

/// Pushes two overlapping bodies apart along the line between their centers
/// and trades their velocities with some damping.
pub fn resolve_collision(a: &mut Body, b: &mut Body) {
    if !check_collision(a, b) {
        return;
    }

    let (cx1, cy1) = a.center();
    let (cx2, cy2) = b.center();

    let dx = cx2 - cx1;
    let dy = cy2 - cy1;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 0.001 {
        a.x -= ACTOR_SIZE / 2.0;
        b.x += ACTOR_SIZE / 2.0;
        return;
    }

    let nx = dx / distance;
    let ny = dy / distance;

    let overlap = ACTOR_SIZE - distance;

    if overlap > 0.0 {
        let separation = overlap / 2.0;
        a.x -= nx * separation;
        a.y -= ny * separation;
        b.x += nx * separation;
        b.y += ny * separation;

        let temp_vx = a.vel_x;
        let temp_vy = a.vel_y;
        a.vel_x = b.vel_x * 0.8;
        a.vel_y = b.vel_y * 0.8;
        b.vel_x = temp_vx * 0.8;
        b.vel_y = temp_vy * 0.8;
    }
}

/// Wandering bot. Holds a direction for a while, turns around when blocked,
/// and jumps now and then.
#[derive(Debug, Clone)]
pub struct AiBrain {
    rng: StdRng,
    direction: i8,
    hold: u32,
}

impl AiBrain {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            direction: 0,
            hold: 0,
        }
    }

    pub fn think(&mut self, body: &Body) -> Controls {
        if self.hold == 0 {
            self.direction = self.rng.gen_range(-1..=1);
            self.hold = self.rng.gen_range(20..120);
        } else {
            self.hold -= 1;
        }

        let blocked = self.direction != 0 && body.vel_x == 0.0 && body.on_ground && self.hold % 10 == 0;
        if blocked {
            self.direction = -self.direction;
        }

        Controls {
            left: self.direction < 0,
            right: self.direction > 0,
            jump: body.on_ground && self.rng.gen_bool(0.02),
            down: !body.on_ground && self.rng.gen_bool(0.01),
        }
    }
}

impl Default for AiBrain {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct Actor {
    pub id: ActorId,
    pub kind: ActorKind,
    pub control_scheme: u8,
    pub name: String,
    pub body: Body,
    pub keys: HashMap<Key, bool>,
    pub controls: Controls,
    pub score: Score,
    brain: Option<AiBrain>,
}

impl Actor {
    pub fn new(id: ActorId, pos: Vec2, kind: ActorKind, control_scheme: u8, name: String) -> Self {
        let brain = match kind {
            ActorKind::Ai => Some(AiBrain::new()),
            _ => None,
        };

        Self {
            id,
            kind,
            control_scheme,
            name,
            body: Body::new(pos),
            keys: HashMap::new(),
            controls: Controls::default(),
            score: Score::default(),
            brain,
        }
    }

    pub fn with_brain(mut self, brain: AiBrain) -> Self {
        self.brain = Some(brain);
        self
    }

    pub fn is_local(&self) -> bool {
        self.kind == ActorKind::Human
    }

    pub fn key_state(&mut self, key: Key, pressed: bool) {
        self.keys.insert(key, pressed);
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.keys.get(&key).copied().unwrap_or(false)
    }

    /// Converts held state into [`Controls`]. Remote actors keep whatever
    /// the network last delivered.
    pub fn handle_keys(&mut self, bindings: &KeyBindings) {
        match self.kind {
            ActorKind::Human => {
                let mut controls = Controls::default();
                if let Some(scheme) = bindings.scheme(self.control_scheme) {
                    for (key, action) in scheme.iter() {
                        if self.is_held(key) {
                            controls.press(action);
                        }
                    }
                }
                self.controls = controls;
            }
            ActorKind::Ai => {
                let brain = self.brain.get_or_insert_with(AiBrain::new);
                self.controls = brain.think(&self.body);
            }
            ActorKind::Remote => {}
        }
    }

    /// Makes this actor the one driven by local keys.
    pub fn make_local(&mut self, control_scheme: u8) {
        self.kind = ActorKind::Human;
        self.control_scheme = control_scheme;
    }

    pub fn state(&self) -> ActorState {
        ActorState {
            id: self.id,
            name: self.name.clone(),
            x: self.body.x,
            y: self.body.y,
            vel_x: self.body.vel_x,
            vel_y: self.body.vel_y,
            on_ground: self.body.on_ground,
            facing: self.body.facing,
            round_score: self.score.round_score,
            wins: self.score.wins,
        }
    }

    pub fn from_state(state: &ActorState, kind: ActorKind, control_scheme: u8) -> Self {
        let mut actor = Actor::new(
            state.id,
            Vec2::new(state.x, state.y),
            kind,
            control_scheme,
            state.name.clone(),
        );
        actor.apply_state(state);
        actor
    }

    /// Overwrites simulated fields; key table and controls are left alone.
    pub fn apply_state(&mut self, state: &ActorState) {
        self.name.clone_from(&state.name);
        self.body = Body {
            x: state.x,
            y: state.y,
            vel_x: state.vel_x,
            vel_y: state.vel_y,
            on_ground: state.on_ground,
            facing: state.facing,
        };
        self.score = Score {
            round_score: state.round_score,
            wins: state.wins,
        };
    }
}
