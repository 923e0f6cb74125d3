//! The shared world: actors, arena, simulation clock and snapshot sync
//!
//! A [`World`] is shared between execution contexts behind an `Arc` and
//! guards itself. Three locks are involved:
//!
//! * `state` (`RwLock`): actors, arena, clock. Stepping, joins, leaves and
//!   any per-actor mutation take it for writing; drawing, serializing and
//!   spawn queries read it. A reader therefore always sees a fully stepped
//!   world, and `draw` and `serialize` can run side by side.
//! * `sync` (`Mutex`): snapshot sequencing. Always taken after `state`.
//! * `viewport` (`Mutex`): camera. Never held together with `state`.
//!
//! An authoritative world steps its own physics. A mirror never steps and is
//! driven entirely by [`World::apply_snapshot`].

use crate::actor::{
    clean_name, is_stomp, resolve_collision, Actor, ActorId, ActorKind, Controls,
};
use crate::arena::{Arena, Rect, Vec2};
use crate::canvas::{Canvas, FontAlign};
use crate::gamemode::GameMode;
use crate::keys::{Key, KeyBindings};
use crate::snapshot::{ActorState, Snapshot};
use crate::timestep::FixedTimestep;
use crate::viewport::Viewport;
use crate::{
    ACTOR_SIZE, GRAVITY, JUMP_VELOCITY, MAX_FALL_SPEED, MAX_STEPS_PER_UPDATE, RUN_SPEED,
    SNAPSHOT_REFRESH_INTERVAL, STOMP_BOUNCE, TIMESTEP,
};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::{Duration, Instant};

struct WorldState {
    arena: Arena,
    actors: Vec<Actor>,
    bindings: KeyBindings,
    clock: FixedTimestep,
    rng: StdRng,
    next_id: ActorId,
    humans: u32,
    bots: u32,
    /// Actor driven by local keys on a mirror, with its control scheme.
    local: Option<(ActorId, u8)>,
    tick: u64,
    round: u32,
}

impl WorldState {
    fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.iter_mut().find(|a| a.id == id)
    }

    /// Spawn candidates whose actor box is clear of blocks and of every actor
    /// except `ignore`.
    fn free_spawns(&self, ignore: Option<ActorId>) -> Vec<Vec2> {
        self.arena
            .spawns
            .iter()
            .copied()
            .filter(|spawn| {
                let rect = Rect::actor_at(*spawn);
                !self.arena.is_solid(&rect)
                    && self
                        .actors
                        .iter()
                        .filter(|a| Some(a.id) != ignore)
                        .all(|a| !a.body.rect().intersects(&rect))
            })
            .collect()
    }

    fn respawn(&mut self, index: usize) {
        let id = self.actors[index].id;
        let free = self.free_spawns(Some(id));
        let spawn = match free.choose(&mut self.rng) {
            Some(spawn) => *spawn,
            None => self.arena.spawns[self.rng.gen_range(0..self.arena.spawns.len())],
        };
        self.actors[index].body.teleport(spawn);
    }

    fn respawn_all(&mut self) {
        let mut spawns = self.arena.spawns.clone();
        spawns.shuffle(&mut self.rng);
        for (actor, spawn) in self.actors.iter_mut().zip(spawns.iter().cycle()) {
            actor.body.teleport(*spawn);
        }
    }

    fn step(&mut self, mode: &GameMode, dt: f32) {
        for actor in &mut self.actors {
            integrate(&self.arena, actor, dt);
        }

        let stomps = self.handle_collisions();
        for (attacker, victim) in stomps {
            self.score_stomp(mode, attacker, victim);
        }

        for actor in &self.actors {
            assert!(
                actor.body.x.is_finite() && actor.body.y.is_finite(),
                "actor {} left the simulation at ({}, {})",
                actor.id,
                actor.body.x,
                actor.body.y
            );
        }

        self.tick += 1;
    }

    /// Separates overlapping actors and returns (attacker, victim) index pairs
    /// for every stomp.
    fn handle_collisions(&mut self) -> Vec<(usize, usize)> {
        let mut stomps = Vec::new();

        for i in 0..self.actors.len() {
            for j in (i + 1)..self.actors.len() {
                let (head, tail) = self.actors.split_at_mut(j);
                let a = &mut head[i].body;
                let b = &mut tail[0].body;

                if !a.rect().intersects(&b.rect()) {
                    continue;
                }

                if is_stomp(a, b) {
                    stomps.push((i, j));
                } else if is_stomp(b, a) {
                    stomps.push((j, i));
                } else {
                    resolve_collision(a, b);
                    clamp_to_arena(&self.arena, a);
                    clamp_to_arena(&self.arena, b);
                }
            }
        }

        stomps
    }

    fn score_stomp(&mut self, mode: &GameMode, attacker: usize, victim: usize) {
        // A victim already respawned this step no longer overlaps.
        if !self.actors[attacker]
            .body
            .rect()
            .intersects(&self.actors[victim].body.rect())
        {
            return;
        }

        let winner = {
            let actor = &mut self.actors[attacker];
            actor.score.round_score += mode.kill_score;
            actor.body.vel_y = STOMP_BOUNCE;
            mode.is_winning_score(actor.score.round_score)
        };
        {
            let actor = &mut self.actors[victim];
            actor.score.round_score = actor.score.round_score.saturating_sub(mode.death_penalty);
        }

        info!(
            "{} stomped {}",
            self.actors[attacker].name, self.actors[victim].name
        );
        self.respawn(victim);

        if winner {
            self.actors[attacker].score.wins += 1;
            info!(
                "{} wins round {}",
                self.actors[attacker].name, self.round
            );
            for actor in &mut self.actors {
                actor.score.round_score = 0;
            }
            self.respawn_all();
            self.round += 1;
        }
    }
}

/// Applies controls and gravity, then moves one axis at a time against the
/// arena blocks.
fn integrate(arena: &Arena, actor: &mut Actor, dt: f32) {
    let controls = actor.controls;
    let body = &mut actor.body;

    body.vel_x = 0.0;
    if controls.left {
        body.vel_x -= RUN_SPEED;
        body.facing = -1.0;
    }
    if controls.right {
        body.vel_x += RUN_SPEED;
        body.facing = 1.0;
    }

    if controls.jump && body.on_ground {
        body.vel_y = JUMP_VELOCITY;
        body.on_ground = false;
    }

    let gravity = if controls.down { GRAVITY * 2.0 } else { GRAVITY };
    body.vel_y = (body.vel_y + gravity * dt).min(MAX_FALL_SPEED);

    body.x += body.vel_x * dt;
    for block in &arena.blocks {
        if block.intersects(&body.rect()) {
            if body.vel_x > 0.0 {
                body.x = block.x - ACTOR_SIZE;
            } else {
                body.x = block.right();
            }
            body.vel_x = 0.0;
        }
    }

    body.y += body.vel_y * dt;
    body.on_ground = false;
    for block in &arena.blocks {
        if block.intersects(&body.rect()) {
            if body.vel_y > 0.0 {
                body.y = block.y - ACTOR_SIZE;
                body.on_ground = true;
            } else {
                body.y = block.bottom();
            }
            body.vel_y = 0.0;
        }
    }

    clamp_to_arena(arena, body);
}

fn clamp_to_arena(arena: &Arena, body: &mut crate::actor::Body) {
    body.x = body.x.clamp(0.0, arena.width - ACTOR_SIZE);

    if body.y < 0.0 {
        body.y = 0.0;
        body.vel_y = body.vel_y.max(0.0);
    }
    if body.y > arena.height - ACTOR_SIZE {
        body.y = arena.height - ACTOR_SIZE;
        body.vel_y = 0.0;
        body.on_ground = true;
    }
}

#[derive(Default)]
struct SyncState {
    sequence: u64,
    last_emitted: Option<(u32, Vec<ActorState>)>,
    last_emitted_at: Option<Instant>,
    last_applied: Option<u64>,
}

pub struct World {
    width: f32,
    height: f32,
    mode: GameMode,
    authoritative: bool,
    state: RwLock<WorldState>,
    viewport: Mutex<Viewport>,
    sync: Mutex<SyncState>,
}

impl World {
    pub fn new(width: f32, height: f32, mode: GameMode, authoritative: bool) -> Self {
        Self {
            width,
            height,
            mode,
            authoritative,
            state: RwLock::new(WorldState {
                arena: Arena::standard(width, height),
                actors: Vec::new(),
                bindings: KeyBindings::default(),
                clock: FixedTimestep::new(TIMESTEP, MAX_STEPS_PER_UPDATE),
                rng: StdRng::from_entropy(),
                next_id: 1,
                humans: 0,
                bots: 0,
                local: None,
                tick: 0,
                round: 1,
            }),
            viewport: Mutex::new(Viewport::full(width, height)),
            sync: Mutex::new(SyncState::default()),
        }
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn mode(&self) -> &GameMode {
        &self.mode
    }

    /// Adds an actor named `Player N` or `Bot N`.
    pub fn add_actor(&self, position: Vec2, kind: ActorKind, control_scheme: u8) -> ActorId {
        self.insert_actor(position, kind, control_scheme, None)
    }

    /// Adds an actor called `name`, cleaned by [`clean_name`]. A blank name
    /// falls back to the `add_actor` naming.
    pub fn add_actor_named(
        &self,
        position: Vec2,
        kind: ActorKind,
        control_scheme: u8,
        name: String,
    ) -> ActorId {
        let name = clean_name(&name);
        let name = if name.is_empty() { None } else { Some(name) };
        self.insert_actor(position, kind, control_scheme, name)
    }

    fn insert_actor(
        &self,
        position: Vec2,
        kind: ActorKind,
        control_scheme: u8,
        name: Option<String>,
    ) -> ActorId {
        let mut state = self.state.write();

        let id = state.next_id;
        state.next_id += 1;

        let default_name = match kind {
            ActorKind::Ai => {
                state.bots += 1;
                format!("Bot {}", state.bots)
            }
            ActorKind::Human | ActorKind::Remote => {
                state.humans += 1;
                format!("Player {}", state.humans)
            }
        };
        let name = name.unwrap_or(default_name);

        info!("{} joined as actor {} at ({:.1}, {:.1})", name, id, position.x, position.y);
        state
            .actors
            .push(Actor::new(id, position, kind, control_scheme, name));
        id
    }

    pub fn remove_actor(&self, id: ActorId) -> bool {
        let mut state = self.state.write();
        let before = state.actors.len();
        state.actors.retain(|a| a.id != id);

        let removed = state.actors.len() != before;
        if removed {
            info!("Removed actor {}", id);
        }
        removed
    }

    /// Uniform choice among spawn candidates not blocked by geometry or
    /// actors. `None` when every candidate is occupied.
    pub fn random_spawn_locked(&self) -> Option<Vec2> {
        let state = self.state.read();
        state.free_spawns(None).choose(&mut rand::thread_rng()).copied()
    }

    /// Runs every fixed step due since the previous call. Returns the number
    /// of steps taken; always zero on a mirror.
    pub fn update(&self) -> u32 {
        if !self.authoritative {
            return 0;
        }

        let mut state = self.state.write();
        let steps = state.clock.tick();
        self.run_steps(&mut state, steps);
        steps
    }

    /// Like [`World::update`] with an explicit elapsed time.
    pub fn advance(&self, elapsed: Duration) -> u32 {
        if !self.authoritative {
            return 0;
        }

        let mut state = self.state.write();
        let steps = state.clock.advance(elapsed);
        self.run_steps(&mut state, steps);
        steps
    }

    fn run_steps(&self, state: &mut WorldState, steps: u32) {
        let dt = state.clock.dt();
        for _ in 0..steps {
            state.step(&self.mode, dt);
        }
    }

    pub fn update_viewport(&self) {
        let boxes: Vec<Rect> = {
            let state = self.state.read();
            state.actors.iter().map(|a| a.body.rect()).collect()
        };

        let target = Viewport::framing(&boxes, self.width, self.height);
        self.viewport.lock().approach(&target);
    }

    pub fn viewport(&self) -> Viewport {
        *self.viewport.lock()
    }

    pub fn draw(&self, canvas: &mut impl Canvas) {
        let viewport = self.viewport();
        let state = self.state.read();

        canvas.begin(&viewport);
        for block in &state.arena.blocks {
            canvas.draw_block(block);
        }
        for actor in &state.actors {
            canvas.draw_actor(actor);
        }

        let scoreboard: String = state
            .actors
            .iter()
            .map(|a| format!("{}: {}   ", a.name, a.score.round_score))
            .collect();
        canvas.draw_text(10.0, 20.0, &scoreboard, FontAlign::Left);
    }

    /// Snapshot of the current state, or `None` if neither the round nor any
    /// actor changed since the last snapshot handed out. A world at rest is
    /// still re-sent every [`SNAPSHOT_REFRESH_INTERVAL`] so a lost datagram
    /// gets repaired.
    pub fn serialize(&self) -> Option<Snapshot> {
        self.serialize_at(Instant::now())
    }

    fn serialize_at(&self, now: Instant) -> Option<Snapshot> {
        let state = self.state.read();
        let mut sync = self.sync.lock();

        let actors: Vec<ActorState> = state.actors.iter().map(Actor::state).collect();
        if let (Some((round, last)), Some(at)) = (&sync.last_emitted, sync.last_emitted_at) {
            let stale = now.saturating_duration_since(at) >= SNAPSHOT_REFRESH_INTERVAL;
            if *round == state.round && *last == actors && !stale {
                return None;
            }
        }

        sync.sequence += 1;
        sync.last_emitted = Some((state.round, actors.clone()));
        sync.last_emitted_at = Some(now);

        Some(Snapshot {
            sequence: sync.sequence,
            tick: state.tick,
            round: state.round,
            actors,
        })
    }

    /// Mirrors `snapshot` into this world. Stale or duplicate snapshots are
    /// ignored and `false` is returned.
    pub fn apply_snapshot(&self, snapshot: &Snapshot) -> bool {
        let mut state = self.state.write();
        let mut sync = self.sync.lock();

        if !snapshot.is_newer_than(sync.last_applied) {
            debug!(
                "Discarding snapshot {} (last applied {:?})",
                snapshot.sequence, sync.last_applied
            );
            return false;
        }
        sync.last_applied = Some(snapshot.sequence);

        let local = state.local;
        let mut existing: HashMap<ActorId, Actor> =
            state.actors.drain(..).map(|a| (a.id, a)).collect();

        let mut actors = Vec::with_capacity(snapshot.actors.len());
        for actor_state in &snapshot.actors {
            let actor = match existing.remove(&actor_state.id) {
                Some(mut actor) => {
                    actor.apply_state(actor_state);
                    actor
                }
                None => {
                    debug!("Actor {} appeared in snapshot", actor_state.id);
                    match local {
                        Some((id, scheme)) if id == actor_state.id => {
                            Actor::from_state(actor_state, ActorKind::Human, scheme)
                        }
                        _ => Actor::from_state(actor_state, ActorKind::Remote, 0),
                    }
                }
            };
            actors.push(actor);
        }

        for id in existing.keys() {
            debug!("Actor {} left the snapshot", id);
        }

        if let Some(max) = actors.iter().map(|a| a.id).max() {
            state.next_id = state.next_id.max(max + 1);
        }
        state.actors = actors;
        state.tick = snapshot.tick;
        state.round = snapshot.round;
        true
    }

    /// Runs `f` over the actors in join order with per-actor write access.
    /// The collection itself cannot be restructured from here.
    pub fn with_actors_mut<R>(&self, f: impl FnOnce(&mut [Actor]) -> R) -> R {
        let mut state = self.state.write();
        f(&mut state.actors)
    }

    pub fn with_actors<R>(&self, f: impl FnOnce(&[Actor]) -> R) -> R {
        let state = self.state.read();
        f(&state.actors)
    }

    /// Records a key transition on every locally controlled actor.
    pub fn key_event(&self, key: Key, pressed: bool) {
        let mut state = self.state.write();
        for actor in state.actors.iter_mut().filter(|a| a.is_local()) {
            actor.key_state(key, pressed);
        }
    }

    /// One dispatch pass turning held keys (or AI decisions) into controls.
    pub fn handle_keys(&self) {
        let mut state = self.state.write();
        let WorldState { actors, bindings, .. } = &mut *state;
        for actor in actors.iter_mut() {
            actor.handle_keys(bindings);
        }
    }

    pub fn set_controls(&self, id: ActorId, controls: Controls) -> bool {
        let mut state = self.state.write();
        match state.actor_mut(id) {
            Some(actor) => {
                actor.controls = controls;
                true
            }
            None => false,
        }
    }

    pub fn controls_of(&self, id: ActorId) -> Option<Controls> {
        let state = self.state.read();
        state.actors.iter().find(|a| a.id == id).map(|a| a.controls)
    }

    /// Marks `id` as driven by local keys using `control_scheme`, now or when
    /// it first shows up in a snapshot.
    pub fn set_local_actor(&self, id: ActorId, control_scheme: u8) {
        let mut state = self.state.write();
        state.local = Some((id, control_scheme));
        if let Some(actor) = state.actor_mut(id) {
            actor.make_local(control_scheme);
        }
    }

    pub fn set_key_bindings(&self, bindings: KeyBindings) {
        self.state.write().bindings = bindings;
    }

    pub fn actor_count(&self) -> usize {
        self.state.read().actors.len()
    }

    /// `(name, round_score)` in join order.
    pub fn scoreboard(&self) -> Vec<(String, u32)> {
        let state = self.state.read();
        state
            .actors
            .iter()
            .map(|a| (a.name.clone(), a.score.round_score))
            .collect()
    }

    pub fn actor_states(&self) -> Vec<ActorState> {
        let state = self.state.read();
        state.actors.iter().map(Actor::state).collect()
    }

    pub fn round(&self) -> u32 {
        self.state.read().round
    }

    pub fn tick(&self) -> u64 {
        self.state.read().tick
    }
}
