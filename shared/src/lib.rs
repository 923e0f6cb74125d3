//! Types shared by the arena server, client and binary
//!
//! The [`World`] is the heart of the crate; the rest is what it needs
//! (actors, arena geometry, rules, key bindings) and what gets it onto the
//! wire ([`Packet`], [`Snapshot`]).

pub mod actor;
pub mod arena;
pub mod canvas;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod gamemode;
pub mod keys;
pub mod paths;
pub mod quit;
pub mod snapshot;
pub mod timestep;
pub mod viewport;
pub mod world;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use actor::{Actor, ActorId, ActorKind, Controls};
pub use arena::{Rect, Vec2};
pub use canvas::{Canvas, FontAlign};
pub use config::Config;
pub use error::{ArenaError, Result};
pub use gamemode::GameMode;
pub use keys::{Key, KeyBindings};
pub use quit::QuitSignal;
pub use snapshot::{ActorState, Snapshot};
pub use viewport::Viewport;
pub use world::World;

/// Side length of an actor, in world units.
pub const ACTOR_SIZE: f32 = 1.0;
pub const GRAVITY: f32 = 40.0;
pub const RUN_SPEED: f32 = 9.0;
pub const JUMP_VELOCITY: f32 = -17.0;
pub const MAX_FALL_SPEED: f32 = 30.0;
/// Vertical speed an attacker bounces off with after a stomp.
pub const STOMP_BOUNCE: f32 = -10.0;

pub const TIMESTEP: Duration = Duration::from_millis(10);
pub const MAX_STEPS_PER_UPDATE: u32 = 10;
/// Longest a world at rest goes without a snapshot.
pub const SNAPSHOT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Actors needed before a session leaves its waiting state.
pub const MIN_PLAYERS: usize = 2;
pub const PROTOCOL_VERSION: u32 = 1;
/// Longest actor name, in characters. Every snapshot carries every name.
pub const MAX_NAME_LEN: usize = 32;
/// Largest UDP payload. Receive buffers hold a whole datagram.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub enum Packet {
    Connect {
        client_version: u32,
        name: String,
    },
    Input {
        sequence: u32,
        controls: Controls,
    },
    Disconnect,

    Connected {
        client_id: ActorId,
    },
    Snapshot(Snapshot),
    Disconnected {
        reason: String,
    },
}

impl Packet {
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(bytes)?)
    }
}
