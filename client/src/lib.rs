//! # Arena Client Library
//!
//! Everything that runs on a player's machine: the network session that keeps
//! a mirror [`shared::World`] in sync with a server, and the interactive front
//! end that polls the keyboard, drives the world and draws it.
//!
//! ## Network session
//!
//! ```text
//! Connecting --(Connected)--> Syncing --(>= 2 actors)--> Active
//!      \                         \                          \
//!       `------------------------ `--------------------------`--> Disconnected
//! ```
//!
//! [`network::ClientSession`] owns a connected UDP socket and three tasks:
//! a receiver applying snapshots in arrival order, a poller promoting the
//! session once enough players are mirrored, and a relay sending the local
//! actor's controls every 16 ms. The mirror world never steps; its contents
//! come from snapshots alone.
//!
//! ## Front end
//!
//! - [`input`]: key transitions from macroquad into the world
//! - [`contexts`]: input dispatch, physics and viewport threads
//! - [`rendering`]: the macroquad [`shared::Canvas`]
//! - [`assets`]: textures from the data directory
//! - [`game`]: local actor setup and the frame loop
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use client::network::ClientSession;
//! use shared::{GameMode, QuitSignal, World};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> shared::Result<()> {
//!     let world = Arc::new(World::new(25.0, 18.75, GameMode::default(), false));
//!     let mut session =
//!         ClientSession::connect("127.0.0.1", 9000, "alice", world, 1, QuitSignal::new()).await?;
//!
//!     session.wait_until_active().await;
//!     session.terminate().await;
//!     Ok(())
//! }
//! ```

pub mod assets;
pub mod contexts;
pub mod game;
pub mod input;
pub mod network;
pub mod rendering;

pub use network::{ClientSession, ClientState};
