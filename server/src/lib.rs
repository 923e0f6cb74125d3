//! # Arena Server Library
//!
//! The authoritative end of a networked arena session. The server owns the
//! only stepping [`shared::World`], admits clients as actors, applies their
//! inputs and broadcasts snapshots of the result.
//!
//! ## Session lifecycle
//!
//! ```text
//! WaitingForPlayers --(>= 2 actors)--> Running --(quit)--> Terminating
//! ```
//!
//! While waiting the server checks the actor count every 500 ms, stepping
//! nothing and broadcasting only joins and leaves. Once running, each tick
//! steps the world, serializes it and broadcasts the snapshot if anything
//! changed. Clients may connect in either state.
//!
//! ## Failure isolation
//!
//! A failed send to one client marks that connection dead; the next tick
//! reaps it and removes its actor. Other clients are unaffected. Clients that
//! stay silent for five seconds are dropped the same way.
//!
//! ## Tasks
//!
//! - **Network Receiver**: decodes datagrams and forwards them to the main loop
//! - **Network Sender**: drains the outgoing queue, sends and broadcasts
//! - **Timeout Checker**: drops silent clients once a second
//! - **Main Loop**: handles packets, gates on player count, ticks the world
//!
//! None of these hold a world lock across an `.await`.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use shared::{GameMode, QuitSignal, World};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> shared::Result<()> {
//!     let world = Arc::new(World::new(25.0, 18.75, GameMode::load_named("deathmatch")?, true));
//!     let mut server = Server::bind(
//!         "0.0.0.0:9000",
//!         world,
//!         Duration::from_millis(16),
//!         16,
//!         QuitSignal::new(),
//!     )
//!     .await?;
//!
//!     server.run().await
//! }
//! ```

pub mod client_manager;
pub mod network;

pub use network::{Server, ServerState};
