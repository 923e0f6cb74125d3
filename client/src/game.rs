//! Interactive front end: local actors, the frame loop and shutdown

use crate::assets::Textures;
use crate::contexts::{self, Contexts};
use crate::input::InputPoller;
use crate::network::ClientState;
use crate::rendering::{draw_waiting, MacroquadCanvas};
use log::{info, warn};
use macroquad::prelude::next_frame;
use shared::{ActorKind, Config, QuitSignal, Result, World, MIN_PLAYERS};
use std::sync::Arc;
use tokio::sync::watch;

/// Adds `players` keyboard-driven actors (schemes 1 to 4, cycling) and `ai`
/// bots at free spawn points. Returns how many actors were added.
pub fn populate_local(world: &World, players: usize, ai: usize) -> usize {
    let humans = (0..players).map(|i| (ActorKind::Human, (i % 4) as u8 + 1));
    let bots = (0..ai).map(|_| (ActorKind::Ai, 0));

    let mut added = 0;
    for (kind, scheme) in humans.chain(bots) {
        let Some(spawn) = world.random_spawn_locked() else {
            warn!("Arena is full, {} actors not added", players + ai - added);
            break;
        };
        world.add_actor(spawn, kind, scheme);
        added += 1;
    }
    added
}

/// Runs frames until quit. With a `session`, the lobby screen is shown until
/// it turns active and the loop ends when it disconnects.
pub async fn run(
    world: Arc<World>,
    config: &Config,
    quit: QuitSignal,
    session: Option<watch::Receiver<ClientState>>,
) -> Result<()> {
    let textures = Textures::load().await?;
    let poller = InputPoller::new(quit.clone());
    let mut canvas = MacroquadCanvas::new();

    let mut threads = if config.threads {
        Some(Contexts::start(Arc::clone(&world), config.zoom, quit.clone())?)
    } else {
        info!("Running without worker threads");
        None
    };

    while !quit.is_set() {
        poller.poll(&world);
        if threads.is_none() {
            contexts::run_sequential(&world, config.zoom);
        }

        let state = session.as_ref().map(|rx| *rx.borrow());
        match state {
            None | Some(ClientState::Active) => world.draw(&mut canvas),
            Some(ClientState::Disconnected) => {
                warn!("Lost connection to server");
                quit.trigger();
            }
            Some(_) => draw_waiting(world.actor_count(), MIN_PLAYERS, &textures),
        }

        next_frame().await;
    }

    if let Some(threads) = threads.as_mut() {
        threads.join();
    }
    info!("Game loop finished");
    Ok(())
}
