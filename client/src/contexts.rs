//! Execution contexts that drive a [`World`] next to the render loop
//!
//! Input dispatch, physics and (with zoom enabled) the viewport each get a
//! thread of their own. They share the world only through its locks and stop
//! once the [`QuitSignal`] is set. A context that panics triggers quit on its
//! way out so the others wind down too.

use log::{debug, error};
use shared::{ArenaError, QuitSignal, Result, World};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub const INPUT_PERIOD: Duration = Duration::from_millis(10);
pub const PHYSICS_PERIOD: Duration = Duration::from_millis(10);
pub const VIEWPORT_PERIOD: Duration = Duration::from_millis(15);

/// Sets quit if the owning thread unwinds.
struct QuitOnPanic(QuitSignal);

impl Drop for QuitOnPanic {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.trigger();
        }
    }
}

fn spawn_loop(
    name: &str,
    period: Duration,
    quit: QuitSignal,
    mut body: impl FnMut() + Send + 'static,
) -> Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let _guard = QuitOnPanic(quit.clone());
            while !quit.is_set() {
                body();
                thread::sleep(period);
            }
        })
        .map_err(|source| ArenaError::Spawn {
            name: name.to_string(),
            source,
        })
}

/// Handles of the running contexts.
pub struct Contexts {
    threads: Vec<JoinHandle<()>>,
}

impl Contexts {
    /// Starts input dispatch and physics, plus the viewport context when
    /// `zoom` is set.
    pub fn start(world: Arc<World>, zoom: bool, quit: QuitSignal) -> Result<Self> {
        let mut contexts = Self { threads: Vec::new() };

        let input_world = Arc::clone(&world);
        let started = spawn_loop("input", INPUT_PERIOD, quit.clone(), move || {
            input_world.handle_keys()
        });
        contexts.push(started, &quit)?;

        let physics_world = Arc::clone(&world);
        let started = spawn_loop("physics", PHYSICS_PERIOD, quit.clone(), move || {
            physics_world.update();
        });
        contexts.push(started, &quit)?;

        if zoom {
            let started = spawn_loop("viewport", VIEWPORT_PERIOD, quit.clone(), move || {
                world.update_viewport()
            });
            contexts.push(started, &quit)?;
        }

        Ok(contexts)
    }

    /// Keeps a started thread; on failure stops the ones already running.
    fn push(&mut self, started: Result<JoinHandle<()>>, quit: &QuitSignal) -> Result<()> {
        match started {
            Ok(handle) => {
                self.threads.push(handle);
                Ok(())
            }
            Err(e) => {
                quit.trigger();
                self.join();
                Err(e)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Waits for every context to stop. Call after triggering quit.
    pub fn join(&mut self) {
        for handle in self.threads.drain(..) {
            let name = handle.thread().name().unwrap_or("context").to_string();
            match handle.join() {
                Ok(()) => debug!("{} context stopped", name),
                Err(_) => error!("{} context panicked", name),
            }
        }
    }
}

/// One frame's worth of the contexts' work, for running without threads.
pub fn run_sequential(world: &World, zoom: bool) {
    world.handle_keys();
    world.update();
    if zoom {
        world.update_viewport();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{ActorKind, GameMode, Vec2};
    use std::time::Instant;

    fn world() -> Arc<World> {
        Arc::new(World::new(25.0, 18.75, GameMode::default(), true))
    }

    #[test]
    fn test_contexts_stop_on_quit() {
        let quit = QuitSignal::new();
        let mut contexts = Contexts::start(world(), true, quit.clone()).unwrap();
        assert_eq!(contexts.len(), 3);

        quit.trigger();
        contexts.join();
        assert!(contexts.is_empty());
    }

    #[test]
    fn test_no_viewport_context_without_zoom() {
        let quit = QuitSignal::new();
        let mut contexts = Contexts::start(world(), false, quit.clone()).unwrap();
        assert_eq!(contexts.len(), 2);

        quit.trigger();
        contexts.join();
    }

    #[test]
    fn test_physics_context_steps_world() {
        let world = world();
        world.add_actor(Vec2::new(2.0, 2.0), ActorKind::Ai, 0);
        let quit = QuitSignal::new();
        let mut contexts = Contexts::start(Arc::clone(&world), true, quit.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(2);
        while world.tick() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }

        quit.trigger();
        contexts.join();
        assert!(world.tick() > 0);
    }

    #[test]
    fn test_panicking_context_triggers_quit() {
        let quit = QuitSignal::new();
        let handle = spawn_loop("doomed", INPUT_PERIOD, quit.clone(), || panic!("boom")).unwrap();
        let mut contexts = Contexts {
            threads: vec![handle],
        };

        contexts.join();
        assert!(quit.is_set());
    }

    #[test]
    fn test_sequential_frame() {
        let world = world();
        world.add_actor(Vec2::new(2.0, 2.0), ActorKind::Human, 1);

        run_sequential(&world, true);
        thread::sleep(Duration::from_millis(30));
        run_sequential(&world, true);

        assert!(world.tick() > 0);
    }
}
