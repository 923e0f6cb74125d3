//! Fixed-timestep clock
//!
//! Callers feed wall time in whatever rhythm they run at; the clock answers
//! how many fixed steps are due. Steps per call are capped so a stalled thread
//! does not try to catch up on seconds of simulation at once.

use log::warn;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: Duration,
    max_steps: u32,
    accumulated: Duration,
    last_tick: Option<Instant>,
}

impl FixedTimestep {
    pub fn new(step: Duration, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            accumulated: Duration::ZERO,
            last_tick: None,
        }
    }

    pub fn dt(&self) -> f32 {
        self.step.as_secs_f32()
    }

    /// Advances by the wall time elapsed since the previous call. The first
    /// call only starts the clock.
    pub fn tick(&mut self) -> u32 {
        let now = Instant::now();
        let elapsed = match self.last_tick {
            Some(last) => now.duration_since(last),
            None => Duration::ZERO,
        };
        self.last_tick = Some(now);
        self.advance(elapsed)
    }

    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulated += elapsed;

        let mut steps = 0;
        while self.accumulated >= self.step && steps < self.max_steps {
            self.accumulated -= self.step;
            steps += 1;
        }

        if self.accumulated >= self.step {
            warn!(
                "Simulation fell behind by {:.3}s, skipping ahead",
                self.accumulated.as_secs_f32()
            );
            self.accumulated = Duration::ZERO;
        }

        steps
    }
}
