//! Engine configuration, loaded once at startup and passed by reference

use crate::descriptor::Descriptor;
use crate::error::{ArenaError, Result};
use crate::paths;
use log::{info, warn};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_FILE: &str = "config/arena.conf";

/// Logical world width; height follows the screen aspect ratio.
pub const WORLD_WIDTH: f32 = 25.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub screen_width: u32,
    pub screen_height: u32,
    pub fullscreen: bool,
    /// Runs the viewport context that keeps every actor in frame.
    pub zoom: bool,
    /// Runs input dispatch, physics and viewport on their own threads.
    pub threads: bool,
    pub default_gamemode: String,
    pub default_host: String,
    pub default_port: u16,
    /// Server simulation/broadcast ticks per second.
    pub tick_rate: u32,
    pub max_clients: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            screen_width: 800,
            screen_height: 600,
            fullscreen: false,
            zoom: true,
            threads: true,
            default_gamemode: "deathmatch".to_string(),
            default_host: "127.0.0.1".to_string(),
            default_port: 9000,
            tick_rate: 60,
            max_clients: 16,
        }
    }
}

impl Config {
    /// Reads `config/arena.conf` from the data directory. A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load_default() -> Result<Self> {
        let path = paths::file_path(CONFIG_FILE);
        match Self::load(&path) {
            Err(ArenaError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, using default configuration", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let desc = Descriptor::load(path.as_ref())?;
        let config = Self::from_descriptor(&desc)?;
        info!("Loaded configuration from {}", desc.path().display());
        Ok(config)
    }

    pub fn from_descriptor(desc: &Descriptor) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            screen_width: desc.get_or("screen_width", defaults.screen_width)?,
            screen_height: desc.get_or("screen_height", defaults.screen_height)?,
            fullscreen: desc.get_or("fullscreen", defaults.fullscreen)?,
            zoom: desc.get_or("zoom", defaults.zoom)?,
            threads: desc.get_or("threads", defaults.threads)?,
            default_gamemode: desc.get_or("default_gamemode", defaults.default_gamemode)?,
            default_host: desc.get_or("default_host", defaults.default_host)?,
            default_port: desc.get_or("default_port", defaults.default_port)?,
            tick_rate: desc.get_or("tick_rate", defaults.tick_rate)?,
            max_clients: desc.get_or("max_clients", defaults.max_clients)?,
        };

        if config.screen_width == 0 || config.screen_height == 0 {
            return Err(desc.error(0, "screen size must be non-zero"));
        }
        if config.tick_rate == 0 {
            return Err(desc.error(0, "tick_rate must be non-zero"));
        }

        Ok(config)
    }

    /// World height in logical units for the configured aspect ratio.
    pub fn world_height(&self) -> f32 {
        WORLD_WIDTH * self.screen_height as f32 / self.screen_width as f32
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.default_port, 9000);
        assert!(config.threads);
        assert_approx_eq!(config.world_height(), 18.75, 0.001);
    }

    #[test]
    fn test_overrides() {
        let desc = Descriptor::parse(
            "arena.conf",
            "screen_width = 1000\nscreen_height = 500\nthreads = false\ndefault_port = 7777",
        )
        .unwrap();
        let config = Config::from_descriptor(&desc).unwrap();

        assert_eq!(config.default_port, 7777);
        assert!(!config.threads);
        assert_approx_eq!(config.world_height(), 12.5, 0.001);
    }

    #[test]
    fn test_zero_tick_rate_rejected() {
        let desc = Descriptor::parse("arena.conf", "tick_rate = 0").unwrap();
        assert!(Config::from_descriptor(&desc).is_err());
    }

    #[test]
    fn test_tick_duration() {
        let config = Config {
            tick_rate: 50,
            ..Config::default()
        };
        assert_eq!(config.tick_duration(), Duration::from_millis(20));
    }

    #[test]
    fn test_shipped_config_loads() {
        assert!(Config::load_default().is_ok());
    }
}
