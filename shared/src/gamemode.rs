//! Rulesets loaded from `.gamemode` descriptors

use crate::descriptor::Descriptor;
use crate::error::{ArenaError, Result};
use crate::paths;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const GAMEMODE_SUFFIX: &str = ".gamemode";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gameplay {
    /// First to `win_score` wins the round, then scores reset.
    Deathmatch,
    /// Scores accumulate forever.
    Endless,
}

impl FromStr for Gameplay {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deathmatch" => Ok(Gameplay::Deathmatch),
            "endless" => Ok(Gameplay::Endless),
            other => Err(format!("unknown gameplay mode '{}'", other)),
        }
    }
}

impl fmt::Display for Gameplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gameplay::Deathmatch => write!(f, "deathmatch"),
            Gameplay::Endless => write!(f, "endless"),
        }
    }
}

/// Immutable rule parameters. Assumed identical on the server and all clients.
#[derive(Debug, Clone, PartialEq)]
pub struct GameMode {
    pub name: String,
    pub gameplay: Gameplay,
    pub win_score: u32,
    pub kill_score: u32,
    pub death_penalty: u32,
}

impl GameMode {
    /// Loads `config/<name>.gamemode` from the shared data directory.
    pub fn load_named(name: &str) -> Result<Self> {
        Self::load(Self::resolve(name))
    }

    /// Appends the `.gamemode` suffix if absent and resolves under `config/`.
    pub fn resolve(name: &str) -> PathBuf {
        let mut file = name.to_string();
        if !file.contains(GAMEMODE_SUFFIX) {
            file.push_str(GAMEMODE_SUFFIX);
        }
        paths::file_path(Path::new("config").join(file))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let desc = Descriptor::load(path.as_ref())?;
        Self::from_descriptor(&desc)
    }

    pub fn from_descriptor(desc: &Descriptor) -> Result<Self> {
        let stem = desc
            .path()
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mode = GameMode {
            name: desc.get_or("name", stem)?,
            gameplay: desc.get_or("mode", Gameplay::Deathmatch)?,
            win_score: desc.get_or("win_score", 10)?,
            kill_score: desc.get_or("kill_score", 1)?,
            death_penalty: desc.get_or("death_penalty", 0)?,
        };

        if mode.gameplay == Gameplay::Deathmatch && mode.win_score == 0 {
            return Err(ArenaError::InvalidGameMode(format!(
                "{}: deathmatch needs a positive win_score",
                mode.name
            )));
        }
        if mode.kill_score == 0 && mode.death_penalty == 0 {
            return Err(ArenaError::InvalidGameMode(format!(
                "{}: scoring events would never change a score",
                mode.name
            )));
        }

        Ok(mode)
    }

    /// True when `round_score` ends the round under this ruleset.
    pub fn is_winning_score(&self, round_score: u32) -> bool {
        self.gameplay == Gameplay::Deathmatch && round_score >= self.win_score
    }
}

impl Default for GameMode {
    fn default() -> Self {
        Self {
            name: "deathmatch".to_string(),
            gameplay: Gameplay::Deathmatch,
            win_score: 10,
            kill_score: 1,
            death_penalty: 0,
        }
    }
}
