//! Error type shared by every crate in the workspace

use std::path::PathBuf;
use thiserror::Error;

/// Everything that can go wrong outside of the simulation itself.
///
/// Startup failures (descriptors, configuration) and session-level transport
/// failures end up here. Simulation invariant violations are not represented;
/// those panic.
#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Descriptor {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unknown key name '{0}'")]
    UnknownKey(String),

    #[error("Invalid game mode: {0}")]
    InvalidGameMode(String),

    #[error("Networking support is disabled in this build.")]
    NetworkingDisabled,

    #[error("Network error: {0}")]
    Network(#[from] std::io::Error),

    #[error("Packet codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("Invalid address '{0}'")]
    InvalidAddress(String),

    #[error("No response from server at {0}")]
    ConnectTimeout(String),

    #[error("Connection rejected: {0}")]
    Rejected(String),

    #[error("Failed to start {name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

impl ArenaError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArenaError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, ArenaError>;
