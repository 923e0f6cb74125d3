//! Resolves data files (configs, game modes, textures, fonts)

use std::env;
use std::path::{Path, PathBuf};

/// Installed layout: `<prefix>/bin/arena` next to `<prefix>/share/arena`.
pub const SHARED_DATA_DIR: &str = "share/arena";

/// Overrides every other lookup when set.
pub const DATA_DIR_ENV: &str = "ARENA_DATA_DIR";

/// Development fallback: the `data/` directory of this workspace.
const SOURCE_DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../data");

/// Directory that holds the shared game data.
pub fn data_dir() -> PathBuf {
    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(installed) = installed_data_dir() {
        if installed.is_dir() {
            return installed;
        }
    }

    PathBuf::from(SOURCE_DATA_DIR)
}

/// Maps a relative asset name to an absolute path inside the data directory.
pub fn file_path(relative: impl AsRef<Path>) -> PathBuf {
    data_dir().join(relative)
}

fn installed_data_dir() -> Option<PathBuf> {
    let exe = env::current_exe().ok()?;
    let prefix = exe.parent()?.parent()?;
    Some(prefix.join(SHARED_DATA_DIR))
}
