//! Texture loading
//!
//! Every `textures/<name>.png` under the data directory is loaded once at
//! startup and looked up by `<name>` afterwards.

use log::{info, warn};
use macroquad::prelude::*;
use shared::{paths, ArenaError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const TEXTURE_DIR: &str = "textures";

/// `(name, path)` for each PNG in `dir`, sorted by name. A missing directory
/// holds no textures.
pub fn texture_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(ArenaError::io(dir, e)),
    };

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| ArenaError::io(dir, e))?.path();
        let is_png = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("png"));
        if !is_png {
            continue;
        }
        if let Some(name) = path.file_stem().and_then(|s| s.to_str()) {
            files.push((name.to_string(), path.clone()));
        }
    }

    files.sort();
    Ok(files)
}

#[derive(Default)]
pub struct Textures {
    textures: HashMap<String, Texture2D>,
}

impl Textures {
    /// Loads the textures shipped in the data directory. Needs a live window.
    pub async fn load() -> Result<Self> {
        Self::load_from(&paths::file_path(TEXTURE_DIR)).await
    }

    pub async fn load_from(dir: &Path) -> Result<Self> {
        let mut textures = HashMap::new();

        for (name, path) in texture_files(dir)? {
            let Some(path_str) = path.to_str() else {
                warn!("Skipping texture with non UTF-8 path {}", path.display());
                continue;
            };
            match load_texture(path_str).await {
                Ok(texture) => {
                    texture.set_filter(FilterMode::Nearest);
                    textures.insert(name, texture);
                }
                Err(e) => warn!("Failed to load texture {}: {:?}", path.display(), e),
            }
        }

        info!("Loaded {} textures", textures.len());
        Ok(Self { textures })
    }

    pub fn get(&self, name: &str) -> Option<&Texture2D> {
        self.textures.get(name)
    }

    pub fn len(&self) -> usize {
        self.textures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
