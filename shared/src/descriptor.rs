//! `key = value` descriptor files
//!
//! Game modes, key bindings and the engine configuration all use the same
//! line-oriented format. Blank lines and lines starting with `#` are ignored,
//! everything else must contain a `=`. Typed lookups go through [`FromStr`],
//! so each target type owns its own conversion.

use crate::error::{ArenaError, Result};
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Entry {
    pub key: String,
    pub value: String,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct Descriptor {
    path: PathBuf,
    entries: Vec<Entry>,
}

impl Descriptor {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| ArenaError::io(path, e))?;
        Self::parse(path, &text)
    }

    pub fn parse(path: impl Into<PathBuf>, text: &str) -> Result<Self> {
        let path = path.into();
        let mut entries = Vec::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ArenaError::Descriptor {
                    path,
                    line: index + 1,
                    message: format!("expected 'key = value', found '{}'", line),
                });
            };

            let key = key.trim();
            if key.is_empty() {
                return Err(ArenaError::Descriptor {
                    path,
                    line: index + 1,
                    message: "empty key".to_string(),
                });
            }

            entries.push(Entry {
                key: key.to_ascii_lowercase(),
                value: value.trim().to_string(),
                line: index + 1,
            });
        }

        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Looks up `key` and converts it. Later entries override earlier ones.
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.entries.iter().rev().find(|e| e.key == key) {
            Some(entry) => self.convert(entry).map(Some),
            None => Ok(None),
        }
    }

    pub fn get_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        Ok(self.get(key)?.unwrap_or(default))
    }

    pub fn convert<T>(&self, entry: &Entry) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        entry.value.parse::<T>().map_err(|e| self.error(entry.line, format!("{}: {}", entry.key, e)))
    }

    pub fn error(&self, line: usize, message: impl Into<String>) -> ArenaError {
        ArenaError::Descriptor {
            path: self.path.clone(),
            line,
            message: message.into(),
        }
    }
}
