//! Backend-independent key names and per-scheme key bindings

use crate::descriptor::Descriptor;
use crate::error::{ArenaError, Result};
use log::info;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const KEYS_FILE: &str = "config/keys.conf";

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    A, B, C, D, E, F, G, H, I, J, K, L, M,
    N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
    Num0, Num1, Num2, Num3, Num4, Num5, Num6, Num7, Num8, Num9,
    Kp0, Kp1, Kp2, Kp3, Kp4, Kp5, Kp6, Kp7, Kp8, Kp9,
    Up, Down, Left, Right,
    Space, Enter, Tab, Backspace, Escape,
    LeftShift, RightShift, LeftControl, RightControl, LeftAlt, RightAlt,
}

/// Name table used both for parsing binding files and for display.
#[rustfmt::skip]
const KEY_NAMES: &[(&str, Key)] = &[
    ("a", Key::A), ("b", Key::B), ("c", Key::C), ("d", Key::D), ("e", Key::E),
    ("f", Key::F), ("g", Key::G), ("h", Key::H), ("i", Key::I), ("j", Key::J),
    ("k", Key::K), ("l", Key::L), ("m", Key::M), ("n", Key::N), ("o", Key::O),
    ("p", Key::P), ("q", Key::Q), ("r", Key::R), ("s", Key::S), ("t", Key::T),
    ("u", Key::U), ("v", Key::V), ("w", Key::W), ("x", Key::X), ("y", Key::Y),
    ("z", Key::Z),
    ("0", Key::Num0), ("1", Key::Num1), ("2", Key::Num2), ("3", Key::Num3), ("4", Key::Num4),
    ("5", Key::Num5), ("6", Key::Num6), ("7", Key::Num7), ("8", Key::Num8), ("9", Key::Num9),
    ("kp0", Key::Kp0), ("kp1", Key::Kp1), ("kp2", Key::Kp2), ("kp3", Key::Kp3), ("kp4", Key::Kp4),
    ("kp5", Key::Kp5), ("kp6", Key::Kp6), ("kp7", Key::Kp7), ("kp8", Key::Kp8), ("kp9", Key::Kp9),
    ("up", Key::Up), ("down", Key::Down), ("left", Key::Left), ("right", Key::Right),
    ("space", Key::Space), ("enter", Key::Enter), ("tab", Key::Tab),
    ("backspace", Key::Backspace), ("escape", Key::Escape),
    ("lshift", Key::LeftShift), ("rshift", Key::RightShift),
    ("lctrl", Key::LeftControl), ("rctrl", Key::RightControl),
    ("lalt", Key::LeftAlt), ("ralt", Key::RightAlt),
];

impl Key {
    pub fn name(self) -> &'static str {
        KEY_NAMES
            .iter()
            .find(|(_, key)| *key == self)
            .map(|(name, _)| *name)
            .unwrap_or("?")
    }
}

impl FromStr for Key {
    type Err = ArenaError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        KEY_NAMES
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, key)| *key)
            .ok_or_else(|| ArenaError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a held key means for the actor it is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Left,
    Right,
    Jump,
    Down,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Ok(Action::Left),
            "right" => Ok(Action::Right),
            "jump" | "up" => Ok(Action::Jump),
            "down" => Ok(Action::Down),
            other => Err(format!("unknown action '{}'", other)),
        }
    }
}

/// Key to action table for one control scheme.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scheme {
    keys: HashMap<Key, Action>,
}

impl Scheme {
    pub fn bind(&mut self, key: Key, action: Action) {
        self.keys.insert(key, action);
    }

    pub fn action(&self, key: Key) -> Option<Action> {
        self.keys.get(&key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Key, Action)> + '_ {
        self.keys.iter().map(|(k, a)| (*k, *a))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// All control schemes, indexed by scheme number (1-4 by convention).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyBindings {
    schemes: HashMap<u8, Scheme>,
}

impl KeyBindings {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let desc = Descriptor::load(path.as_ref())?;
        let bindings = Self::from_descriptor(&desc)?;
        info!(
            "Loaded {} control schemes from {}",
            bindings.schemes.len(),
            desc.path().display()
        );
        Ok(bindings)
    }

    /// Entries look like `1.left = A`.
    pub fn from_descriptor(desc: &Descriptor) -> Result<Self> {
        let mut bindings = KeyBindings::default();

        for entry in desc.entries() {
            let Some((scheme, action)) = entry.key.split_once('.') else {
                return Err(desc.error(entry.line, format!("expected '<scheme>.<action>', found '{}'", entry.key)));
            };

            let scheme: u8 = scheme
                .trim()
                .parse()
                .map_err(|_| desc.error(entry.line, format!("bad scheme number '{}'", scheme)))?;
            let action: Action = action.trim().parse().map_err(|e: String| desc.error(entry.line, e))?;
            let key: Key = entry
                .value
                .parse()
                .map_err(|e: ArenaError| desc.error(entry.line, e.to_string()))?;

            bindings.bind(scheme, key, action);
        }

        Ok(bindings)
    }

    pub fn bind(&mut self, scheme: u8, key: Key, action: Action) {
        self.schemes.entry(scheme).or_default().bind(key, action);
    }

    pub fn scheme(&self, scheme: u8) -> Option<&Scheme> {
        self.schemes.get(&scheme)
    }
}
