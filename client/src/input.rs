//! Keyboard polling for the render loop
//!
//! Key transitions reported by macroquad are translated to [`shared::Key`] and
//! fed into the world; turning held keys into controls happens separately in
//! the input-dispatch context.

use log::info;
use macroquad::prelude::*;
use shared::{Key, QuitSignal, World};

/// Maps a macroquad key code to the backend-independent key name. Keys with
/// no binding name are ignored.
#[rustfmt::skip]
pub fn translate(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::A => Key::A, KeyCode::B => Key::B, KeyCode::C => Key::C,
        KeyCode::D => Key::D, KeyCode::E => Key::E, KeyCode::F => Key::F,
        KeyCode::G => Key::G, KeyCode::H => Key::H, KeyCode::I => Key::I,
        KeyCode::J => Key::J, KeyCode::K => Key::K, KeyCode::L => Key::L,
        KeyCode::M => Key::M, KeyCode::N => Key::N, KeyCode::O => Key::O,
        KeyCode::P => Key::P, KeyCode::Q => Key::Q, KeyCode::R => Key::R,
        KeyCode::S => Key::S, KeyCode::T => Key::T, KeyCode::U => Key::U,
        KeyCode::V => Key::V, KeyCode::W => Key::W, KeyCode::X => Key::X,
        KeyCode::Y => Key::Y, KeyCode::Z => Key::Z,
        KeyCode::Key0 => Key::Num0, KeyCode::Key1 => Key::Num1, KeyCode::Key2 => Key::Num2,
        KeyCode::Key3 => Key::Num3, KeyCode::Key4 => Key::Num4, KeyCode::Key5 => Key::Num5,
        KeyCode::Key6 => Key::Num6, KeyCode::Key7 => Key::Num7, KeyCode::Key8 => Key::Num8,
        KeyCode::Key9 => Key::Num9,
        KeyCode::Kp0 => Key::Kp0, KeyCode::Kp1 => Key::Kp1, KeyCode::Kp2 => Key::Kp2,
        KeyCode::Kp3 => Key::Kp3, KeyCode::Kp4 => Key::Kp4, KeyCode::Kp5 => Key::Kp5,
        KeyCode::Kp6 => Key::Kp6, KeyCode::Kp7 => Key::Kp7, KeyCode::Kp8 => Key::Kp8,
        KeyCode::Kp9 => Key::Kp9,
        KeyCode::Up => Key::Up, KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left, KeyCode::Right => Key::Right,
        KeyCode::Space => Key::Space, KeyCode::Enter => Key::Enter, KeyCode::Tab => Key::Tab,
        KeyCode::Backspace => Key::Backspace, KeyCode::Escape => Key::Escape,
        KeyCode::LeftShift => Key::LeftShift, KeyCode::RightShift => Key::RightShift,
        KeyCode::LeftControl => Key::LeftControl, KeyCode::RightControl => Key::RightControl,
        KeyCode::LeftAlt => Key::LeftAlt, KeyCode::RightAlt => Key::RightAlt,
        _ => return None,
    };
    Some(key)
}

/// Polls the window once per frame.
pub struct InputPoller {
    quit: QuitSignal,
}

impl InputPoller {
    /// Takes over the window close button so closing goes through `quit`.
    pub fn new(quit: QuitSignal) -> Self {
        prevent_quit();
        Self { quit }
    }

    /// Forwards this frame's key transitions to `world`. Escape or closing the
    /// window triggers quit.
    pub fn poll(&self, world: &World) {
        if is_quit_requested() || is_key_pressed(KeyCode::Escape) {
            if !self.quit.is_set() {
                info!("Quit requested");
            }
            self.quit.trigger();
            return;
        }

        for code in get_keys_pressed() {
            if let Some(key) = translate(code) {
                world.key_event(key, true);
            }
        }
        for code in get_keys_released() {
            if let Some(key) = translate(code) {
                world.key_event(key, false);
            }
        }
    }
}
