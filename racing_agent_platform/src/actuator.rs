//! Delivery of chosen actions to the game.
//!
//! Injecting input into another process is platform specific and lives
//! outside this crate; here actions are translated into key press/release
//! events on a [`KeySink`].

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::agent::Action;

/// Receives driving commands. Calls are fire-and-forget and may arrive at the
/// telemetry rate.
pub trait Actuator {
    fn apply(&mut self, action: Action);
    fn release_all(&mut self);
    /// Press (`true`) or release (`false`) the restart trigger.
    fn restart_trigger(&mut self, pressed: bool);
}

/// Low-level key events, e.g. a virtual keyboard.
pub trait KeySink {
    fn press(&mut self, key: char);
    fn release(&mut self, key: char);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub accelerate: char,
    pub brake: char,
    pub left: char,
    pub right: char,
    pub restart: char,
}

impl Default for KeyBindings {
    /// ZQSD layout, `n` restarts the race.
    fn default() -> Self {
        Self {
            accelerate: 'z',
            brake: 's',
            left: 'q',
            right: 'd',
            restart: 'n',
        }
    }
}

impl KeyBindings {
    pub fn control_keys(&self) -> [char; 4] {
        [self.accelerate, self.brake, self.left, self.right]
    }

    /// Keys held down while `action` is active.
    pub fn keys_for(&self, action: Action) -> Vec<char> {
        let mut keys = Vec::with_capacity(2);
        if action.accelerates() {
            keys.push(self.accelerate);
        }
        if action == Action::Brake {
            keys.push(self.brake);
        }
        if action.steers_left() {
            keys.push(self.left);
        }
        if action.steers_right() {
            keys.push(self.right);
        }
        keys
    }
}

/// Maps actions onto key bindings. Every action first releases all control
/// keys so only the chosen combination stays held.
#[derive(Debug)]
pub struct KeyboardActuator<K> {
    sink: K,
    bindings: KeyBindings,
}

impl<K: KeySink> KeyboardActuator<K> {
    pub fn new(sink: K, bindings: KeyBindings) -> Self {
        Self { sink, bindings }
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn into_sink(self) -> K {
        self.sink
    }
}

impl<K: KeySink> Actuator for KeyboardActuator<K> {
    fn apply(&mut self, action: Action) {
        self.release_all();
        for key in self.bindings.keys_for(action) {
            self.sink.press(key);
        }
    }

    fn release_all(&mut self) {
        for key in self.bindings.control_keys() {
            self.sink.release(key);
        }
    }

    fn restart_trigger(&mut self, pressed: bool) {
        if pressed {
            self.sink.press(self.bindings.restart);
        } else {
            self.sink.release(self.bindings.restart);
        }
    }
}

/// Dry-run sink: logs key events instead of sending them anywhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingKeySink;

impl KeySink for TracingKeySink {
    fn press(&mut self, key: char) {
        debug!(%key, "key down");
    }

    fn release(&mut self, key: char) {
        debug!(%key, "key up");
    }
}

/// Key event captured by [`RecordingKeySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEvent {
    Press(char),
    Release(char),
}

/// Keeps every key event in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingKeySink {
    pub events: Vec<KeyEvent>,
}

impl RecordingKeySink {
    pub fn pressed(&self) -> Vec<char> {
        self.events
            .iter()
            .filter_map(|e| match e {
                KeyEvent::Press(k) => Some(*k),
                KeyEvent::Release(_) => None,
            })
            .collect()
    }
}

impl KeySink for RecordingKeySink {
    fn press(&mut self, key: char) {
        self.events.push(KeyEvent::Press(key));
    }

    fn release(&mut self, key: char) {
        self.events.push(KeyEvent::Release(key));
    }
}
