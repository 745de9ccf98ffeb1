//! Whole-machine snapshot state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// String-keyed snapshot of machine state.
///
/// Each device contributes entries under keys derived from its identity
/// (`latch8.<tag>.value`), so one snapshot covers a whole machine and
/// round-trips through JSON.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SaveState {
    entries: HashMap<String, serde_json::Value>,
}

impl SaveState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_u8(&mut self, key: &str, value: u8) {
        self.entries.insert(key.to_string(), value.into());
    }

    /// Look up a byte entry. `None` if the key is absent or not a byte.
    #[must_use]
    pub fn get_u8(&self, key: &str) -> Option<u8> {
        self.entries
            .get(key)
            .and_then(serde_json::Value::as_u64)
            .and_then(|v| u8::try_from(v).ok())
    }
}

/// A device that contributes to machine snapshots.
pub trait Persist {
    /// Write this device's state into the snapshot.
    fn save(&self, state: &mut SaveState);

    /// Restore previously saved state. Missing keys leave the current state
    /// untouched. Restoring never fires change notifications.
    fn restore(&mut self, state: &SaveState);
}
