//! Client-local persisted preferences.
//!
//! Only the last chosen output mode is persisted. The stored value is a
//! default for the next session, never authoritative: anything
//! unrecognised is ignored.

use std::collections::HashMap;

use crate::config::OutputMode;

/// Storage key of the last chosen output mode.
pub const OUTPUT_MODE_KEY: &str = "scanimage-color-mode";

/// A string key-value store (e.g. `localStorage`).
pub trait PreferenceStore {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value. Failures are logged by the implementation and
    /// otherwise ignored; losing a preference is never fatal.
    fn set(&mut self, key: &str, value: &str);
}

/// Load the persisted output mode, if a valid one is stored.
#[must_use]
pub fn load_output_mode(store: &impl PreferenceStore) -> Option<OutputMode> {
    let raw = store.get(OUTPUT_MODE_KEY)?;
    match raw.parse() {
        Ok(mode) => Some(mode),
        Err(err) => {
            log::debug!("ignoring stored preference: {err}");
            None
        }
    }
}

/// Persist `mode` as the default for future sessions.
pub fn save_output_mode(store: &mut impl PreferenceStore, mode: OutputMode) {
    store.set(OUTPUT_MODE_KEY, mode.as_str());
}

/// In-memory store for tests and the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPreferences {
    values: HashMap<String, String>,
}

impl MemoryPreferences {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.values.insert(key.to_owned(), value.to_owned());
    }
}
