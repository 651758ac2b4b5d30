//! `window.localStorage` as a [`PreferenceStore`].

use quadscan_editor::PreferenceStore;

/// Browser local storage.
///
/// Storage can be missing (private browsing, disabled cookies) or full;
/// both degrade to "no stored preference" with a log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok().flatten()
    }
}

impl PreferenceStore for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        let Some(storage) = Self::storage() else {
            log::warn!("localStorage unavailable; not saving {key}");
            return;
        };
        if let Err(err) = storage.set_item(key, value) {
            log::warn!("failed to save {key}: {err:?}");
        }
    }
}
