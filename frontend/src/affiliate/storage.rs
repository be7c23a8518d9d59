use log::debug;
use web_sys::{window, Storage};

/// Best-effort string store. Reads that fail look like a missing key and writes
/// that fail are dropped.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// `window.localStorage`, or nothing at all when storage is disabled.
pub struct BrowserStorage {
    storage: Option<Storage>,
}

impl BrowserStorage {
    pub fn local() -> Self {
        let storage = window()
            .and_then(|w| w.local_storage().ok())
            .flatten();
        if storage.is_none() {
            debug!("localStorage unavailable, affiliate ids will not persist");
        }
        Self { storage }
    }
}

impl KeyValueStore for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.storage
            .as_ref()
            .and_then(|storage| storage.get_item(key).ok())
            .flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = &self.storage {
            if storage.set_item(key, value).is_err() {
                debug!("failed to write {} to localStorage", key);
            }
        }
    }

    fn remove(&self, key: &str) {
        if let Some(storage) = &self.storage {
            let _ = storage.remove_item(key);
        }
    }
}
