//! Key/value persistence
//!
//! LocalStorage on the web, an in-memory map everywhere else. Values are plain
//! strings or JSON with no schema version: anything missing or unparsable is
//! treated as absent so the caller falls back to defaults.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Minimal string store
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
}

/// Load and parse a JSON value, `None` if missing or malformed
pub fn load_json<T: DeserializeOwned>(storage: &dyn Storage, key: &str) -> Option<T> {
    let raw = storage.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring malformed value for '{}': {}", key, e);
            None
        }
    }
}

/// Serialize and store a JSON value
pub fn save_json<T: Serialize>(storage: &mut dyn Storage, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => storage.set(key, &json),
        Err(e) => log::warn!("Could not serialize '{}': {}", key, e),
    }
}

/// Load an integer counter, `None` if missing or not a number
pub fn load_u64(storage: &dyn Storage, key: &str) -> Option<u64> {
    let raw = storage.get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("Ignoring non-numeric value for '{}': {:?}", key, raw);
            None
        }
    }
}

pub fn save_u64(storage: &mut dyn Storage, key: &str, value: u64) {
    storage.set(key, &value.to_string());
}

/// In-memory storage (native builds and tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Browser LocalStorage; every failure (private mode, quota) is swallowed
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl Storage for LocalStorage {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(key, value).is_err() {
                log::warn!("LocalStorage write failed for '{}'", key);
            }
        }
    }

    fn remove(&mut self, key: &str) {
        if let Some(storage) = Self::storage() {
            let _ = storage.remove_item(key);
        }
    }
}

/// Storage for the current platform
#[cfg(target_arch = "wasm32")]
pub fn platform_storage() -> Box<dyn Storage> {
    Box::new(LocalStorage)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn platform_storage() -> Box<dyn Storage> {
    Box::new(MemoryStorage::new())
}
