use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::models::error::StorageError;
use crate::traits::preference_store::{PreferenceMap, PreferenceStore};

/// Preference store kept in memory. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    maps: Mutex<HashMap<String, PreferenceMap>>,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed one entry of the map stored under `key`.
    pub fn insert(&self, key: &str, entry: &str, value: serde_json::Value) {
        self.maps
            .lock()
            .entry(key.to_string())
            .or_default()
            .insert(entry.to_string(), value);
    }

    pub fn snapshot(&self, key: &str) -> PreferenceMap {
        self.maps.lock().get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl PreferenceStore for MemoryPreferenceStore {
    async fn load(&self, key: &str) -> Result<PreferenceMap, StorageError> {
        Ok(self.snapshot(key))
    }

    async fn save(&self, key: &str, value: PreferenceMap) -> Result<(), StorageError> {
        self.maps.lock().insert(key.to_string(), value);
        Ok(())
    }
}
