use async_trait::async_trait;

use crate::models::error::StorageError;

/// A JSON object keyed by device id.
pub type PreferenceMap = serde_json::Map<String, serde_json::Value>;

/// Key-value persistence for preference state.
///
/// Implemented by:
/// - `MemoryPreferenceStore`
/// - `JsonFilePreferenceStore`
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Load the map stored under `key`. A missing key yields an empty map.
    async fn load(&self, key: &str) -> Result<PreferenceMap, StorageError>;

    async fn save(&self, key: &str, value: PreferenceMap) -> Result<(), StorageError>;
}
