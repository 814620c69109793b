use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::error::StorageError;
use crate::traits::preference_store::{PreferenceMap, PreferenceStore};

/// Preference store backed by a single JSON object file.
///
/// ```text
/// {
///   "devicePhotoResolution": { "<device id>": [4032, 3024] },
///   "deviceVideoFps": { "<device id>": { "1920x1080": 60 } }
/// }
/// ```
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    // Saves read-modify-write the whole file.
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFilePreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_all(&self) -> Result<PreferenceMap, StorageError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PreferenceMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(map) => Ok(map),
            other => Err(StorageError::Serialization(format!(
                "expected a JSON object in {}, found {}",
                self.path.display(),
                other
            ))),
        }
    }
}

#[async_trait]
impl PreferenceStore for JsonFilePreferenceStore {
    async fn load(&self, key: &str) -> Result<PreferenceMap, StorageError> {
        let all = self.read_all().await?;
        match all.get(key) {
            Some(Value::Object(map)) => Ok(map.clone()),
            Some(_) => Err(StorageError::Serialization(format!("{} is not an object", key))),
            None => Ok(PreferenceMap::new()),
        }
    }

    async fn save(&self, key: &str, value: PreferenceMap) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.insert(key.to_string(), Value::Object(value));

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(all))?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
