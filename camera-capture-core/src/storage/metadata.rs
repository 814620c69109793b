use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::StorageError;
use crate::models::take_result::TakeMetadata;

/// Path of the JSON sidecar for `result_path`.
pub fn sidecar_path(result_path: &Path) -> PathBuf {
    result_path.with_extension("metadata.json")
}

/// Write take metadata as a JSON sidecar file.
///
/// Creates `{result_stem}.metadata.json` alongside the result.
pub async fn write_metadata(metadata: &TakeMetadata, result_path: &Path) -> Result<(), StorageError> {
    let json = serde_json::to_string_pretty(metadata)?;
    tokio::fs::write(sidecar_path(result_path), json).await?;
    Ok(())
}

/// Read take metadata from a JSON sidecar file.
pub fn read_metadata(result_path: &Path) -> Result<TakeMetadata, StorageError> {
    let json = fs::read_to_string(sidecar_path(result_path))?;
    Ok(serde_json::from_str(&json)?)
}
