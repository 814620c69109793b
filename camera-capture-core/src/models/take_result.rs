use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::mode::Mode;
use super::resolution::Resolution;

/// A file written by the result sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub checksum: String,
}

/// Metadata describing one saved take.
///
/// Serializable for the JSON sidecar written next to the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TakeMetadata {
    pub id: String,
    pub mode: Mode,
    pub device_id: String,
    pub resolution: Option<Resolution>,
    pub created_at: String,
    /// Reprocessing effect applied to this file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
}

impl TakeMetadata {
    pub fn new(mode: Mode, device_id: &str, resolution: Option<Resolution>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            mode,
            device_id: device_id.to_string(),
            resolution,
            created_at: chrono::Utc::now().to_rfc3339(),
            effect: None,
        }
    }

    /// The same take, describing the file produced by `effect`.
    pub fn with_effect(&self, effect: &str) -> Self {
        Self {
            effect: Some(effect.to_string()),
            ..self.clone()
        }
    }
}

/// What a successful take produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TakeResult {
    Photo {
        file: SavedFile,
        metadata: TakeMetadata,
    },
    Video {
        file: SavedFile,
        duration_minutes: u64,
        metadata: TakeMetadata,
    },
    Portrait {
        reference: SavedFile,
        effect: Option<SavedFile>,
        metadata: TakeMetadata,
    },
}

impl TakeResult {
    pub fn metadata(&self) -> &TakeMetadata {
        match self {
            Self::Photo { metadata, .. }
            | Self::Video { metadata, .. }
            | Self::Portrait { metadata, .. } => metadata,
        }
    }

    /// Every file the take wrote, primary file first.
    pub fn files(&self) -> Vec<&SavedFile> {
        match self {
            Self::Photo { file, .. } | Self::Video { file, .. } => vec![file],
            Self::Portrait { reference, effect, .. } => std::iter::once(reference).chain(effect.as_ref()).collect(),
        }
    }
}

/// How a take ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum TakeOutcome {
    Saved(TakeResult),
    Cancelled,
}

impl TakeOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    pub fn result(&self) -> Option<&TakeResult> {
        match self {
            Self::Saved(result) => Some(result),
            Self::Cancelled => None,
        }
    }
}

/// Video length reported in whole minutes, rounded up.
pub fn elapsed_minutes(elapsed_secs: f64) -> u64 {
    if elapsed_secs <= 0.0 {
        return 0;
    }
    (elapsed_secs / 60.0).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_minutes_rounds_up() {
        assert_eq!(elapsed_minutes(0.0), 0);
        assert_eq!(elapsed_minutes(1.0), 1);
        assert_eq!(elapsed_minutes(60.0), 1);
        assert_eq!(elapsed_minutes(60.5), 2);
    }

    #[test]
    fn metadata_serializes_to_json() {
        let metadata = TakeMetadata::new(Mode::Square, "cam0", Some(Resolution::new(1080, 1080)));
        let json = serde_json::to_string(&metadata).unwrap();
        assert!(json.contains("\"mode\":\"square\""));
        let parsed: TakeMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn portrait_lists_reference_then_effect() {
        let file = |name: &str| SavedFile {
            path: PathBuf::from(name),
            size_bytes: 1,
            checksum: String::new(),
        };
        let metadata = TakeMetadata::new(Mode::Portrait, "cam0", None);
        let result = TakeResult::Portrait {
            reference: file("ref.jpg"),
            effect: Some(file("fx.jpg")),
            metadata: metadata.clone(),
        };
        let paths: Vec<_> = result.files().iter().map(|f| f.path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("ref.jpg"), PathBuf::from("fx.jpg")]);

        let result = TakeResult::Portrait {
            reference: file("ref.jpg"),
            effect: None,
            metadata,
        };
        assert_eq!(result.files().len(), 1);
    }
}
