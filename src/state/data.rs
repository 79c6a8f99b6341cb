/// Shared data structures for the application state
///
/// These structs represent the data model that flows between
/// the camera, the upload layer and the UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Species identification returned by the remote endpoint
///
/// Immutable once received. A new result replaces it wholesale,
/// a reset clears it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IdentificationResult {
    /// Latin binomial (e.g., "Panthera leo")
    pub scientific_name: String,
    /// Vernacular name (e.g., "Lion")
    pub common_name: String,
    /// Free text, may contain inline <b>/<i> markup
    pub description: String,
}

impl IdentificationResult {
    /// The generic result shown for every failed attempt
    pub fn failed() -> Self {
        Self {
            scientific_name: "Unknown".to_string(),
            common_name: "Unknown".to_string(),
            description: "Failed to identify species.".to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        *self == Self::failed()
    }
}

/// A still produced by the camera surface
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    /// JPEG still inside the capture directory
    pub path: PathBuf,
    /// When the shutter fired
    pub captured_at: DateTime<Utc>,
    /// Frame dimensions in pixels
    pub width: u32,
    pub height: u32,
    /// Downscaled JPEG kept in memory so the screen can show the photo
    /// after the still itself has been deleted
    pub preview_jpeg: Vec<u8>,
}

impl CapturedPhoto {
    /// Delete the still from disk. Safe to call more than once.
    pub fn discard_file(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!("🗑️  Discarded capture {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("⚠️  Could not delete capture {}: {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_json_field_names() {
        let json = r#"{"scientific_name":"Panthera leo","common_name":"Lion","description":"A <b>large</b> cat."}"#;
        let result: IdentificationResult = serde_json::from_str(json).unwrap();

        assert_eq!(result.scientific_name, "Panthera leo");
        assert_eq!(result.common_name, "Lion");
        assert_eq!(result.description, "A <b>large</b> cat.");
        assert!(!result.is_failure());
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let json = r#"{"scientific_name":"Panthera leo","common_name":"Lion"}"#;
        assert!(serde_json::from_str::<IdentificationResult>(json).is_err());
    }

    #[test]
    fn test_failed_result() {
        let failed = IdentificationResult::failed();
        assert_eq!(failed.common_name, "Unknown");
        assert_eq!(failed.scientific_name, "Unknown");
        assert_eq!(failed.description, "Failed to identify species.");
        assert!(failed.is_failure());
    }

    #[test]
    fn test_discard_file_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.jpg");
        std::fs::write(&path, b"jpeg").unwrap();

        let photo = CapturedPhoto {
            path: path.clone(),
            captured_at: Utc::now(),
            width: 1,
            height: 1,
            preview_jpeg: Vec::new(),
        };

        photo.discard_file();
        assert!(!path.exists());
        photo.discard_file();
    }
}
