//! Error Handling Module
//!
//! Defines custom error types for the sketch classification library.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for sketch classification operations
#[derive(Error, Debug)]
pub enum SketchError {
    /// Error loading or decoding an image
    #[error("Failed to load image at '{0}': {1}")]
    ImageLoad(PathBuf, String),

    /// A folder name that is not a key of the fixed label map.
    /// This is a configuration error and is never recovered from.
    #[error("Unknown class folder '{name}' for image '{path}'")]
    UnknownClass { name: String, path: PathBuf },

    /// Error with dataset operations
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Checkpoint load/save failure (includes parameter shape mismatches)
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for sketch classification operations
pub type Result<T> = std::result::Result<T, SketchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SketchError::Dataset("no images found".to_string());
        assert_eq!(format!("{}", err), "Dataset error: no images found");
    }

    #[test]
    fn test_unknown_class_display() {
        let err = SketchError::UnknownClass {
            name: "Dinosaur".to_string(),
            path: PathBuf::from("/data/Dinosaur/img.png"),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Dinosaur"));
        assert!(msg.contains("img.png"));
    }
}
