//! Dataset module for pictionary sketch data handling
//!
//! This module provides functionality for:
//! - Walking a labeled image-folder tree and deriving labels from folder names
//! - Splitting into train/val/test sets
//! - Data augmentation (flip, rotation, translation) for train/val samples
//! - Burn `Dataset`/`Batcher` integration for training batches
//!
//! ## Split Strategy
//!
//! Two sequential random splits: 10% of all images is held out as the test
//! set, then 10% of the remainder becomes the validation set, leaving
//! roughly 81/9/10 train/val/test overall.

pub mod augmentation;
pub mod burn_dataset;
pub mod loader;

pub use augmentation::Augmenter;
pub use burn_dataset::{SketchBatch, SketchBatcher, SketchDataset, SketchItem};
pub use loader::{get_dataloaders, DataLoaders, SketchFolder, SketchSample};

use crate::utils::error::{Result, SketchError};

/// Number of sketch categories
pub const NUM_CLASSES: usize = 10;

/// Working resolution for all model inputs (assumed square)
pub const IMAGE_SIZE: usize = 128;

/// Sketch category names. Index order is the label id and must stay fixed:
/// every component (dataset builder, baselines, inference) shares this map.
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "Airplane", "Bicycle", "Butterfly", "Car", "Flower", "House", "Ladybug", "Train", "Tree",
    "Whale",
];

/// Get the category name for a given label id
pub fn class_name(label: usize) -> Option<&'static str> {
    CLASS_NAMES.get(label).copied()
}

/// Get the label id for a given category name
pub fn class_index(name: &str) -> Option<usize> {
    CLASS_NAMES.iter().position(|&n| n == name)
}

/// Resolve a folder name to a label id, failing on names outside the label map
pub fn class_index_checked(name: &str, path: &std::path::Path) -> Result<usize> {
    class_index(name).ok_or_else(|| SketchError::UnknownClass {
        name: name.to_string(),
        path: path.to_path_buf(),
    })
}
