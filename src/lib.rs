//! # Pictionary Sketch Classifier
//!
//! A Rust library for classifying hand-drawn pictionary sketches into ten
//! object categories using transfer learning with the Burn framework.
//!
//! ## Features
//!
//! - **Transfer learning** with a frozen ResNet18/ResNet50 backbone and a
//!   small trainable classifier head
//! - **Folder-tree datasets** with augmentation (flip, rotation,
//!   translation) and train/val/test splits
//! - **Keep-best training loop** persisting the lowest-validation-loss
//!   checkpoint while always running the full epoch count
//! - **Baselines**: a raw-pixel linear SVM and a dominant-color heuristic
//!
//! ## Modules
//!
//! - `dataset`: folder walking, splits, augmentation, Burn batching
//! - `model`: ResNet backbones and the classifier head
//! - `training`: the fine-tuning loop and evaluation helpers
//! - `inference`: checkpoint loading and single-sketch prediction
//! - `baseline`: SVM and color-heuristic classifiers
//! - `utils`: errors, logging, and metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use pictionary_tl::backend::TrainingBackend;
//! use pictionary_tl::dataset::get_dataloaders;
//! use pictionary_tl::model::{BackboneKind, ModelConfig, SketchClassifier, TrainConfig};
//! use pictionary_tl::training::train_model;
//!
//! let device = pictionary_tl::backend::default_device();
//! let loaders = get_dataloaders("data/sketches", 8, 42)?;
//! let model = SketchClassifier::<TrainingBackend>::new(
//!     &ModelConfig::new(BackboneKind::ResNet18),
//!     &device,
//! );
//! let (model, history) = train_model(model, &loaders, &TrainConfig::default(), &device)?;
//! ```

pub mod backend;
pub mod baseline;
pub mod dataset;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

// Re-export commonly used items for convenience
pub use baseline::{ColorMap, LinearSvm};
pub use dataset::{get_dataloaders, DataLoaders, SketchBatch, SketchBatcher, SketchDataset};
pub use inference::{Prediction, Predictor};
pub use model::{BackboneKind, ModelConfig, SketchClassifier, TrainConfig};
pub use training::{train_model, TrainingHistory};
pub use utils::error::{Result, SketchError};
pub use utils::metrics::{ConfusionMatrix, Metrics};

/// Number of sketch categories
pub const NUM_CLASSES: usize = dataset::NUM_CLASSES;

/// Default working resolution for model inputs
pub const IMAGE_SIZE: usize = dataset::IMAGE_SIZE;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
