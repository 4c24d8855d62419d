//! Training module: the supervised fine-tuning loop and evaluation helpers.

pub mod trainer;

pub use trainer::{evaluate, train_model, TrainingHistory};

/// Default number of training epochs
pub const DEFAULT_EPOCHS: usize = 100;

/// Default batch size
pub const DEFAULT_BATCH_SIZE: usize = 8;

/// Default learning rate
pub const DEFAULT_LEARNING_RATE: f64 = 0.001;
