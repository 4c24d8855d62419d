//! Utility modules: error types, logging setup, and evaluation metrics.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{Result, SketchError};
pub use metrics::{ConfusionMatrix, Metrics};
