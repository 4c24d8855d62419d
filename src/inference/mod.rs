//! Inference module: checkpoint loading and single-sketch prediction.

pub mod predictor;

pub use predictor::{Prediction, Predictor};
