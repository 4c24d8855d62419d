//! Baseline classifiers: a raw-pixel linear SVM and a dominant-color
//! heuristic. Both are independent of the deep pipeline and share only the
//! dataset builder's raw image source.

pub mod color;
pub mod svm;

pub use color::{dominant_color, ColorMap};
pub use svm::{build_dataset as build_svm_dataset, LinearSvm, StandardScaler, SvmTrainConfig};
