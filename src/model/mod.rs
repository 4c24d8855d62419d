//! Model module: ResNet backbones and the transfer-learning classifier.

pub mod classifier;
pub mod config;
pub mod resnet;

pub use classifier::SketchClassifier;
pub use config::{BackboneKind, ModelConfig, TrainConfig};
pub use resnet::ResNet;
