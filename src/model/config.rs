//! Model and Training Configuration
//!
//! Serde-serializable configuration for the backbone choice, the classifier
//! head, and the fine-tuning loop. Checkpoints are backbone-specific, so
//! the backbone kind is part of every persisted configuration.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dataset::{IMAGE_SIZE, NUM_CLASSES};
use crate::utils::error::{Result, SketchError};

/// Supported pretrained backbones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackboneKind {
    ResNet18,
    ResNet50,
}

impl BackboneKind {
    /// Feature width produced by the backbone's global average pool
    pub fn feature_dim(&self) -> usize {
        match self {
            BackboneKind::ResNet18 => 512,
            BackboneKind::ResNet50 => 2048,
        }
    }

    /// Hidden width of the classifier head
    pub fn hidden_dim(&self) -> usize {
        match self {
            BackboneKind::ResNet18 => 256,
            BackboneKind::ResNet50 => 512,
        }
    }

    /// Residual blocks per stage
    pub fn block_counts(&self) -> [usize; 4] {
        match self {
            BackboneKind::ResNet18 => [2, 2, 2, 2],
            BackboneKind::ResNet50 => [3, 4, 6, 3],
        }
    }

    /// Whether stages use bottleneck blocks (1x1-3x3-1x1) instead of basic
    pub fn bottleneck(&self) -> bool {
        matches!(self, BackboneKind::ResNet50)
    }
}

impl std::fmt::Display for BackboneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackboneKind::ResNet18 => write!(f, "resnet18"),
            BackboneKind::ResNet50 => write!(f, "resnet50"),
        }
    }
}

impl FromStr for BackboneKind {
    type Err = SketchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "resnet18" => Ok(BackboneKind::ResNet18),
            "resnet50" => Ok(BackboneKind::ResNet50),
            other => Err(SketchError::Config(format!(
                "Unknown backbone '{}', expected resnet18 or resnet50",
                other
            ))),
        }
    }
}

/// Configuration for the classifier model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Backbone architecture
    pub backbone: BackboneKind,
    /// Number of output classes
    pub num_classes: usize,
    /// Input image size (width and height, assumed square)
    pub image_size: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            backbone: BackboneKind::ResNet18,
            num_classes: NUM_CLASSES,
            image_size: IMAGE_SIZE,
        }
    }
}

impl ModelConfig {
    /// Create a configuration for the given backbone
    pub fn new(backbone: BackboneKind) -> Self {
        Self {
            backbone,
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_classes == 0 {
            return Err(SketchError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }
        if self.image_size < 32 {
            return Err(SketchError::Config(
                "image_size must be at least 32 for the ResNet stem".to_string(),
            ));
        }
        Ok(())
    }

    /// Save configuration to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// Configuration for the fine-tuning loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Number of training epochs (always run in full; checkpointing is
    /// keep-best, not a stopping rule)
    pub epochs: usize,
    /// Batch size for training
    pub batch_size: usize,
    /// Learning rate for the head optimizer
    pub learning_rate: f64,
    /// Random seed driving splits, augmentation, and shuffling
    pub seed: u64,
    /// Path the best model state is persisted to
    pub checkpoint_path: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            epochs: 100,
            batch_size: 8,
            learning_rate: 0.001,
            seed: 42,
            checkpoint_path: "output/best_model".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backbone_dims() {
        assert_eq!(BackboneKind::ResNet18.feature_dim(), 512);
        assert_eq!(BackboneKind::ResNet18.hidden_dim(), 256);
        assert_eq!(BackboneKind::ResNet50.feature_dim(), 2048);
        assert_eq!(BackboneKind::ResNet50.hidden_dim(), 512);
    }

    #[test]
    fn test_backbone_from_str() {
        assert_eq!(
            "resnet18".parse::<BackboneKind>().unwrap(),
            BackboneKind::ResNet18
        );
        assert_eq!(
            "ResNet50".parse::<BackboneKind>().unwrap(),
            BackboneKind::ResNet50
        );
        assert!("vgg16".parse::<BackboneKind>().is_err());
    }

    #[test]
    fn test_model_config_validate() {
        let config = ModelConfig::default();
        assert!(config.validate().is_ok());

        let mut bad = ModelConfig::default();
        bad.num_classes = 0;
        assert!(bad.validate().is_err());

        let mut small = ModelConfig::default();
        small.image_size = 16;
        assert!(small.validate().is_err());
    }

    #[test]
    fn test_model_config_roundtrip() {
        let config = ModelConfig::new(BackboneKind::ResNet50);
        let path = std::env::temp_dir().join(format!(
            "pictionary_tl_config_{}.json",
            std::process::id()
        ));

        config.save(&path).unwrap();
        let loaded = ModelConfig::load(&path).unwrap();

        assert_eq!(loaded.backbone, BackboneKind::ResNet50);
        assert_eq!(loaded.num_classes, config.num_classes);

        std::fs::remove_file(&path).unwrap();
    }
}
