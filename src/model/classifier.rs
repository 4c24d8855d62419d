//! Sketch Classifier
//!
//! Wraps a ResNet backbone with a small trainable head: linear down to an
//! intermediate width, ReLU, linear to the 10 sketch categories, softmax.
//! The backbone is frozen; its output is detached in the forward pass so
//! gradients only ever reach the head.

use std::path::Path;

use burn::{
    module::Module,
    nn::{Linear, LinearConfig, Relu},
    record::CompactRecorder,
    tensor::{activation::softmax, backend::Backend, Tensor},
};
use tracing::info;

use super::config::ModelConfig;
use super::resnet::ResNet;
use crate::utils::error::{Result, SketchError};

/// Transfer-learned sketch classifier: frozen backbone + trainable head
#[derive(Module, Debug)]
pub struct SketchClassifier<B: Backend> {
    backbone: ResNet<B>,
    fc1: Linear<B>,
    relu: Relu,
    fc2: Linear<B>,
    num_classes: usize,
}

impl<B: Backend> SketchClassifier<B> {
    /// Create a classifier for the configured backbone. The backbone starts
    /// from random init; use [`Self::with_backbone_record`] to load
    /// pretrained weights.
    pub fn new(config: &ModelConfig, device: &B::Device) -> Self {
        let backbone = ResNet::new(config.backbone, device);
        let feature_dim = config.backbone.feature_dim();
        let hidden_dim = config.backbone.hidden_dim();

        let fc1 = LinearConfig::new(feature_dim, hidden_dim).init(device);
        let fc2 = LinearConfig::new(hidden_dim, config.num_classes).init(device);

        Self {
            backbone,
            fc1,
            relu: Relu::new(),
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Load pretrained backbone weights from a Burn record file
    /// (converted offline from torchvision ImageNet weights).
    pub fn with_backbone_record(mut self, path: &Path, device: &B::Device) -> Result<Self> {
        info!("Loading backbone weights from {:?}", path);
        let recorder = CompactRecorder::new();
        self.backbone = self
            .backbone
            .load_file(path.to_path_buf(), &recorder, device)
            .map_err(|e| {
                SketchError::Checkpoint(format!("Failed to load backbone weights: {:?}", e))
            })?;
        Ok(self)
    }

    /// Forward pass: `[batch, 3, H, W]` -> 10-way probability vector per
    /// sample, `[batch, num_classes]`.
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        // Detaching the backbone output freezes it: no gradient flows past
        // this point, so the optimizer only ever updates the head.
        let features = self.backbone.forward(x).detach();

        let x = self.fc1.forward(features);
        let x = self.relu.forward(x);
        let x = self.fc2.forward(x);
        softmax(x, 1)
    }

    /// Number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Persist the full model state (frozen backbone included)
    pub fn save_checkpoint(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let recorder = CompactRecorder::new();
        self.clone()
            .save_file(path.to_path_buf(), &recorder)
            .map_err(|e| SketchError::Checkpoint(format!("Failed to save checkpoint: {:?}", e)))?;
        Ok(())
    }

    /// Load a full model state from a checkpoint. A checkpoint written for
    /// a different backbone has mismatched parameter shapes and fails here;
    /// callers treat this as fatal.
    pub fn load_checkpoint(self, path: &Path, device: &B::Device) -> Result<Self> {
        let recorder = CompactRecorder::new();
        self.load_file(path.to_path_buf(), &recorder, device)
            .map_err(|e| {
                SketchError::Checkpoint(format!(
                    "Failed to load checkpoint {:?} (wrong backbone?): {:?}",
                    path, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use crate::model::config::BackboneKind;

    #[test]
    fn test_head_outputs_ten_classes_resnet18() {
        let device = Default::default();
        let config = ModelConfig::new(BackboneKind::ResNet18);
        let model = SketchClassifier::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([2, 3, 64, 64], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [2, 10]);
    }

    #[test]
    fn test_head_outputs_ten_classes_resnet50() {
        let device = Default::default();
        let config = ModelConfig::new(BackboneKind::ResNet50);
        let model = SketchClassifier::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::zeros([1, 3, 64, 64], &device);
        let output = model.forward(input);

        assert_eq!(output.dims(), [1, 10]);
    }

    #[test]
    fn test_forward_returns_probabilities() {
        let device = Default::default();
        let config = ModelConfig::new(BackboneKind::ResNet18);
        let model = SketchClassifier::<DefaultBackend>::new(&config, &device);

        let input = Tensor::<DefaultBackend, 4>::random(
            [2, 3, 64, 64],
            burn::tensor::Distribution::Uniform(-1.0, 1.0),
            &device,
        );
        let output = model.forward(input);
        let data: Vec<f32> = output.into_data().to_vec().unwrap();

        for row in data.chunks(10) {
            let sum: f32 = row.iter().sum();
            assert!((sum - 1.0).abs() < 1e-4, "row does not sum to 1: {}", sum);
            assert!(row.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let device = Default::default();
        let config = ModelConfig::new(BackboneKind::ResNet18);
        let model = SketchClassifier::<DefaultBackend>::new(&config, &device);

        let path = std::env::temp_dir().join(format!(
            "pictionary_tl_ckpt_{}",
            std::process::id()
        ));

        model.save_checkpoint(&path).unwrap();

        let restored = SketchClassifier::<DefaultBackend>::new(&config, &device)
            .load_checkpoint(&path, &device)
            .unwrap();
        assert_eq!(restored.num_classes(), 10);

        let _ = std::fs::remove_file(path.with_extension("mpk"));
    }
}
