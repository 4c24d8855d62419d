//! Inference Predictor Module
//!
//! Loads a trained checkpoint and classifies single sketches. The predictor
//! is built once at startup and shared read-only afterwards; a checkpoint
//! written for a different backbone fails to load and that error is fatal.

use std::collections::BTreeMap;
use std::path::Path;

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::{DynamicImage, ImageReader};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::augmentation::Augmenter;
use crate::dataset::class_name;
use crate::model::{ModelConfig, SketchClassifier};
use crate::utils::error::{Result, SketchError};

/// Result of a single prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,
    /// Arg-max class id
    pub class_id: usize,
    /// Category name for the arg-max class
    pub class_name: String,
    /// Probability of the arg-max class
    pub confidence: f32,
}

impl Prediction {
    /// Build a prediction from a probability vector
    pub fn new(probabilities: Vec<f32>) -> Self {
        let (class_id, &confidence) = probabilities
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .unwrap_or((0, &0.0));

        Self {
            class_id,
            class_name: class_name(class_id).unwrap_or("Unknown").to_string(),
            confidence,
            probabilities,
        }
    }

    /// Per-label score map, suitable for a JSON `all_predictions` payload
    pub fn score_map(&self) -> BTreeMap<String, f32> {
        self.probabilities
            .iter()
            .enumerate()
            .map(|(id, &p)| (class_name(id).unwrap_or("Unknown").to_string(), p))
            .collect()
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Prediction: {} (class {}) - {:.2}%",
            self.class_name,
            self.class_id,
            self.confidence * 100.0
        )?;
        for (id, p) in self.probabilities.iter().enumerate() {
            writeln!(
                f,
                "  {:2}. {:10} {:6.2}%",
                id,
                class_name(id).unwrap_or("?"),
                p * 100.0
            )?;
        }
        Ok(())
    }
}

/// Predictor owning the loaded model and the training-time preprocessing
pub struct Predictor<B: Backend> {
    model: SketchClassifier<B>,
    device: B::Device,
    augmenter: Augmenter,
    image_size: usize,
}

impl<B: Backend> Predictor<B> {
    /// Load a checkpoint for the configured backbone. Parameter shape
    /// mismatches (checkpoint from the other backbone) surface here as a
    /// fatal error.
    pub fn from_checkpoint(
        config: &ModelConfig,
        checkpoint: &Path,
        device: B::Device,
    ) -> Result<Self> {
        config.validate()?;
        info!(
            "Loading {} checkpoint from {:?}",
            config.backbone, checkpoint
        );

        let model =
            SketchClassifier::<B>::new(config, &device).load_checkpoint(checkpoint, &device)?;

        Ok(Self {
            model,
            device,
            augmenter: Augmenter::new(config.image_size as u32),
            image_size: config.image_size,
        })
    }

    /// Wrap an already-built model (used by tests and the training CLI)
    pub fn from_model(model: SketchClassifier<B>, config: &ModelConfig, device: B::Device) -> Self {
        Self {
            model,
            device,
            augmenter: Augmenter::new(config.image_size as u32),
            image_size: config.image_size,
        }
    }

    /// Predict from a preprocessed (normalized CHW) image buffer
    pub fn predict_normalized(&self, data: Vec<f32>) -> Result<Prediction> {
        let expected = 3 * self.image_size * self.image_size;
        if data.len() != expected {
            return Err(SketchError::Config(format!(
                "Preprocessed buffer has {} values, expected {}",
                data.len(),
                expected
            )));
        }

        let input = Tensor::<B, 4>::from_floats(
            TensorData::new(data, [1, 3, self.image_size, self.image_size]),
            &self.device,
        );

        let output = self.model.forward(input);
        let probabilities: Vec<f32> = output.into_data().to_vec().unwrap();

        Ok(Prediction::new(probabilities))
    }

    /// Preprocess and classify one image
    pub fn predict_image(&self, image: &DynamicImage) -> Result<Prediction> {
        let data = self.augmenter.identity_variant(image);
        self.predict_normalized(data)
    }

    /// Load, preprocess, and classify an image file
    pub fn predict_path(&self, path: &Path) -> Result<Prediction> {
        let image = ImageReader::open(path)
            .map_err(|e| SketchError::ImageLoad(path.to_path_buf(), e.to_string()))?
            .decode()
            .map_err(|e| SketchError::ImageLoad(path.to_path_buf(), e.to_string()))?;
        self.predict_image(&image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::DefaultBackend;
    use crate::model::BackboneKind;
    use image::{ImageBuffer, Rgb};

    fn small_config() -> ModelConfig {
        let mut config = ModelConfig::new(BackboneKind::ResNet18);
        config.image_size = 64;
        config
    }

    #[test]
    fn test_prediction_argmax() {
        let mut probs = vec![0.0f32; 10];
        probs[6] = 0.7;
        probs[2] = 0.3;

        let prediction = Prediction::new(probs);

        assert_eq!(prediction.class_id, 6);
        assert_eq!(prediction.class_name, "Ladybug");
        assert!((prediction.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_score_map_covers_all_labels() {
        let prediction = Prediction::new(vec![0.1f32; 10]);
        let map = prediction.score_map();

        assert_eq!(map.len(), 10);
        assert!(map.contains_key("Airplane"));
        assert!(map.contains_key("Whale"));
    }

    #[test]
    fn test_predict_image_returns_distribution() {
        let device = Default::default();
        let config = small_config();
        let model = SketchClassifier::<DefaultBackend>::new(&config, &device);
        let predictor = Predictor::from_model(model, &config, device);

        let img = DynamicImage::ImageRgb8(ImageBuffer::from_pixel(
            32,
            32,
            Rgb([255, 255, 255]),
        ));
        let prediction = predictor.predict_image(&img).unwrap();

        assert_eq!(prediction.probabilities.len(), 10);
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-4);
        assert!(prediction.class_id < 10);
    }

    #[test]
    fn test_predict_normalized_rejects_wrong_size() {
        let device = Default::default();
        let config = small_config();
        let model = SketchClassifier::<DefaultBackend>::new(&config, &device);
        let predictor = Predictor::from_model(model, &config, device);

        let result = predictor.predict_normalized(vec![0.0; 17]);
        assert!(result.is_err());
    }

    #[test]
    fn test_checkpoint_shape_mismatch_is_fatal() {
        let device = Default::default();

        // Save a ResNet18 checkpoint...
        let config18 = small_config();
        let model = SketchClassifier::<DefaultBackend>::new(&config18, &device);
        let path = std::env::temp_dir().join(format!(
            "pictionary_tl_mismatch_{}",
            std::process::id()
        ));
        model.save_checkpoint(&path).unwrap();

        // ...then try to load it as ResNet50.
        let mut config50 = ModelConfig::new(BackboneKind::ResNet50);
        config50.image_size = 64;
        let result =
            Predictor::<DefaultBackend>::from_checkpoint(&config50, &path, Default::default());

        assert!(matches!(result, Err(SketchError::Checkpoint(_))));

        let _ = std::fs::remove_file(path.with_extension("mpk"));
    }
}
