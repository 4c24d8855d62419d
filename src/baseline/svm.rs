//! Linear SVM Baseline
//!
//! Classifies sketches from raw pixels: images are resized to a fixed
//! square resolution, flattened into pixel-intensity vectors, standardized
//! with a scaler fit on the training split only, and fed to a one-vs-rest
//! linear SVM trained by subgradient descent on the hinge objective.
//! No augmentation is applied.

use std::path::Path;

use image::ImageReader;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::loader::SketchFolder;
use crate::utils::error::{Result, SketchError};

/// Default square resolution for the SVM pixel features
pub const SVM_IMAGE_SIZE: u32 = 128;

/// Flattened pixel dataset with train/test splits, standardized on train
#[derive(Debug)]
pub struct SvmDataset {
    pub x_train: Vec<Vec<f32>>,
    pub x_test: Vec<Vec<f32>>,
    pub y_train: Vec<usize>,
    pub y_test: Vec<usize>,
    pub scaler: StandardScaler,
}

/// Build the SVM dataset from an image-folder tree: resize, flatten,
/// split 80/20, and standardize (scaler fit on train only).
pub fn build_dataset<P: AsRef<Path>>(
    root_dir: P,
    image_size: u32,
    seed: u64,
) -> Result<SvmDataset> {
    let folder = SketchFolder::new(root_dir)?;
    if folder.is_empty() {
        return Err(SketchError::Dataset(
            "No images found for SVM dataset".to_string(),
        ));
    }

    let mut vectors: Vec<(Vec<f32>, usize)> = Vec::with_capacity(folder.len());
    for sample in &folder.samples {
        let img = ImageReader::open(&sample.path)
            .map_err(|e| SketchError::ImageLoad(sample.path.clone(), e.to_string()))?
            .decode()
            .map_err(|e| SketchError::ImageLoad(sample.path.clone(), e.to_string()))?
            .resize_exact(image_size, image_size, image::imageops::FilterType::Triangle)
            .to_rgb8();

        let pixels: Vec<f32> = img.pixels().flat_map(|p| p.0).map(|v| v as f32).collect();
        vectors.push((pixels, sample.label));
    }

    // 80/20 train/test split
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    vectors.shuffle(&mut rng);
    let test_count = (vectors.len() as f64 * 0.2).round() as usize;
    let test_vectors = vectors.split_off(vectors.len() - test_count);

    let (mut x_train, y_train): (Vec<Vec<f32>>, Vec<usize>) = vectors.into_iter().unzip();
    let (mut x_test, y_test): (Vec<Vec<f32>>, Vec<usize>) = test_vectors.into_iter().unzip();

    let scaler = StandardScaler::fit(&x_train);
    for x in x_train.iter_mut().chain(x_test.iter_mut()) {
        scaler.transform(x);
    }

    info!(
        "SVM dataset: {} train / {} test vectors of {} features",
        x_train.len(),
        x_test.len(),
        x_train.first().map(|x| x.len()).unwrap_or(0)
    );

    Ok(SvmDataset {
        x_train,
        x_test,
        y_train,
        y_test,
        scaler,
    })
}

/// Per-feature zero-mean/unit-variance scaler, fit on the training split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl StandardScaler {
    /// Fit mean and standard deviation per feature
    pub fn fit(x: &[Vec<f32>]) -> Self {
        let n = x.len().max(1) as f32;
        let dim = x.first().map(|v| v.len()).unwrap_or(0);

        let mut mean = vec![0.0f32; dim];
        for row in x {
            for (m, &v) in mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in mean.iter_mut() {
            *m /= n;
        }

        let mut std = vec![0.0f32; dim];
        for row in x {
            for ((s, &v), &m) in std.iter_mut().zip(row.iter()).zip(mean.iter()) {
                *s += (v - m) * (v - m);
            }
        }
        for s in std.iter_mut() {
            *s = (*s / n).sqrt();
            // Constant features stay unscaled
            if *s < 1e-8 {
                *s = 1.0;
            }
        }

        Self { mean, std }
    }

    /// Standardize one feature vector in place
    pub fn transform(&self, x: &mut [f32]) {
        for ((v, &m), &s) in x.iter_mut().zip(self.mean.iter()).zip(self.std.iter()) {
            *v = (*v - m) / s;
        }
    }
}

/// Training settings for the hinge-loss subgradient solver
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmTrainConfig {
    /// Passes over the training set
    pub epochs: usize,
    /// Regularization strength
    pub lambda: f32,
    /// Seed for the sampling order
    pub seed: u64,
}

impl Default for SvmTrainConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            lambda: 1e-4,
            seed: 0,
        }
    }
}

/// One-vs-rest linear SVM over standardized pixel vectors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearSvm {
    /// One weight vector per class
    pub weights: Vec<Vec<f32>>,
    /// One bias per class
    pub biases: Vec<f32>,
    pub num_classes: usize,
}

impl LinearSvm {
    /// Train one binary hinge-loss classifier per class (one-vs-rest)
    /// with Pegasos-style subgradient descent.
    pub fn fit(
        x: &[Vec<f32>],
        y: &[usize],
        num_classes: usize,
        config: &SvmTrainConfig,
    ) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(SketchError::Dataset(
                "SVM training data is empty or misaligned".to_string(),
            ));
        }
        let dim = x[0].len();
        let n = x.len();

        let mut weights = vec![vec![0.0f32; dim]; num_classes];
        let mut biases = vec![0.0f32; num_classes];
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);

        for class in 0..num_classes {
            let w = &mut weights[class];
            let b = &mut biases[class];
            let mut t = 0usize;

            for _ in 0..config.epochs {
                for _ in 0..n {
                    t += 1;
                    let i = rng.gen_range(0..n);
                    let target = if y[i] == class { 1.0f32 } else { -1.0f32 };

                    let eta = 1.0 / (config.lambda * t as f32);
                    let margin = target * (dot(w, &x[i]) + *b);

                    // The bias is treated as a weight on a constant-1
                    // feature, so it shrinks with the rest.
                    let shrink = 1.0 - eta * config.lambda;
                    for wj in w.iter_mut() {
                        *wj *= shrink;
                    }
                    *b *= shrink;
                    if margin < 1.0 {
                        for (wj, &xj) in w.iter_mut().zip(x[i].iter()) {
                            *wj += eta * target * xj;
                        }
                        *b += eta * target;
                    }
                }
            }
        }

        Ok(Self {
            weights,
            biases,
            num_classes,
        })
    }

    /// Per-class decision values for one feature vector
    pub fn decision_function(&self, x: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .zip(self.biases.iter())
            .map(|(w, &b)| dot(w, x) + b)
            .collect()
    }

    /// Predicted class id (arg-max decision value)
    pub fn predict(&self, x: &[f32]) -> usize {
        self.decision_function(x)
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Accuracy over a labeled set
    pub fn score(&self, x: &[Vec<f32>], y: &[usize]) -> f64 {
        if x.is_empty() {
            return 0.0;
        }
        let correct = x
            .iter()
            .zip(y.iter())
            .filter(|(xi, &yi)| self.predict(xi) == yi)
            .count();
        correct as f64 / x.len() as f64
    }

    /// Persist the model (weights and biases) as JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a persisted model
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
