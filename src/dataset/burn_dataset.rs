//! Burn Dataset Integration
//!
//! Implements Burn's `Dataset` trait over the sketch image folders and a
//! `Batcher` that flattens per-sample augmentation groups into one training
//! batch, replicating labels per variant.

use std::path::PathBuf;

use burn::data::dataloader::batcher::Batcher;
use burn::data::dataset::Dataset;
use burn::prelude::*;
use image::ImageReader;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::augmentation::Augmenter;
use crate::utils::error::{Result, SketchError};

/// One sample's augmentation group: 4 variants for train/val, 1 for test.
/// Each variant is a normalized CHW float buffer sharing the same label.
#[derive(Clone, Debug)]
pub struct SketchItem {
    /// Normalized image variants, each `3 * size * size` floats
    pub variants: Vec<Vec<f32>>,
    /// Label id (0-9), shared by all variants
    pub label: usize,
    /// Source path, for logging
    pub path: String,
}

impl SketchItem {
    /// Load an image and build its variant group.
    pub fn from_path(
        path: &PathBuf,
        label: usize,
        augmenter: &Augmenter,
        rng: Option<&mut ChaCha8Rng>,
    ) -> Result<Self> {
        let img = ImageReader::open(path)
            .map_err(|e| SketchError::ImageLoad(path.clone(), e.to_string()))?
            .decode()
            .map_err(|e| SketchError::ImageLoad(path.clone(), e.to_string()))?;

        let variants = match rng {
            Some(rng) => augmenter.variants(&img, rng),
            None => vec![augmenter.identity_variant(&img)],
        };

        Ok(Self {
            variants,
            label,
            path: path.to_string_lossy().to_string(),
        })
    }
}

/// Sketch dataset implementing Burn's `Dataset` trait.
///
/// Images are loaded lazily; train/val datasets produce 4 augmented
/// variants per access, the test dataset only the identity variant.
#[derive(Debug, Clone)]
pub struct SketchDataset {
    /// List of (image_path, label) pairs
    samples: Vec<(PathBuf, usize)>,
    /// Target image size
    image_size: usize,
    /// Whether to produce the augmented 4-variant group
    augment: bool,
    /// Base seed for per-item augmentation randomness
    seed: u64,
}

impl SketchDataset {
    /// Create a new dataset from a list of samples
    pub fn new(samples: Vec<(PathBuf, usize)>, image_size: usize, augment: bool, seed: u64) -> Self {
        Self {
            samples,
            image_size,
            augment,
            seed,
        }
    }

    /// Target image size (square)
    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Variants produced per sample: 4 when augmenting, 1 otherwise
    pub fn variants_per_sample(&self) -> usize {
        if self.augment {
            4
        } else {
            1
        }
    }

    /// Samples-per-class counts
    pub fn class_distribution(&self, num_classes: usize) -> Vec<usize> {
        let mut counts = vec![0usize; num_classes];
        for (_, label) in &self.samples {
            if *label < num_classes {
                counts[*label] += 1;
            }
        }
        counts
    }
}

impl Dataset<SketchItem> for SketchDataset {
    fn get(&self, index: usize) -> Option<SketchItem> {
        let (path, label) = self.samples.get(index)?;
        let augmenter = Augmenter::new(self.image_size as u32);

        // Augmentation randomness derives from the dataset seed and the item
        // index, keeping runs reproducible without shared mutable state.
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ (index as u64).wrapping_mul(0x9E3779B9));
        let rng = self.augment.then_some(&mut rng);

        SketchItem::from_path(path, *label, &augmenter, rng).ok()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

/// A flat batch of sketch variants ready for the model
#[derive(Clone, Debug)]
pub struct SketchBatch<B: Backend> {
    /// Images with shape `[total_variants, 3, height, width]`
    pub images: Tensor<B, 4>,
    /// Labels with shape `[total_variants]`, repeated once per variant
    pub targets: Tensor<B, 1, Int>,
}

/// Batcher flattening variant groups into a single batch.
///
/// Concatenation is order-preserving: items in input order, variants in
/// group order within each item. Labels repeat once per variant so rows
/// and targets stay aligned.
#[derive(Clone, Debug)]
pub struct SketchBatcher {
    image_size: usize,
}

impl SketchBatcher {
    /// Create a batcher for the given image size
    pub fn new(image_size: usize) -> Self {
        Self { image_size }
    }
}

impl<B: Backend> Batcher<B, SketchItem, SketchBatch<B>> for SketchBatcher {
    fn batch(&self, items: Vec<SketchItem>, device: &B::Device) -> SketchBatch<B> {
        let height = self.image_size;
        let width = self.image_size;

        let total_variants: usize = items.iter().map(|item| item.variants.len()).sum();

        let mut images_data: Vec<f32> = Vec::with_capacity(total_variants * 3 * height * width);
        let mut targets_data: Vec<i64> = Vec::with_capacity(total_variants);

        for item in &items {
            for variant in &item.variants {
                images_data.extend_from_slice(variant);
                targets_data.push(item.label as i64);
            }
        }

        let images = Tensor::<B, 4>::from_floats(
            TensorData::new(images_data, [total_variants, 3, height, width]),
            device,
        );
        let targets =
            Tensor::<B, 1, Int>::from_data(TensorData::new(targets_data, [total_variants]), device);

        SketchBatch { images, targets }
    }
}
