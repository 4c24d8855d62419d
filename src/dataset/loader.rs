//! Sketch Dataset Loader
//!
//! Walks a root directory whose subdirectories are class labels, collects
//! image paths, and produces the train/val/test splits consumed by the
//! Burn dataset wrappers.

use std::path::{Path, PathBuf};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::burn_dataset::SketchDataset;
use super::{class_index_checked, IMAGE_SIZE};
use crate::utils::error::{Result, SketchError};

/// Image file extensions considered part of the dataset
const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// A single image sample with its folder-derived label
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SketchSample {
    /// Path to the image file
    pub path: PathBuf,
    /// Label id (0-9)
    pub label: usize,
    /// Category name (e.g., "Ladybug")
    pub class_name: String,
}

/// Sketch dataset rooted at an image-folder tree
#[derive(Debug)]
pub struct SketchFolder {
    /// Root directory of the dataset
    pub root_dir: PathBuf,
    /// All samples found under the root
    pub samples: Vec<SketchSample>,
}

impl SketchFolder {
    /// Collect all image samples under a root directory.
    ///
    /// The directory should be structured as:
    /// ```text
    /// root_dir/
    /// ├── Airplane/
    /// │   ├── sketch1.png
    /// │   └── sketch2.png
    /// ├── Bicycle/
    /// │   └── ...
    /// └── ...
    /// ```
    ///
    /// A parent folder name outside the fixed label map is a configuration
    /// error and fails immediately.
    pub fn new<P: AsRef<Path>>(root_dir: P) -> Result<Self> {
        let root_dir = root_dir.as_ref().to_path_buf();
        info!("Loading sketch dataset from: {:?}", root_dir);

        if !root_dir.exists() {
            return Err(SketchError::Dataset(format!(
                "Dataset directory does not exist: {:?}",
                root_dir
            )));
        }

        let mut samples = Vec::new();
        for entry in WalkDir::new(&root_dir)
            .min_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path().to_path_buf();

            let Some(ext) = path.extension() else {
                continue;
            };
            let ext = ext.to_string_lossy().to_lowercase();
            if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                continue;
            }

            // The label is the parent folder's name.
            let folder = path
                .parent()
                .and_then(|p| p.file_name())
                .map(|n| n.to_string_lossy().to_string())
                .ok_or_else(|| {
                    SketchError::Dataset(format!("Image has no parent folder: {:?}", path))
                })?;

            let label = class_index_checked(&folder, &path)?;
            samples.push(SketchSample {
                path,
                label,
                class_name: folder,
            });
        }

        info!("Loaded {} samples", samples.len());
        Ok(Self { root_dir, samples })
    }

    /// Number of samples in the dataset
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the dataset is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples-per-class counts, indexed by label id
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; super::NUM_CLASSES];
        for sample in &self.samples {
            counts[sample.label] += 1;
        }
        counts
    }

    /// Split into (train, val, test) via two sequential random splits:
    /// 10% test first, then 10% of the remainder as validation.
    pub fn split(&self, seed: u64) -> (Vec<SketchSample>, Vec<SketchSample>, Vec<SketchSample>) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut remaining: Vec<SketchSample> = self.samples.clone();
        remaining.shuffle(&mut rng);

        let test_count = (remaining.len() as f64 * 0.1).round() as usize;
        let test: Vec<SketchSample> = remaining.split_off(remaining.len() - test_count);

        remaining.shuffle(&mut rng);
        let val_count = (remaining.len() as f64 * 0.1).round() as usize;
        let val: Vec<SketchSample> = remaining.split_off(remaining.len() - val_count);

        debug!(
            "Split sizes: train = {}, val = {}, test = {}",
            remaining.len(),
            val.len(),
            test.len()
        );

        (remaining, val, test)
    }
}

/// Train/val/test loaders sharing one image-folder source.
///
/// Train and validation datasets produce 4 augmented variants per image;
/// the test dataset produces only the identity variant.
pub struct DataLoaders {
    pub train: SketchDataset,
    pub val: SketchDataset,
    pub test: SketchDataset,
    /// Batch size for the training loader (val/test iterate per sample)
    pub batch_size: usize,
    /// Seed driving splits, augmentation, and epoch shuffling
    pub seed: u64,
}

/// Build the train/val/test loaders for an image-folder tree.
pub fn get_dataloaders<P: AsRef<Path>>(
    root_dir: P,
    batch_size: usize,
    seed: u64,
) -> Result<DataLoaders> {
    let folder = SketchFolder::new(root_dir)?;
    if folder.is_empty() {
        return Err(SketchError::Dataset(format!(
            "No images found under {:?}",
            folder.root_dir
        )));
    }

    let (train, val, test) = folder.split(seed);

    let to_pairs = |samples: &[SketchSample]| -> Vec<(PathBuf, usize)> {
        samples.iter().map(|s| (s.path.clone(), s.label)).collect()
    };

    Ok(DataLoaders {
        train: SketchDataset::new(to_pairs(&train), IMAGE_SIZE, true, seed),
        val: SketchDataset::new(to_pairs(&val), IMAGE_SIZE, true, seed.wrapping_add(1)),
        test: SketchDataset::new(to_pairs(&test), IMAGE_SIZE, false, seed.wrapping_add(2)),
        batch_size,
        seed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    /// Build a tiny image-folder tree under the system temp dir
    fn write_test_tree(name: &str, classes: &[&str], images_per_class: usize) -> PathBuf {
        let root = std::env::temp_dir().join(format!("pictionary_tl_{}_{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        for class in classes {
            let dir = root.join(class);
            std::fs::create_dir_all(&dir).unwrap();
            for i in 0..images_per_class {
                let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_pixel(16, 16, Rgb([255, 255, 255]));
                img.save(dir.join(format!("sketch_{}.png", i))).unwrap();
            }
        }
        root
    }

    #[test]
    fn test_folder_walk_and_labels() {
        let root = write_test_tree("walk", &["Airplane", "Whale"], 3);

        let folder = SketchFolder::new(&root).unwrap();
        assert_eq!(folder.len(), 6);

        let counts = folder.class_counts();
        assert_eq!(counts[0], 3); // Airplane
        assert_eq!(counts[9], 3); // Whale

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_unknown_folder_fails() {
        let root = write_test_tree("unknown", &["Airplane", "Dinosaur"], 1);

        let result = SketchFolder::new(&root);
        assert!(matches!(result, Err(SketchError::UnknownClass { .. })));

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_split_fractions() {
        let root = write_test_tree("split", &["Airplane", "Car"], 50);

        let folder = SketchFolder::new(&root).unwrap();
        let (train, val, test) = folder.split(42);

        assert_eq!(test.len(), 10); // 10% of 100
        assert_eq!(val.len(), 9); // 10% of 90
        assert_eq!(train.len(), 81);
        assert_eq!(train.len() + val.len() + test.len(), 100);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_split_is_deterministic() {
        let root = write_test_tree("det", &["Airplane", "Car"], 10);

        let folder = SketchFolder::new(&root).unwrap();
        let (train_a, _, _) = folder.split(7);
        let (train_b, _, _) = folder.split(7);

        let paths_a: Vec<_> = train_a.iter().map(|s| s.path.clone()).collect();
        let paths_b: Vec<_> = train_b.iter().map(|s| s.path.clone()).collect();
        assert_eq!(paths_a, paths_b);

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_get_dataloaders_labels_in_range() {
        use burn::data::dataset::Dataset;

        let classes: Vec<&str> = crate::dataset::CLASS_NAMES.to_vec();
        let root = write_test_tree("loaders", &classes, 1);

        let loaders = get_dataloaders(&root, 1, 42).unwrap();
        let total = loaders.train.len() + loaders.val.len() + loaders.test.len();
        assert_eq!(total, 10);

        for i in 0..loaders.train.len() {
            let item = loaders.train.get(i).unwrap();
            assert!(item.label < 10);
        }

        std::fs::remove_dir_all(&root).unwrap();
    }
}
