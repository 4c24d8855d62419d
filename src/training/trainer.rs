//! Fine-Tuning Loop
//!
//! Generic supervised training loop for the sketch classifier: Adam over
//! the trainable head against cross-entropy loss, a no-gradient validation
//! pass per epoch, and a running keep-best checkpoint keyed on validation
//! loss. Training always runs the full configured epoch count; the
//! checkpoint is a best-so-far save, not a stopping rule.

use std::path::Path;

use burn::{
    data::dataloader::batcher::Batcher,
    data::dataset::Dataset,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    tensor::{
        backend::{AutodiffBackend, Backend},
        ElementConversion,
    },
};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::{DataLoaders, SketchBatch, SketchBatcher, SketchDataset, SketchItem};
use crate::model::{SketchClassifier, TrainConfig};
use crate::utils::error::Result;
use crate::utils::metrics::Metrics;

/// Per-epoch loss histories returned by the training loop
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrainingHistory {
    /// Mean training loss per epoch
    pub train_losses: Vec<f64>,
    /// Mean validation loss per epoch
    pub val_losses: Vec<f64>,
    /// Top-1 validation accuracy per epoch
    pub val_accuracies: Vec<f64>,
    /// Best (lowest) validation loss seen
    pub best_val_loss: f64,
    /// Epoch index of the last checkpoint save
    pub best_epoch: Option<usize>,
}

/// Train the classifier head, checkpointing the full model state whenever
/// validation loss strictly improves on the best seen so far.
///
/// Returns the trained model together with its loss histories.
pub fn train_model<B: AutodiffBackend>(
    mut model: SketchClassifier<B>,
    loaders: &DataLoaders,
    config: &TrainConfig,
    device: &B::Device,
) -> Result<(SketchClassifier<B>, TrainingHistory)> {
    let batcher = SketchBatcher::new(loaders.train.image_size());
    let mut optimizer = AdamConfig::new().init();

    let mut epoch_rng = ChaCha8Rng::seed_from_u64(config.seed);
    let checkpoint_path = Path::new(&config.checkpoint_path);

    let mut history = TrainingHistory {
        best_val_loss: f64::INFINITY,
        ..Default::default()
    };

    info!(
        "Training for {} epochs ({} train / {} val samples, batch size {})",
        config.epochs,
        loaders.train.len(),
        loaders.val.len(),
        config.batch_size
    );

    for epoch in 0..config.epochs {
        // Training pass
        let mut indices: Vec<usize> = (0..loaders.train.len()).collect();
        indices.shuffle(&mut epoch_rng);

        let mut epoch_loss = 0.0f64;
        let mut num_batches = 0usize;

        for chunk in indices.chunks(config.batch_size) {
            let items: Vec<SketchItem> =
                chunk.iter().filter_map(|&i| loaders.train.get(i)).collect();
            if items.is_empty() {
                continue;
            }

            let batch: SketchBatch<B> = batcher.batch(items, device);

            let output = model.forward(batch.images);
            let loss = CrossEntropyLossConfig::new()
                .init(&output.device())
                .forward(output, batch.targets);

            let loss_value: f64 = loss.clone().into_scalar().elem();
            epoch_loss += loss_value;
            num_batches += 1;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optimizer.step(config.learning_rate, model, grads);
        }

        let train_loss = epoch_loss / num_batches.max(1) as f64;
        history.train_losses.push(train_loss);
        info!("Epoch {} training loss: {:.4}", epoch + 1, train_loss);

        // Validation pass (no gradients)
        let (val_loss, val_accuracy) = validate(&model, &loaders.val);
        history.val_losses.push(val_loss);
        history.val_accuracies.push(val_accuracy);
        info!(
            "Epoch {} validation loss: {:.4}, accuracy: {:.2}%",
            epoch + 1,
            val_loss,
            val_accuracy * 100.0
        );

        // Keep-best save: persist the full model state when validation loss
        // strictly improves. Never stops the loop early.
        if val_loss < history.best_val_loss {
            history.best_val_loss = val_loss;
            history.best_epoch = Some(epoch);
            info!("Saving new best model to {:?}", checkpoint_path);
            model.save_checkpoint(checkpoint_path)?;
        } else {
            debug!(
                "No improvement (best: {:.4} at epoch {:?})",
                history.best_val_loss, history.best_epoch
            );
        }
    }

    Ok((model, history))
}

/// Run a no-gradient pass over a dataset, returning (mean loss, accuracy).
/// Iterates per sample, matching the original validation loader.
fn validate<B: AutodiffBackend>(
    model: &SketchClassifier<B>,
    dataset: &SketchDataset,
) -> (f64, f64) {
    let device = <B::InnerBackend as Backend>::Device::default();
    let batcher = SketchBatcher::new(dataset.image_size());
    let model = model.valid();

    let mut total_loss = 0.0f64;
    let mut num_batches = 0usize;
    let mut correct = 0usize;
    let mut total = 0usize;

    for i in 0..dataset.len() {
        let Some(item) = dataset.get(i) else { continue };
        let batch: SketchBatch<B::InnerBackend> = batcher.batch(vec![item], &device);

        let output = model.forward(batch.images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());

        total_loss += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        let predictions = output.argmax(1).flatten::<1>(0, 1);
        let rows = batch.targets.dims()[0];
        let batch_correct: i64 = predictions
            .equal(batch.targets)
            .int()
            .sum()
            .into_scalar()
            .elem();
        correct += batch_correct as usize;
        total += rows;
    }

    let mean_loss = total_loss / num_batches.max(1) as f64;
    let accuracy = if total > 0 {
        correct as f64 / total as f64
    } else {
        0.0
    };
    (mean_loss, accuracy)
}

/// Evaluate a model over a dataset, collecting predictions into [`Metrics`].
pub fn evaluate<B: Backend>(
    model: &SketchClassifier<B>,
    dataset: &SketchDataset,
    device: &B::Device,
) -> Metrics {
    let batcher = SketchBatcher::new(dataset.image_size());

    let mut total_loss = 0.0f64;
    let mut num_batches = 0usize;
    let mut all_predictions: Vec<usize> = Vec::new();
    let mut all_targets: Vec<usize> = Vec::new();

    for i in 0..dataset.len() {
        let Some(item) = dataset.get(i) else { continue };
        let batch: SketchBatch<B> = batcher.batch(vec![item], device);

        let output = model.forward(batch.images);
        let loss = CrossEntropyLossConfig::new()
            .init(&output.device())
            .forward(output.clone(), batch.targets.clone());
        total_loss += loss.into_scalar().elem::<f64>();
        num_batches += 1;

        let predictions = output.argmax(1).flatten::<1>(0, 1);
        let pred_vec: Vec<i64> = predictions.into_data().to_vec().unwrap();
        let target_vec: Vec<i64> = batch.targets.into_data().to_vec().unwrap();

        all_predictions.extend(pred_vec.iter().map(|&p| p as usize));
        all_targets.extend(target_vec.iter().map(|&t| t as usize));
    }

    let mut metrics =
        Metrics::from_predictions(&all_predictions, &all_targets, model.num_classes());
    metrics.loss = Some(total_loss / num_batches.max(1) as f64);
    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::TrainingBackend;
    use crate::model::{BackboneKind, ModelConfig};
    use image::{ImageBuffer, Rgb};
    use std::path::PathBuf;

    fn write_tiny_dataset(name: &str) -> (PathBuf, Vec<(PathBuf, usize)>) {
        let root = std::env::temp_dir().join(format!(
            "pictionary_tl_train_{}_{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        let mut samples = Vec::new();
        for (i, label) in [0usize, 1, 0].into_iter().enumerate() {
            let shade = if label == 0 { 20 } else { 230 };
            let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
                ImageBuffer::from_pixel(48, 48, Rgb([shade, shade, shade]));
            let path = root.join(format!("img_{}.png", i));
            img.save(&path).unwrap();
            samples.push((path, label));
        }
        (root, samples)
    }

    #[test]
    fn test_training_runs_full_epoch_count_and_keeps_best() {
        let (root, samples) = write_tiny_dataset("loop");
        let size = 48;

        let loaders = DataLoaders {
            train: SketchDataset::new(samples[..2].to_vec(), size, true, 1),
            val: SketchDataset::new(samples[2..].to_vec(), size, true, 2),
            test: SketchDataset::new(vec![], size, false, 3),
            batch_size: 2,
            seed: 42,
        };

        let device = Default::default();
        let mut model_config = ModelConfig::new(BackboneKind::ResNet18);
        model_config.image_size = size;
        let model = SketchClassifier::<TrainingBackend>::new(&model_config, &device);

        let checkpoint = root.join("best_model");
        let config = TrainConfig {
            epochs: 2,
            batch_size: 2,
            learning_rate: 0.001,
            seed: 42,
            checkpoint_path: checkpoint.to_string_lossy().to_string(),
        };

        let (_model, history) = train_model(model, &loaders, &config, &device).unwrap();

        // The loop always runs the configured number of epochs.
        assert_eq!(history.train_losses.len(), 2);
        assert_eq!(history.val_losses.len(), 2);
        assert_eq!(history.val_accuracies.len(), 2);

        // The checkpointed loss is the minimum seen up to the save epoch.
        let best_epoch = history.best_epoch.unwrap();
        for (i, &loss) in history.val_losses.iter().enumerate() {
            if i < best_epoch {
                assert!(history.best_val_loss < loss);
            }
        }
        assert!(checkpoint.with_extension("mpk").exists());

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn test_evaluate_collects_metrics() {
        let (root, samples) = write_tiny_dataset("eval");
        let size = 48;

        let dataset = SketchDataset::new(samples, size, false, 7);
        let device = Default::default();
        let mut model_config = ModelConfig::new(BackboneKind::ResNet18);
        model_config.image_size = size;
        let model =
            SketchClassifier::<crate::backend::DefaultBackend>::new(&model_config, &device);

        let metrics = evaluate(&model, &dataset, &device);

        assert_eq!(metrics.total_samples, 3);
        assert!(metrics.loss.is_some());
        assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);

        std::fs::remove_dir_all(&root).unwrap();
    }
}
