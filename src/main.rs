//! Pictionary Sketch Classifier CLI
//!
//! Entry point for training, evaluating, and running the sketch
//! classification models: the transfer-learned ResNet pipeline and the
//! SVM / dominant-color baselines.

use std::path::{Path, PathBuf};

use anyhow::Result;
use burn::data::dataset::Dataset;
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use pictionary_tl::backend::{backend_name, default_device, DefaultBackend, TrainingBackend};
use pictionary_tl::baseline::{build_svm_dataset, ColorMap, LinearSvm, SvmTrainConfig};
use pictionary_tl::dataset::loader::SketchFolder;
use pictionary_tl::dataset::{get_dataloaders, NUM_CLASSES};
use pictionary_tl::inference::Predictor;
use pictionary_tl::model::{BackboneKind, ModelConfig, SketchClassifier, TrainConfig};
use pictionary_tl::training::{evaluate, train_model};
use pictionary_tl::utils::logging::{init_logging, LogConfig};

/// Pictionary sketch classification with transfer learning
///
/// Classifies hand-drawn sketches into ten object categories using a
/// frozen ResNet backbone with a trainable head, built on Burn.
#[derive(Parser, Debug)]
#[command(name = "pictionary_tl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, default_value = "false")]
    verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Train the classifier head on a sketch dataset
    Train {
        /// Path to the dataset directory (one subfolder per category)
        #[arg(short, long, default_value = "data/sketches")]
        data_dir: String,

        /// Backbone architecture (resnet18 or resnet50)
        #[arg(long, default_value = "resnet18")]
        backbone: String,

        /// Number of training epochs
        #[arg(short, long, default_value = "100")]
        epochs: usize,

        /// Batch size for training
        #[arg(short, long, default_value = "8")]
        batch_size: usize,

        /// Learning rate
        #[arg(short, long, default_value = "0.001")]
        learning_rate: f64,

        /// Random seed for splits, augmentation, and shuffling
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Directory for checkpoints and training artifacts
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Optional Burn record with pretrained backbone weights
        #[arg(long)]
        backbone_weights: Option<String>,
    },

    /// Evaluate a checkpoint on the held-out test split
    Evaluate {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "data/sketches")]
        data_dir: String,

        /// Checkpoint path (without extension)
        #[arg(short, long)]
        checkpoint: String,

        /// Backbone the checkpoint was trained with
        #[arg(long, default_value = "resnet18")]
        backbone: String,

        /// Seed used at training time (reproduces the same split)
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Classify a single sketch image with a trained checkpoint
    Predict {
        /// Checkpoint path (without extension)
        #[arg(short, long)]
        checkpoint: String,

        /// Backbone the checkpoint was trained with
        #[arg(long, default_value = "resnet18")]
        backbone: String,

        /// Image file to classify
        #[arg(short, long)]
        image: String,
    },

    /// Train the raw-pixel linear SVM baseline
    TrainSvm {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "data/sketches")]
        data_dir: String,

        /// Output path for the persisted model
        #[arg(short, long, default_value = "output/svm_model.json")]
        output: String,

        /// Square resolution for pixel features
        #[arg(long, default_value = "128")]
        image_size: u32,

        /// Random seed for the train/test split
        #[arg(long, default_value = "0")]
        seed: u64,
    },

    /// Build the dominant-color map from the training split
    BuildColormap {
        /// Path to the dataset directory
        #[arg(short, long, default_value = "data/sketches")]
        data_dir: String,

        /// Output path for the color map JSON
        #[arg(short, long, default_value = "output/colormap.json")]
        output: String,

        /// Seed reproducing the training split
        #[arg(long, default_value = "42")]
        seed: u64,
    },

    /// Classify a single sketch with the dominant-color heuristic
    PredictColor {
        /// Color map JSON produced by build-colormap
        #[arg(long, default_value = "output/colormap.json")]
        colormap: String,

        /// Image file to classify
        #[arg(short, long)]
        image: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    if let Err(e) = init_logging(&log_config) {
        eprintln!("Warning: {}", e);
    }

    match cli.command {
        Commands::Train {
            data_dir,
            backbone,
            epochs,
            batch_size,
            learning_rate,
            seed,
            output_dir,
            backbone_weights,
        } => run_train(
            &data_dir,
            &backbone,
            epochs,
            batch_size,
            learning_rate,
            seed,
            &output_dir,
            backbone_weights.as_deref(),
        ),
        Commands::Evaluate {
            data_dir,
            checkpoint,
            backbone,
            seed,
        } => run_evaluate(&data_dir, &checkpoint, &backbone, seed),
        Commands::Predict {
            checkpoint,
            backbone,
            image,
        } => run_predict(&checkpoint, &backbone, &image),
        Commands::TrainSvm {
            data_dir,
            output,
            image_size,
            seed,
        } => run_train_svm(&data_dir, &output, image_size, seed),
        Commands::BuildColormap {
            data_dir,
            output,
            seed,
        } => run_build_colormap(&data_dir, &output, seed),
        Commands::PredictColor { colormap, image } => run_predict_color(&colormap, &image),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_train(
    data_dir: &str,
    backbone: &str,
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    seed: u64,
    output_dir: &str,
    backbone_weights: Option<&str>,
) -> Result<()> {
    println!("{}", "Initializing Training...".green().bold());
    println!("  Backend: {}", backend_name());

    let backbone: BackboneKind = backbone.parse()?;
    let device = default_device();

    println!("{}", "Loading Dataset...".cyan());
    let loaders = get_dataloaders(data_dir, batch_size, seed)?;
    println!(
        "  Samples: {} train / {} val / {} test",
        loaders.train.len(),
        loaders.val.len(),
        loaders.test.len()
    );

    let model_config = ModelConfig::new(backbone);
    let mut model = SketchClassifier::<TrainingBackend>::new(&model_config, &device);
    match backbone_weights {
        Some(path) => {
            model = model.with_backbone_record(Path::new(path), &device)?;
        }
        None => warn!("No backbone weights supplied; backbone starts from random init"),
    }

    let output = PathBuf::from(output_dir);
    std::fs::create_dir_all(&output)?;

    let checkpoint_path = output.join(format!("{}_best", backbone));
    let train_config = TrainConfig {
        epochs,
        batch_size,
        learning_rate,
        seed,
        checkpoint_path: checkpoint_path.to_string_lossy().to_string(),
    };

    println!();
    println!("{}", "Training Configuration:".cyan().bold());
    println!("  Backbone:      {}", backbone);
    println!("  Epochs:        {}", epochs);
    println!("  Batch size:    {}", batch_size);
    println!("  Learning rate: {}", learning_rate);
    println!("  Checkpoint:    {:?}", checkpoint_path);
    println!();

    println!("{}", "Starting Training...".green().bold());
    let (model, history) = train_model(model, &loaders, &train_config, &device)?;

    // Persist the final state alongside the best checkpoint, plus the
    // config and history needed to reload and inspect the run.
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let final_path = output.join(format!("{}_{}", backbone, timestamp));
    model.save_checkpoint(&final_path)?;
    model_config.save(&output.join(format!("{}_config.json", backbone)))?;
    std::fs::write(
        output.join(format!("{}_history.json", backbone)),
        serde_json::to_string_pretty(&history)?,
    )?;

    println!();
    println!("{}", "Training Complete!".green().bold());
    if let Some(best_epoch) = history.best_epoch {
        println!(
            "  Best validation loss: {:.4} (epoch {})",
            history.best_val_loss,
            best_epoch + 1
        );
    }
    println!("  Best checkpoint: {:?}", checkpoint_path);
    println!("  Final model:     {:?}", final_path);

    Ok(())
}

fn run_evaluate(data_dir: &str, checkpoint: &str, backbone: &str, seed: u64) -> Result<()> {
    println!("{}", "Evaluating...".green().bold());

    let backbone: BackboneKind = backbone.parse()?;
    let device = default_device();
    let model_config = ModelConfig::new(backbone);

    let model = SketchClassifier::<DefaultBackend>::new(&model_config, &device)
        .load_checkpoint(Path::new(checkpoint), &device)?;

    // Batch size is irrelevant for the per-sample test pass.
    let loaders = get_dataloaders(data_dir, 1, seed)?;
    info!("Evaluating on {} test samples", loaders.test.len());

    let metrics = evaluate(&model, &loaders.test, &device);

    println!();
    println!("{}", "Test Results:".cyan().bold());
    println!(
        "  Accuracy: {:.2}% ({}/{})",
        metrics.accuracy * 100.0,
        metrics.correct_predictions,
        metrics.total_samples
    );
    if let Some(loss) = metrics.loss {
        println!("  Loss:     {:.4}", loss);
    }
    println!();
    println!("{}", "Confusion Matrix:".cyan().bold());
    println!("{}", metrics.confusion_matrix);

    Ok(())
}

fn run_predict(checkpoint: &str, backbone: &str, image: &str) -> Result<()> {
    let backbone: BackboneKind = backbone.parse()?;
    let model_config = ModelConfig::new(backbone);

    let predictor = Predictor::<DefaultBackend>::from_checkpoint(
        &model_config,
        Path::new(checkpoint),
        default_device(),
    )?;

    let prediction = predictor.predict_path(Path::new(image))?;
    println!("{}", prediction);

    Ok(())
}

fn run_train_svm(data_dir: &str, output: &str, image_size: u32, seed: u64) -> Result<()> {
    println!("{}", "Training SVM baseline...".green().bold());

    let dataset = build_svm_dataset(data_dir, image_size, seed)?;
    let svm = LinearSvm::fit(
        &dataset.x_train,
        &dataset.y_train,
        NUM_CLASSES,
        &SvmTrainConfig {
            seed,
            ..Default::default()
        },
    )?;

    let train_acc = svm.score(&dataset.x_train, &dataset.y_train);
    let test_acc = svm.score(&dataset.x_test, &dataset.y_test);
    println!("  Train accuracy: {:.2}%", train_acc * 100.0);
    println!("  Test accuracy:  {:.2}%", test_acc * 100.0);

    svm.save(Path::new(output))?;
    println!("  Saved to: {}", output);

    Ok(())
}

fn run_build_colormap(data_dir: &str, output: &str, seed: u64) -> Result<()> {
    println!("{}", "Building dominant-color map...".green().bold());

    let folder = SketchFolder::new(data_dir)?;
    let (train, _, _) = folder.split(seed);
    let map = ColorMap::build(&train)?;

    map.save(Path::new(output))?;
    println!("  {} color entries saved to: {}", map.len(), output);

    Ok(())
}

fn run_predict_color(colormap: &str, image: &str) -> Result<()> {
    let map = ColorMap::load(Path::new(colormap))?;
    let img = image::open(Path::new(image))?;

    let label = map.classify(&img, &mut rand::thread_rng())?;
    println!(
        "Prediction: {} (class {})",
        pictionary_tl::dataset::class_name(label).unwrap_or("Unknown"),
        label
    );

    Ok(())
}
