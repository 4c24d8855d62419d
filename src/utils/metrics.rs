//! Metrics Module for Model Evaluation
//!
//! Accuracy and confusion-matrix helpers used by the validation pass and
//! the evaluate command.

use serde::{Deserialize, Serialize};

/// Evaluation metrics computed from predictions and ground truth
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metrics {
    /// Total number of samples evaluated
    pub total_samples: usize,

    /// Number of correct predictions
    pub correct_predictions: usize,

    /// Overall top-1 accuracy (correct / total)
    pub accuracy: f64,

    /// Mean loss over all batches, when available
    pub loss: Option<f64>,

    /// Confusion matrix
    pub confusion_matrix: ConfusionMatrix,
}

impl Metrics {
    /// Create metrics from predictions and ground truth labels
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        assert_eq!(
            predictions.len(),
            ground_truth.len(),
            "Predictions and ground truth must have same length"
        );

        let total_samples = predictions.len();
        let confusion_matrix =
            ConfusionMatrix::from_predictions(predictions, ground_truth, num_classes);

        let correct_predictions = predictions
            .iter()
            .zip(ground_truth.iter())
            .filter(|(p, g)| p == g)
            .count();

        let accuracy = if total_samples > 0 {
            correct_predictions as f64 / total_samples as f64
        } else {
            0.0
        };

        Self {
            total_samples,
            correct_predictions,
            accuracy,
            loss: None,
            confusion_matrix,
        }
    }
}

/// Confusion matrix: rows are ground-truth classes, columns are predictions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub num_classes: usize,
    /// Flattened row-major counts, `counts[truth * num_classes + pred]`
    pub counts: Vec<usize>,
}

impl ConfusionMatrix {
    /// Build a confusion matrix from prediction/ground-truth pairs
    pub fn from_predictions(
        predictions: &[usize],
        ground_truth: &[usize],
        num_classes: usize,
    ) -> Self {
        let mut counts = vec![0usize; num_classes * num_classes];
        for (&pred, &truth) in predictions.iter().zip(ground_truth.iter()) {
            if pred < num_classes && truth < num_classes {
                counts[truth * num_classes + pred] += 1;
            }
        }
        Self {
            num_classes,
            counts,
        }
    }

    /// Count for a (truth, prediction) pair
    pub fn get(&self, truth: usize, pred: usize) -> usize {
        self.counts[truth * self.num_classes + pred]
    }

    /// Per-class recall (diagonal / row sum), None for classes without samples
    pub fn per_class_accuracy(&self) -> Vec<Option<f64>> {
        (0..self.num_classes)
            .map(|c| {
                let row_sum: usize = (0..self.num_classes).map(|p| self.get(c, p)).sum();
                if row_sum > 0 {
                    Some(self.get(c, c) as f64 / row_sum as f64)
                } else {
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "     ")?;
        for p in 0..self.num_classes {
            write!(f, "{:>5}", p)?;
        }
        writeln!(f)?;
        for t in 0..self.num_classes {
            write!(f, "{:>4} ", t)?;
            for p in 0..self.num_classes {
                write!(f, "{:>5}", self.get(t, p))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_accuracy() {
        let predictions = vec![0, 1, 2, 2];
        let truth = vec![0, 1, 1, 2];

        let metrics = Metrics::from_predictions(&predictions, &truth, 3);

        assert_eq!(metrics.total_samples, 4);
        assert_eq!(metrics.correct_predictions, 3);
        assert!((metrics.accuracy - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_confusion_matrix_counts() {
        let predictions = vec![0, 1, 1, 2];
        let truth = vec![0, 1, 2, 2];

        let cm = ConfusionMatrix::from_predictions(&predictions, &truth, 3);

        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(1, 1), 1);
        assert_eq!(cm.get(2, 1), 1);
        assert_eq!(cm.get(2, 2), 1);
        assert_eq!(cm.get(0, 1), 0);
    }

    #[test]
    fn test_per_class_accuracy_empty_class() {
        let predictions = vec![0, 0];
        let truth = vec![0, 0];

        let cm = ConfusionMatrix::from_predictions(&predictions, &truth, 2);
        let per_class = cm.per_class_accuracy();

        assert_eq!(per_class[0], Some(1.0));
        assert_eq!(per_class[1], None);
    }
}
