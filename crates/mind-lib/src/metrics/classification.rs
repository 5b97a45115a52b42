use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::labels::LabelVocabulary;

/// Fraction of positions where prediction and truth agree. Zero for empty input.
pub fn accuracy<T: PartialEq>(y_true: &[T], y_pred: &[T]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return 0.0;
    }
    let hits = y_true
        .iter()
        .zip(y_pred)
        .filter(|(truth, pred)| truth == pred)
        .count();
    hits as f64 / n as f64
}

/// Unweighted mean of per-label precision over every label seen in either sequence.
/// A label that was never predicted scores 0.
pub fn macro_precision<T: Ord>(y_true: &[T], y_pred: &[T]) -> f64 {
    let labels: BTreeSet<&T> = y_true.iter().chain(y_pred.iter()).collect();
    if labels.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for label in &labels {
        let predicted = y_pred.iter().filter(|p| p == label).count();
        if predicted == 0 {
            continue;
        }
        let correct = y_true
            .iter()
            .zip(y_pred)
            .filter(|(truth, pred)| truth == label && pred == label)
            .count();
        total += correct as f64 / predicted as f64;
    }
    total / labels.len() as f64
}

/// Counts of (true label, predicted label) pairs. Rows are true labels, columns predictions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn from_labels(vocabulary: &LabelVocabulary, y_true: &[String], y_pred: &[String]) -> Self {
        let n = vocabulary.len();
        let mut counts = vec![vec![0usize; n]; n];
        for (truth, pred) in y_true.iter().zip(y_pred) {
            match (vocabulary.class_of(truth), vocabulary.class_of(pred)) {
                (Some(row), Some(col)) => counts[row][col] += 1,
                _ => log::warn!(
                    "confusion matrix ignores pair ({}, {}) outside the label vocabulary",
                    truth,
                    pred
                ),
            }
        }
        Self {
            labels: vocabulary.labels.clone(),
            counts,
        }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().flatten().sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().flatten().copied().max().unwrap_or(0)
    }

    pub fn diagonal(&self) -> usize {
        (0..self.counts.len()).map(|i| self.counts[i][i]).sum()
    }
}
