use std::f64::consts::PI;

use super::{check_training_set, check_width, distinct_classes, Classifier};
use crate::error::ModelError;

#[derive(Debug, Clone)]
struct ClassStats {
    class: usize,
    log_prior: f64,
    means: Vec<f64>,
    variances: Vec<f64>,
}

/// Gaussian naive Bayes with per-class feature means and variances.
#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    /// Fraction of the largest feature variance added to every variance.
    pub var_smoothing: f64,
    width: usize,
    stats: Vec<ClassStats>,
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self {
            var_smoothing: 1e-9,
            width: 0,
            stats: Vec::new(),
        }
    }
}

impl Classifier for GaussianNaiveBayes {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), ModelError> {
        let width = check_training_set(x, y)?;
        self.width = width;
        let all: Vec<&Vec<f64>> = x.iter().collect();
        let (_, overall_var) = moments(&all, width);
        let epsilon = self.var_smoothing * overall_var.iter().copied().fold(0.0, f64::max);
        let n = x.len() as f64;
        self.stats = distinct_classes(y)
            .into_iter()
            .map(|class| {
                let rows: Vec<&Vec<f64>> = x
                    .iter()
                    .zip(y)
                    .filter(|(_, c)| **c == class)
                    .map(|(row, _)| row)
                    .collect();
                let (means, variances) = moments(&rows, width);
                ClassStats {
                    class,
                    log_prior: (rows.len() as f64 / n).ln(),
                    means,
                    variances: variances
                        .into_iter()
                        .map(|v| (v + epsilon).max(f64::MIN_POSITIVE))
                        .collect(),
                }
            })
            .collect();
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, ModelError> {
        if self.stats.is_empty() {
            return Err(ModelError::NotFitted);
        }
        check_width(x, self.width)?;
        Ok(x.iter().map(|row| self.most_likely(row)).collect())
    }
}

impl GaussianNaiveBayes {
    fn joint_log_likelihood(stats: &ClassStats, row: &[f64]) -> f64 {
        let mut total = stats.log_prior;
        for ((value, mean), var) in row.iter().zip(&stats.means).zip(&stats.variances) {
            total -= 0.5 * (2.0 * PI * var).ln();
            total -= (value - mean).powi(2) / (2.0 * var);
        }
        total
    }

    fn most_likely(&self, row: &[f64]) -> usize {
        let mut best = &self.stats[0];
        let mut best_score = Self::joint_log_likelihood(best, row);
        for stats in &self.stats[1..] {
            let score = Self::joint_log_likelihood(stats, row);
            if score > best_score {
                best = stats;
                best_score = score;
            }
        }
        best.class
    }
}

/// Per-feature mean and population variance.
fn moments(rows: &[&Vec<f64>], width: usize) -> (Vec<f64>, Vec<f64>) {
    let n = rows.len().max(1) as f64;
    let mut means = vec![0.0; width];
    for row in rows {
        for (mean, value) in means.iter_mut().zip(row.iter()) {
            *mean += value / n;
        }
    }
    let mut variances = vec![0.0; width];
    for row in rows {
        for ((var, value), mean) in variances.iter_mut().zip(row.iter()).zip(&means) {
            *var += (value - mean).powi(2) / n;
        }
    }
    (means, variances)
}
