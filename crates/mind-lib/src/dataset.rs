use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::DataError;
use crate::signal::AveragedTrial;

/// Averaged trial features paired positionally with their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub channels: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainTestSplit {
    pub x_train: Vec<Vec<f64>>,
    pub x_test: Vec<Vec<f64>>,
    pub y_train: Vec<String>,
    pub y_test: Vec<String>,
    /// Dataset rows that went to the test partition, in test order.
    pub test_rows: Vec<usize>,
}

/// Join averaged trials with labels. Row `i` of the features pairs with `labels[i]`.
pub fn create_dataset(
    averaged: &[AveragedTrial],
    labels: &[String],
    window: (usize, usize),
) -> Result<Dataset, DataError> {
    if averaged.len() != labels.len() {
        return Err(DataError::LabelMismatch {
            trials: averaged.len(),
            labels: labels.len(),
        });
    }
    if let Some(empty) = averaged.iter().find(|trial| trial.retained == 0) {
        return Err(DataError::EmptyWindow {
            trial: empty.index,
            start: window.0,
            end: window.1,
        });
    }
    Ok(Dataset {
        channels: averaged
            .first()
            .map(|trial| trial.channels.clone())
            .unwrap_or_default(),
        features: averaged.iter().map(|trial| trial.means.clone()).collect(),
        labels: labels.to_vec(),
    })
}

/// Shuffle rows with a seeded RNG and move `ceil(n * test_ratio)` of them to the test side.
pub fn train_test_split(
    dataset: &Dataset,
    test_ratio: f64,
    seed: u64,
) -> Result<TrainTestSplit, DataError> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(DataError::InvalidTestRatio(test_ratio));
    }
    let rows = dataset.len();
    let n_test = (rows as f64 * test_ratio).ceil() as usize;
    if n_test == 0 || n_test >= rows {
        return Err(DataError::SplitTooSmall {
            rows,
            ratio: test_ratio,
        });
    }
    let mut order: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let (test_rows, train_rows) = order.split_at(n_test);
    let pick_x = |idx: &[usize]| -> Vec<Vec<f64>> {
        idx.iter().map(|i| dataset.features[*i].clone()).collect()
    };
    let pick_y =
        |idx: &[usize]| -> Vec<String> { idx.iter().map(|i| dataset.labels[*i].clone()).collect() };
    Ok(TrainTestSplit {
        x_train: pick_x(train_rows),
        x_test: pick_x(test_rows),
        y_train: pick_y(train_rows),
        y_test: pick_y(test_rows),
        test_rows: test_rows.to_vec(),
    })
}
