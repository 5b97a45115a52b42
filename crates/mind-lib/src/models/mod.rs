pub mod bayes;
pub mod svc;
pub mod tree;

use serde::{Deserialize, Serialize};

use crate::dataset::TrainTestSplit;
use crate::error::ModelError;
use crate::labels::LabelVocabulary;
use crate::metrics::{accuracy, cross_val_accuracy, macro_precision};

pub use bayes::GaussianNaiveBayes;
pub use svc::{SupportVectorClassifier, SvcConfig};
pub use tree::DecisionTree;

/// A classifier over dense feature rows and class ids.
pub trait Classifier {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize]) -> Result<(), ModelError>;
    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<usize>, ModelError>;
}

/// The fitting strategies evaluated for every participant, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    SupportVector,
    DecisionTree,
    NaiveBayes,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [
        Strategy::SupportVector,
        Strategy::DecisionTree,
        Strategy::NaiveBayes,
    ];

    /// Row name in the summary tables.
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::SupportVector => "SVC",
            Strategy::DecisionTree => "DTC",
            Strategy::NaiveBayes => "NB",
        }
    }

    /// Short tag used in artifact file names.
    pub fn tag(&self) -> &'static str {
        match self {
            Strategy::SupportVector => "svc",
            Strategy::DecisionTree => "dtc",
            Strategy::NaiveBayes => "nb",
        }
    }

    pub fn build(&self, seed: u64) -> Box<dyn Classifier> {
        match self {
            Strategy::SupportVector => Box::new(SupportVectorClassifier::new(SvcConfig {
                seed,
                ..SvcConfig::default()
            })),
            Strategy::DecisionTree => Box::new(DecisionTree::default()),
            Strategy::NaiveBayes => Box::new(GaussianNaiveBayes::default()),
        }
    }
}

/// Test-split and cross-validated scores of one strategy on one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub precision: f64,
    pub cv_accuracy: f64,
    /// One predicted label per test row, in test order.
    pub predictions: Vec<String>,
}

/// Fit on the training partition, score on the test partition and cross-validate
/// on the training partition.
pub fn evaluate(
    strategy: Strategy,
    split: &TrainTestSplit,
    vocabulary: &LabelVocabulary,
    cv_folds: usize,
    seed: u64,
) -> Result<Evaluation, ModelError> {
    let y_train = vocabulary.encode(&split.y_train)?;
    let y_test = vocabulary.encode(&split.y_test)?;

    let mut model = strategy.build(seed);
    model.fit(&split.x_train, &y_train)?;
    let predicted = model.predict(&split.x_test)?;

    let cv_accuracy =
        cross_val_accuracy(|| strategy.build(seed), &split.x_train, &y_train, cv_folds)?;
    let evaluation = Evaluation {
        accuracy: accuracy(&y_test, &predicted),
        precision: macro_precision(&y_test, &predicted),
        cv_accuracy,
        predictions: vocabulary.decode(&predicted),
    };
    log::debug!(
        "{}: accuracy={:.3} precision={:.3} cv_accuracy={:.3}",
        strategy.name(),
        evaluation.accuracy,
        evaluation.precision,
        evaluation.cv_accuracy
    );
    Ok(evaluation)
}

/// Validate a training set and return its feature width.
pub(crate) fn check_training_set(x: &[Vec<f64>], y: &[usize]) -> Result<usize, ModelError> {
    if x.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if x.len() != y.len() {
        return Err(ModelError::LengthMismatch {
            features: x.len(),
            labels: y.len(),
        });
    }
    let width = x[0].len();
    check_width(x, width)?;
    Ok(width)
}

pub(crate) fn check_width(x: &[Vec<f64>], width: usize) -> Result<(), ModelError> {
    match x.iter().find(|row| row.len() != width) {
        Some(row) => Err(ModelError::FeatureWidth {
            expected: width,
            actual: row.len(),
        }),
        None => Ok(()),
    }
}

/// Distinct class ids in ascending order.
pub(crate) fn distinct_classes(y: &[usize]) -> Vec<usize> {
    let mut classes = y.to_vec();
    classes.sort_unstable();
    classes.dedup();
    classes
}
