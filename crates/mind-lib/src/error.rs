use std::path::PathBuf;
use thiserror::Error;

/// Failures while turning condition recordings into a training set.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no file ending in '{suffix}' in {}", dir.display())]
    MissingConditionFile { dir: PathBuf, suffix: String },
    #[error("{count} files ending in '{suffix}' in {}; expected exactly one", dir.display())]
    DuplicateConditionFile {
        dir: PathBuf,
        suffix: String,
        count: usize,
    },
    #[error("condition files disagree on columns: {left:?} vs {right:?}")]
    HeaderMismatch {
        left: Vec<String>,
        right: Vec<String>,
    },
    #[error("trial {trial} mixes markers '{first}' and '{other}'")]
    InconsistentMarkers {
        trial: usize,
        first: String,
        other: String,
    },
    #[error("{trials} averaged trials but {labels} labels")]
    LabelMismatch { trials: usize, labels: usize },
    #[error("trial {trial} retained no samples in window [{start}, {end})")]
    EmptyWindow {
        trial: usize,
        start: usize,
        end: usize,
    },
    #[error("test ratio {0} must lie strictly between 0 and 1")]
    InvalidTestRatio(f64),
    #[error("cannot split {rows} rows into non-empty train/test partitions with test ratio {ratio}")]
    SplitTooSmall { rows: usize, ratio: f64 },
}

/// Failures raised by the classifier strategies.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("cannot fit on an empty training set")]
    EmptyTrainingSet,
    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
    #[error("expected {expected} features per row, got {actual}")]
    FeatureWidth { expected: usize, actual: usize },
    #[error("model used before fit")]
    NotFitted,
    #[error("label '{0}' is not part of the label vocabulary")]
    UnknownLabel(String),
    #[error("{samples} training rows are too few for cross-validation (need at least 2 folds)")]
    TooFewSamplesForCv { samples: usize },
}
