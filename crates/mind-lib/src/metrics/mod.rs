pub mod classification;
pub mod cross_val;

pub use classification::{accuracy, macro_precision, ConfusionMatrix};
pub use cross_val::{cross_val_accuracy, kfold_splits};
