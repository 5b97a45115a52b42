pub mod dataset;
pub mod error;
pub mod io;
pub mod labels;
pub mod metrics;
pub mod models;
pub mod plot;
pub mod results;
pub mod signal;
pub mod trials;

pub use error::{DataError, ModelError};
pub use models::{Classifier, Evaluation, Strategy};
pub use signal::*;
