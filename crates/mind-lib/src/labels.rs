use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{DataError, ModelError};
use crate::signal::SignalTable;
use crate::trials::{find_trials, trial_ranges};

/// One label per trial, in trial order, taken from the trial's marker column.
pub fn create_labels(table: &SignalTable) -> Result<Vec<String>, DataError> {
    let starts = find_trials(table);
    let mut labels = Vec::with_capacity(starts.len());
    for (trial, (start, end)) in trial_ranges(table, &starts).into_iter().enumerate() {
        let rows = &table.rows[start..end];
        let first = &rows[0].marker;
        if let Some(other) = rows.iter().find(|row| row.marker != *first) {
            return Err(DataError::InconsistentMarkers {
                trial,
                first: first.clone(),
                other: other.marker.clone(),
            });
        }
        labels.push(first.clone());
    }
    Ok(labels)
}

/// Sorted set of distinct labels; a label's class id is its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelVocabulary {
    pub labels: Vec<String>,
}

impl LabelVocabulary {
    pub fn from_labels<'a, I>(labels: I) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let set: BTreeSet<&String> = labels.into_iter().collect();
        Self {
            labels: set.into_iter().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn class_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn encode(&self, labels: &[String]) -> Result<Vec<usize>, ModelError> {
        labels
            .iter()
            .map(|label| {
                self.class_of(label)
                    .ok_or_else(|| ModelError::UnknownLabel(label.clone()))
            })
            .collect()
    }

    pub fn decode(&self, classes: &[usize]) -> Vec<String> {
        classes
            .iter()
            .map(|class| self.labels[*class].clone())
            .collect()
    }
}
