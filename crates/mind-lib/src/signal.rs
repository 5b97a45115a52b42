use crate::error::DataError;
use serde::{Deserialize, Serialize};

/// One recorded sample: its per-trial sample index, trial-type marker and channel values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleRow {
    pub sample: usize,
    pub marker: String,
    pub values: Vec<f64>,
}

/// Row-ordered recording with named channel columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalTable {
    pub channels: Vec<String>,
    pub rows: Vec<SampleRow>,
}

impl SignalTable {
    pub fn new(channels: Vec<String>) -> Self {
        Self {
            channels,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Append `other` below `self`, keeping row order. Both tables must share the same channels.
    pub fn concatenate(&self, other: &SignalTable) -> Result<SignalTable, DataError> {
        if self.channels != other.channels {
            return Err(DataError::HeaderMismatch {
                left: self.channels.clone(),
                right: other.channels.clone(),
            });
        }
        let mut rows = Vec::with_capacity(self.rows.len() + other.rows.len());
        rows.extend_from_slice(&self.rows);
        rows.extend_from_slice(&other.rows);
        Ok(SignalTable {
            channels: self.channels.clone(),
            rows,
        })
    }
}

/// A contiguous run of samples belonging to one stimulus presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Position of the trial within the concatenated recording.
    pub index: usize,
    pub channels: Vec<String>,
    pub rows: Vec<SampleRow>,
}

impl Trial {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Per-channel means of a windowed trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AveragedTrial {
    pub index: usize,
    pub channels: Vec<String>,
    /// One mean per channel, in channel order. NaN when no sample was retained.
    pub means: Vec<f64>,
    /// Number of samples that contributed to the means.
    pub retained: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(sample: usize, marker: &str, values: &[f64]) -> SampleRow {
        SampleRow {
            sample,
            marker: marker.into(),
            values: values.to_vec(),
        }
    }

    #[test]
    fn concatenate_keeps_row_order() {
        let mut a = SignalTable::new(vec!["Fz".into(), "Cz".into()]);
        a.rows.push(row(0, "cong", &[1.0, 2.0]));
        let mut b = SignalTable::new(vec!["Fz".into(), "Cz".into()]);
        b.rows.push(row(0, "incong", &[3.0, 4.0]));
        b.rows.push(row(1, "incong", &[5.0, 6.0]));
        let joined = a.concatenate(&b).unwrap();
        assert_eq!(joined.len(), 3);
        assert_eq!(joined.rows[0].marker, "cong");
        assert_eq!(joined.rows[2].values, vec![5.0, 6.0]);
    }

    #[test]
    fn concatenate_rejects_different_channels() {
        let a = SignalTable::new(vec!["Fz".into()]);
        let b = SignalTable::new(vec!["Cz".into()]);
        let err = a.concatenate(&b).unwrap_err();
        assert!(matches!(err, DataError::HeaderMismatch { .. }));
    }
}
