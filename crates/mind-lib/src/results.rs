use anyhow::{bail, Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::metrics::ConfusionMatrix;
use crate::models::Strategy;

/// The three summary metrics, one table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    Accuracy,
    Precision,
    CvAccuracy,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Accuracy, Metric::Precision, Metric::CvAccuracy];

    pub fn file_key(&self) -> &'static str {
        match self {
            Metric::Accuracy => "accuracy",
            Metric::Precision => "precision",
            Metric::CvAccuracy => "cv_acc",
        }
    }
}

/// Append-only table: fixed row index (model names), one column per participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    pub index: Vec<String>,
    pub columns: Vec<(String, Vec<f64>)>,
}

impl ResultTable {
    pub fn new(index: Vec<String>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Empty table indexed by the strategy names.
    pub fn for_strategies() -> Self {
        Self::new(
            Strategy::ALL
                .iter()
                .map(|strategy| strategy.name().to_string())
                .collect(),
        )
    }

    /// Add a column for `participant`. Existing columns are left as they are.
    pub fn append(&mut self, participant: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.index.len() {
            bail!(
                "column for {} has {} values; table has {} rows",
                participant,
                values.len(),
                self.index.len()
            );
        }
        if self.columns.iter().any(|(name, _)| name == participant) {
            bail!("participant {} already has a column", participant);
        }
        self.columns.push((participant.to_string(), values));
        Ok(())
    }

    pub fn column(&self, participant: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(name, _)| name == participant)
            .map(|(_, values)| values.as_slice())
    }

    pub fn participants(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Write as CSV with an unnamed index column and two-decimal values.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file =
            fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
        let mut writer = WriterBuilder::new().from_writer(file);
        let mut header = vec![String::new()];
        header.extend(self.columns.iter().map(|(name, _)| name.clone()));
        writer.write_record(&header)?;
        for (row, model) in self.index.iter().enumerate() {
            let mut record = vec![model.clone()];
            record.extend(
                self.columns
                    .iter()
                    .map(|(_, values)| format!("{:.2}", values[row])),
            );
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("opening {}", path.display()))?;
        let headers = reader.headers()?.clone();
        let names: Vec<String> = headers.iter().skip(1).map(|h| h.to_string()).collect();
        let mut index = Vec::new();
        let mut columns: Vec<(String, Vec<f64>)> =
            names.into_iter().map(|name| (name, Vec::new())).collect();
        for record in reader.records() {
            let record = record.with_context(|| format!("reading {}", path.display()))?;
            index.push(record.get(0).unwrap_or_default().to_string());
            for (column, raw) in columns.iter_mut().zip(record.iter().skip(1)) {
                column
                    .1
                    .push(raw.parse().with_context(|| format!("parsing value {}", raw))?);
            }
        }
        Ok(Self { index, columns })
    }
}

/// `case_<case>_<metric>_<start>-<end>.csv`
pub fn summary_file_name(case_id: &str, metric: Metric, start: usize, end: usize) -> String {
    format!(
        "case_{}_{}_{}-{}.csv",
        case_id,
        metric.file_key(),
        start,
        end
    )
}

/// `<output_root>/<start>_<end>`
pub fn window_dir(output_root: &Path, start: usize, end: usize) -> PathBuf {
    output_root.join(format!("{}_{}", start, end))
}

/// File stem shared by the confusion-matrix CSV and image of one participant and model.
pub fn confusion_stem(participant: &str, tag: &str, start: usize, end: usize) -> String {
    format!("{}_{}_{}-{}_confusion_matrix", participant, tag, start, end)
}

/// Write the matrix with true labels as rows and predicted labels as columns.
pub fn write_confusion_csv(path: &Path, matrix: &ConfusionMatrix) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().from_writer(file);
    let mut header = vec!["true\\predicted".to_string()];
    header.extend(matrix.labels.iter().cloned());
    writer.write_record(&header)?;
    for (label, counts) in matrix.labels.iter().zip(&matrix.counts) {
        let mut record = vec![label.clone()];
        record.extend(counts.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::LabelVocabulary;
    use tempfile::tempdir;

    #[test]
    fn append_keeps_prior_columns() {
        let mut table = ResultTable::for_strategies();
        table.append("p01", vec![0.5, 0.6, 0.7]).unwrap();
        let before = table.column("p01").unwrap().to_vec();
        table.append("p02", vec![0.1, 0.2, 0.3]).unwrap();
        table.append("p03", vec![0.9, 0.8, 0.7]).unwrap();
        assert_eq!(table.column("p01").unwrap(), before.as_slice());
        assert_eq!(table.participants(), vec!["p01", "p02", "p03"]);
        assert_eq!(table.index, vec!["SVC", "DTC", "NB"]);
    }

    #[test]
    fn append_rejects_bad_columns() {
        let mut table = ResultTable::for_strategies();
        assert!(table.append("p01", vec![0.5]).is_err());
        table.append("p01", vec![0.5, 0.6, 0.7]).unwrap();
        assert!(table.append("p01", vec![0.5, 0.6, 0.7]).is_err());
        assert_eq!(table.columns.len(), 1);
    }

    #[test]
    fn writes_two_decimal_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("acc.csv");
        let mut table = ResultTable::for_strategies();
        table.append("p01", vec![0.5, 2.0 / 3.0, 1.0]).unwrap();
        table.write_csv(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![",p01", "SVC,0.50", "DTC,0.67", "NB,1.00"]);
        let back = ResultTable::read_csv(&path).unwrap();
        assert_eq!(back.participants(), vec!["p01"]);
        assert_eq!(back.column("p01").unwrap(), &[0.5, 0.67, 1.0]);
    }

    #[test]
    fn file_names_embed_case_and_window() {
        assert_eq!(
            summary_file_name("4", Metric::CvAccuracy, 257, 308),
            "case_4_cv_acc_257-308.csv"
        );
        assert_eq!(
            window_dir(Path::new("/out"), 257, 308),
            PathBuf::from("/out/257_308")
        );
        assert_eq!(
            confusion_stem("p01", "svc", 257, 308),
            "p01_svc_257-308_confusion_matrix"
        );
    }

    #[test]
    fn confusion_csv_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cm.csv");
        let vocab = LabelVocabulary {
            labels: vec!["cong".into(), "incong".into()],
        };
        let cm = ConfusionMatrix::from_labels(
            &vocab,
            &["cong".to_string(), "incong".to_string()],
            &["incong".to_string(), "incong".to_string()],
        );
        write_confusion_csv(&path, &cm).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.lines().collect::<Vec<_>>(),
            vec!["true\\predicted,cong,incong", "cong,0,1", "incong,0,1"]
        );
    }
}
