use anyhow::{anyhow, Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::signal::{SampleRow, SignalTable};

/// Names of the non-channel columns in a condition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub sample: String,
    pub marker: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            sample: "sample".into(),
            marker: "type".into(),
        }
    }
}

/// Load a congruent/incongruent condition CSV. Every column other than the sample and
/// marker columns is treated as a channel.
pub fn read_condition_csv(path: &Path, columns: &ColumnSpec) -> Result<SignalTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = reader.headers().context("reading header")?.clone();
    let sample_idx = locate_column(&headers, &columns.sample)?;
    let marker_idx = locate_column(&headers, &columns.marker)?;
    let channel_idx: Vec<usize> = (0..headers.len())
        .filter(|idx| *idx != sample_idx && *idx != marker_idx)
        .collect();
    let mut table = SignalTable::new(
        channel_idx
            .iter()
            .map(|idx| headers[*idx].to_string())
            .collect(),
    );
    for (line, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading record {}", line + 1))?;
        table
            .rows
            .push(parse_row(&record, &headers, sample_idx, marker_idx, &channel_idx)
                .with_context(|| format!("{} row {}", path.display(), line + 1))?);
    }
    Ok(table)
}

fn parse_row(
    record: &StringRecord,
    headers: &StringRecord,
    sample_idx: usize,
    marker_idx: usize,
    channel_idx: &[usize],
) -> Result<SampleRow> {
    let sample_str = record
        .get(sample_idx)
        .ok_or_else(|| anyhow!("missing sample column"))?;
    let sample = parse_sample_index(sample_str)
        .with_context(|| format!("parsing sample index {}", sample_str))?;
    let marker = record
        .get(marker_idx)
        .ok_or_else(|| anyhow!("missing marker column"))?
        .to_string();
    let mut values = Vec::with_capacity(channel_idx.len());
    for idx in channel_idx {
        let raw = record
            .get(*idx)
            .ok_or_else(|| anyhow!("missing channel column '{}'", &headers[*idx]))?;
        let value = raw
            .parse::<f64>()
            .with_context(|| format!("channel '{}' is not numeric: {}", &headers[*idx], raw))?;
        values.push(value);
    }
    Ok(SampleRow {
        sample,
        marker,
        values,
    })
}

/// Sample indices are written either as integers or as integral floats ("3.0").
fn parse_sample_index(raw: &str) -> Result<usize> {
    if let Ok(value) = raw.parse::<usize>() {
        return Ok(value);
    }
    let value: f64 = raw.parse()?;
    if value < 0.0 || value.fract() != 0.0 {
        anyhow::bail!("not a non-negative integer");
    }
    Ok(value as usize)
}

fn locate_column(headers: &StringRecord, requested: &str) -> Result<usize> {
    headers
        .iter()
        .position(|name| name.eq_ignore_ascii_case(requested))
        .ok_or_else(|| anyhow!("missing column '{}'", requested))
}
