use anyhow::{bail, Context, Result};
use mind_lib::io::ColumnSpec;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything one batch run needs. Loadable from TOML; every field except the two
/// roots has a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub input_root: PathBuf,
    pub output_root: PathBuf,
    /// First retained sample index (inclusive).
    #[serde(default = "default_window_start")]
    pub window_start: usize,
    /// End of the window (exclusive).
    #[serde(default = "default_window_end")]
    pub window_end: usize,
    #[serde(default = "default_cv_folds")]
    pub cv_folds: usize,
    /// Fraction of trials held out for testing.
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_case_id")]
    pub case_id: String,
    /// Participant directory names to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default = "default_congruent_suffix")]
    pub congruent_suffix: String,
    #[serde(default = "default_incongruent_suffix")]
    pub incongruent_suffix: String,
    #[serde(default = "default_sample_column")]
    pub sample_column: String,
    #[serde(default = "default_marker_column")]
    pub marker_column: String,
    /// Also render confusion matrices as PNG heat maps.
    #[serde(default = "default_render_png")]
    pub render_png: bool,
}

fn default_window_start() -> usize {
    257
}
fn default_window_end() -> usize {
    308
}
fn default_cv_folds() -> usize {
    5
}
fn default_test_ratio() -> f64 {
    0.25
}
fn default_seed() -> u64 {
    42
}
fn default_case_id() -> String {
    "4".into()
}
fn default_congruent_suffix() -> String {
    "Cong.csv".into()
}
fn default_incongruent_suffix() -> String {
    "Incong.csv".into()
}
fn default_sample_column() -> String {
    "sample".into()
}
fn default_marker_column() -> String {
    "type".into()
}
fn default_render_png() -> bool {
    true
}

impl RunConfig {
    pub fn new(input_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            output_root: output_root.into(),
            window_start: default_window_start(),
            window_end: default_window_end(),
            cv_folds: default_cv_folds(),
            test_ratio: default_test_ratio(),
            seed: default_seed(),
            case_id: default_case_id(),
            exclude: Vec::new(),
            congruent_suffix: default_congruent_suffix(),
            incongruent_suffix: default_incongruent_suffix(),
            sample_column: default_sample_column(),
            marker_column: default_marker_column(),
            render_png: default_render_png(),
        }
    }

    pub fn with_window(mut self, start: usize, end: usize) -> Self {
        self.window_start = start;
        self.window_end = end;
        self
    }

    pub fn window(&self) -> (usize, usize) {
        (self.window_start, self.window_end)
    }

    pub fn columns(&self) -> ColumnSpec {
        ColumnSpec {
            sample: self.sample_column.clone(),
            marker: self.marker_column.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_start >= self.window_end {
            bail!(
                "window start {} must be below window end {}",
                self.window_start,
                self.window_end
            );
        }
        if self.cv_folds < 2 {
            bail!("cv_folds must be at least 2, got {}", self.cv_folds);
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            bail!("test_ratio must lie strictly between 0 and 1, got {}", self.test_ratio);
        }
        if self.congruent_suffix == self.incongruent_suffix {
            bail!("condition suffixes must differ");
        }
        Ok(())
    }
}

pub fn read_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: RunConfig =
        toml::from_str(&contents).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn toml_fills_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run.toml");
        fs::write(
            &path,
            "input_root = \"data\"\noutput_root = \"out\"\nwindow_start = 10\nwindow_end = 20\nexclude = [\"cha\"]\n",
        )
        .unwrap();
        let config = read_config(&path).unwrap();
        assert_eq!(config.window(), (10, 20));
        assert_eq!(config.cv_folds, 5);
        assert_eq!(config.seed, 42);
        assert_eq!(config.case_id, "4");
        assert_eq!(config.exclude, vec!["cha"]);
        assert_eq!(config.columns(), ColumnSpec::default());
        config.validate().unwrap();
    }

    #[test]
    fn defaults_follow_case_four_window() {
        let config = RunConfig::new("in", "out");
        assert_eq!(config.window(), (257, 308));
        assert!(config.render_png);
    }

    #[test]
    fn validation_rejects_bad_settings() {
        assert!(RunConfig::new("in", "out").with_window(5, 5).validate().is_err());
        let mut folds = RunConfig::new("in", "out");
        folds.cv_folds = 1;
        assert!(folds.validate().is_err());
        let mut ratio = RunConfig::new("in", "out");
        ratio.test_ratio = 0.0;
        assert!(ratio.validate().is_err());
    }
}
