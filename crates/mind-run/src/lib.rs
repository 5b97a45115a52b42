pub mod config;
pub mod render;

use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::{debug, info, warn};
use mind_lib::{
    dataset::{create_dataset, train_test_split},
    io::{list_participants, locate_condition_files, read_condition_csv, Participant},
    labels::{create_labels, LabelVocabulary},
    metrics::ConfusionMatrix,
    models::{evaluate, Evaluation, Strategy},
    plot::{figure_from_confusion, PlotBackend},
    results::{
        confusion_stem, summary_file_name, window_dir, write_confusion_csv, Metric, ResultTable,
    },
    trials::{average_trials, find_trials, process_trials, separate_trials},
    SignalTable,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use config::{read_config, RunConfig};
use render::PngHeatmap;

/// One strategy's scores for a participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOutcome {
    pub model: String,
    pub tag: String,
    #[serde(flatten)]
    pub evaluation: Evaluation,
}

/// Everything computed for one participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantAnalysis {
    pub participant: String,
    pub trial_count: usize,
    pub channel_count: usize,
    pub vocabulary: LabelVocabulary,
    pub y_test: Vec<String>,
    pub models: Vec<ModelOutcome>,
}

impl ParticipantAnalysis {
    /// One value per strategy, in registry order.
    pub fn metric_column(&self, metric: Metric) -> Vec<f64> {
        self.models
            .iter()
            .map(|outcome| match metric {
                Metric::Accuracy => outcome.evaluation.accuracy,
                Metric::Precision => outcome.evaluation.precision,
                Metric::CvAccuracy => outcome.evaluation.cv_accuracy,
            })
            .collect()
    }

    pub fn confusion_matrix(&self, outcome: &ModelOutcome) -> ConfusionMatrix {
        ConfusionMatrix::from_labels(
            &self.vocabulary,
            &self.y_test,
            &outcome.evaluation.predictions,
        )
    }
}

/// Run the full per-participant pipeline on already-loaded condition tables.
pub fn analyze_tables(
    participant: &str,
    congruent: &SignalTable,
    incongruent: &SignalTable,
    config: &RunConfig,
) -> Result<ParticipantAnalysis> {
    let (start, end) = config.window();
    let data = congruent.concatenate(incongruent)?;
    let starts = find_trials(&data);
    let trials = separate_trials(&data, &starts);
    let labels = create_labels(&data)?;
    let windowed = process_trials(&trials, start, end);
    let averaged = average_trials(&windowed);
    let dataset = create_dataset(&averaged, &labels, (start, end))?;
    debug!(
        "{}: {} trials over {} channels",
        participant,
        dataset.len(),
        dataset.channels.len()
    );
    let split = train_test_split(&dataset, config.test_ratio, config.seed)?;
    let vocabulary = LabelVocabulary::from_labels(&dataset.labels);

    let mut models = Vec::with_capacity(Strategy::ALL.len());
    for strategy in Strategy::ALL {
        let evaluation = evaluate(strategy, &split, &vocabulary, config.cv_folds, config.seed)
            .with_context(|| format!("{} on {}", strategy.name(), participant))?;
        models.push(ModelOutcome {
            model: strategy.name().to_string(),
            tag: strategy.tag().to_string(),
            evaluation,
        });
    }
    Ok(ParticipantAnalysis {
        participant: participant.to_string(),
        trial_count: trials.len(),
        channel_count: data.channel_count(),
        vocabulary,
        y_test: split.y_test,
        models,
    })
}

/// Locate, load and analyse one participant directory.
pub fn analyze_participant(
    participant: &Participant,
    config: &RunConfig,
) -> Result<ParticipantAnalysis> {
    let files = locate_condition_files(
        &participant.dir,
        &config.congruent_suffix,
        &config.incongruent_suffix,
    )?;
    let columns = config.columns();
    let congruent = read_condition_csv(&files.congruent, &columns)?;
    let incongruent = read_condition_csv(&files.incongruent, &columns)?;
    analyze_tables(&participant.id, &congruent, &incongruent, config)
}

/// Write one confusion matrix per model into the participant's directory.
/// On failure every file written so far is removed again.
pub fn write_confusion_artifacts(
    dir: &Path,
    analysis: &ParticipantAnalysis,
    config: &RunConfig,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    if let Err(err) = write_each_confusion(dir, analysis, config, &mut written) {
        for path in &written {
            if path.is_file() {
                if let Err(remove_err) = fs::remove_file(path) {
                    warn!("could not remove {}: {}", path.display(), remove_err);
                }
            }
        }
        return Err(err);
    }
    Ok(written)
}

fn write_each_confusion(
    dir: &Path,
    analysis: &ParticipantAnalysis,
    config: &RunConfig,
    written: &mut Vec<PathBuf>,
) -> Result<()> {
    let (start, end) = config.window();
    for outcome in &analysis.models {
        let matrix = analysis.confusion_matrix(outcome);
        debug!(
            "{} {}: {}/{} test trials on the diagonal",
            analysis.participant,
            outcome.tag,
            matrix.diagonal(),
            matrix.total()
        );
        let stem = confusion_stem(&analysis.participant, &outcome.tag, start, end);
        let csv_path = dir.join(format!("{}.csv", stem));
        written.push(csv_path.clone());
        write_confusion_csv(&csv_path, &matrix)?;
        if config.render_png {
            let png_path = dir.join(format!("{}.png", stem));
            written.push(png_path.clone());
            let title = format!("{} {} {}-{}", analysis.participant, outcome.tag, start, end);
            PngHeatmap::new(&png_path)
                .draw(&figure_from_confusion(&title, &matrix))
                .with_context(|| format!("rendering {}", png_path.display()))?;
        }
    }
    Ok(())
}

/// Accuracy, precision and cross-validated accuracy tables for a run.
#[derive(Debug, Clone)]
pub struct SummaryTables {
    pub accuracy: ResultTable,
    pub precision: ResultTable,
    pub cv_accuracy: ResultTable,
}

impl Default for SummaryTables {
    fn default() -> Self {
        Self {
            accuracy: ResultTable::for_strategies(),
            precision: ResultTable::for_strategies(),
            cv_accuracy: ResultTable::for_strategies(),
        }
    }
}

impl SummaryTables {
    pub fn table(&self, metric: Metric) -> &ResultTable {
        match metric {
            Metric::Accuracy => &self.accuracy,
            Metric::Precision => &self.precision,
            Metric::CvAccuracy => &self.cv_accuracy,
        }
    }

    fn table_mut(&mut self, metric: Metric) -> &mut ResultTable {
        match metric {
            Metric::Accuracy => &mut self.accuracy,
            Metric::Precision => &mut self.precision,
            Metric::CvAccuracy => &mut self.cv_accuracy,
        }
    }

    pub fn record(&mut self, analysis: &ParticipantAnalysis) -> Result<()> {
        for metric in Metric::ALL {
            let column = analysis.metric_column(metric);
            self.table_mut(metric)
                .append(&analysis.participant, column)?;
        }
        Ok(())
    }

    pub fn write_all(
        &self,
        dir: &Path,
        case_id: &str,
        start: usize,
        end: usize,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for metric in Metric::ALL {
            let path = dir.join(summary_file_name(case_id, metric, start, end));
            self.table(metric).write_csv(&path)?;
            paths.push(path);
        }
        Ok(paths)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantStatus {
    pub participant: String,
    pub status: Status,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub summary_files: Vec<PathBuf>,
    pub status_file: PathBuf,
    pub participants: Vec<ParticipantStatus>,
}

impl RunSummary {
    pub fn succeeded(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.status == Status::Ok)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.participants.len() - self.succeeded()
    }
}

pub fn write_status_csv(path: &Path, statuses: &[ParticipantStatus]) -> Result<()> {
    let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    writer.write_record(["participant", "status", "error"])?;
    for status in statuses {
        writer.serialize(status)?;
    }
    writer.flush()?;
    Ok(())
}

/// Process every participant under the input root and write the summary tables.
/// A participant that fails is logged and recorded in the status file; the run goes on.
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    config.validate()?;
    let (start, end) = config.window();
    let output_dir = window_dir(&config.output_root, start, end);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating {}", output_dir.display()))?;

    let participants = list_participants(&config.input_root, &config.exclude)?;
    info!(
        "processing {} participants from {} with window [{}, {})",
        participants.len(),
        config.input_root.display(),
        start,
        end
    );

    let mut tables = SummaryTables::default();
    let mut statuses = Vec::with_capacity(participants.len());
    for participant in &participants {
        info!("participant {}", participant.id);
        let outcome = analyze_participant(participant, config).and_then(|analysis| {
            write_confusion_artifacts(&participant.dir, &analysis, config)?;
            Ok(analysis)
        });
        match outcome {
            Ok(analysis) => {
                tables.record(&analysis)?;
                statuses.push(ParticipantStatus {
                    participant: participant.id.clone(),
                    status: Status::Ok,
                    error: None,
                });
            }
            Err(err) => {
                warn!("participant {} failed: {:#}", participant.id, err);
                statuses.push(ParticipantStatus {
                    participant: participant.id.clone(),
                    status: Status::Failed,
                    error: Some(format!("{:#}", err)),
                });
            }
        }
    }

    let summary_files = tables.write_all(&output_dir, &config.case_id, start, end)?;
    let status_file = output_dir.join(format!(
        "case_{}_status_{}-{}.csv",
        config.case_id, start, end
    ));
    write_status_csv(&status_file, &statuses)?;
    let summary = RunSummary {
        output_dir,
        summary_files,
        status_file,
        participants: statuses,
    };
    info!(
        "finished: {} ok, {} failed",
        summary.succeeded(),
        summary.failed()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mind_lib::SampleRow;
    use tempfile::tempdir;

    const CHANNELS: [&str; 3] = ["Fz", "Cz", "Pz"];

    fn condition_table(marker: &str, trials: usize, samples: usize, offset: f64) -> SignalTable {
        let mut table = SignalTable::new(CHANNELS.iter().map(|c| c.to_string()).collect());
        for trial in 0..trials {
            for sample in 0..samples {
                let base = offset + trial as f64 * 0.1 + sample as f64;
                table.rows.push(SampleRow {
                    sample,
                    marker: marker.to_string(),
                    values: vec![base, base * 2.0, base - 3.0],
                });
            }
        }
        table
    }

    fn write_condition_csv(path: &Path, table: &SignalTable) {
        let mut text = String::from("sample,type,Fz,Cz,Pz\n");
        for row in &table.rows {
            text.push_str(&format!(
                "{},{},{},{},{}\n",
                row.sample, row.marker, row.values[0], row.values[1], row.values[2]
            ));
        }
        fs::write(path, text).unwrap();
    }

    fn write_participant(root: &Path, id: &str, trials: usize) -> PathBuf {
        let dir = root.join(id);
        fs::create_dir_all(&dir).unwrap();
        write_condition_csv(
            &dir.join(format!("{}_Cong.csv", id)),
            &condition_table("cong", trials, 5, 0.0),
        );
        write_condition_csv(
            &dir.join(format!("{}_Incong.csv", id)),
            &condition_table("incong", trials, 5, 10.0),
        );
        dir
    }

    fn config(root: &Path, out: &Path) -> RunConfig {
        let mut cfg = RunConfig::new(root, out).with_window(1, 4);
        cfg.render_png = false;
        cfg
    }

    #[test]
    fn two_trials_per_condition_end_to_end() {
        let congruent = condition_table("cong", 2, 5, 0.0);
        let incongruent = condition_table("incong", 2, 5, 10.0);
        let cfg = config(Path::new("."), Path::new("."));

        let data = congruent.concatenate(&incongruent).unwrap();
        let trials = separate_trials(&data, &find_trials(&data));
        assert_eq!(trials.len(), 4);
        let averaged = average_trials(&process_trials(&trials, 1, 4));
        for (trial, avg) in trials.iter().zip(&averaged) {
            assert_eq!(avg.means.len(), 3);
            for channel in 0..3 {
                let expected = (1..4).map(|s| trial.rows[s].values[channel]).sum::<f64>() / 3.0;
                assert!((avg.means[channel] - expected).abs() < 1e-9);
            }
        }
        assert_eq!(create_labels(&data).unwrap().len(), 4);

        let analysis = analyze_tables("p01", &congruent, &incongruent, &cfg).unwrap();
        assert_eq!(analysis.trial_count, 4);
        assert_eq!(analysis.channel_count, 3);
        assert_eq!(analysis.y_test.len(), 1);
        assert_eq!(analysis.models.len(), 3);

        let mut tables = SummaryTables::default();
        tables.record(&analysis).unwrap();
        for metric in Metric::ALL {
            assert_eq!(tables.table(metric).participants(), vec!["p01"]);
        }
    }

    #[test]
    fn run_writes_summaries_and_isolates_failures() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let p01 = write_participant(input.path(), "p01", 6);
        write_participant(input.path(), "p02", 6);
        write_participant(input.path(), "cha", 6);
        let broken = input.path().join("p03");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("p03_Cong.csv"), "sample,type,Fz\n0,cong,1\n").unwrap();

        let mut cfg = config(input.path(), output.path());
        cfg.exclude = vec!["cha".into()];
        let summary = run(&cfg).unwrap();

        assert_eq!(summary.output_dir, output.path().join("1_4"));
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        let failed = &summary.participants[2];
        assert_eq!(failed.participant, "p03");
        assert!(failed.error.as_deref().unwrap().contains("Incong.csv"));

        let accuracy = ResultTable::read_csv(&summary.output_dir.join("case_4_accuracy_1-4.csv"))
            .unwrap();
        assert_eq!(accuracy.index, vec!["SVC", "DTC", "NB"]);
        assert_eq!(accuracy.participants(), vec!["p01", "p02"]);
        for name in ["case_4_precision_1-4.csv", "case_4_cv_acc_1-4.csv", "case_4_status_1-4.csv"] {
            assert!(summary.output_dir.join(name).exists(), "missing {}", name);
        }
        for tag in ["svc", "dtc", "nb"] {
            assert!(p01
                .join(format!("p01_{}_1-4_confusion_matrix.csv", tag))
                .exists());
        }
        assert!(!input.path().join("cha").join("cha_svc_1-4_confusion_matrix.csv").exists());
    }

    #[test]
    fn separable_conditions_score_perfectly() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_participant(input.path(), "p01", 8);
        let summary = run(&config(input.path(), output.path())).unwrap();
        assert_eq!(summary.succeeded(), 1);
        let accuracy =
            ResultTable::read_csv(&summary.output_dir.join("case_4_accuracy_1-4.csv")).unwrap();
        assert_eq!(accuracy.column("p01").unwrap(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn empty_input_still_writes_status_header() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let summary = run(&config(input.path(), output.path())).unwrap();
        assert!(summary.participants.is_empty());
        let status = fs::read_to_string(&summary.status_file).unwrap();
        assert_eq!(status, "participant,status,error\n");
    }

    #[test]
    fn status_file_lists_every_participant() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_participant(input.path(), "p01", 6);
        fs::create_dir_all(input.path().join("p02")).unwrap();
        let summary = run(&config(input.path(), output.path())).unwrap();
        let status = fs::read_to_string(&summary.status_file).unwrap();
        let lines: Vec<&str> = status.lines().collect();
        assert_eq!(lines[0], "participant,status,error");
        assert_eq!(lines[1], "p01,ok,");
        assert!(lines[2].starts_with("p02,failed,"));
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn failed_render_removes_written_artifacts() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        let p01 = write_participant(input.path(), "p01", 6);
        // a directory where the second heat map should go makes rendering fail
        let blocked = p01.join("p01_dtc_1-4_confusion_matrix.png");
        fs::create_dir_all(&blocked).unwrap();

        let mut cfg = config(input.path(), output.path());
        cfg.render_png = true;
        let summary = run(&cfg).unwrap();

        assert_eq!(summary.failed(), 1);
        assert!(summary.participants[0]
            .error
            .as_deref()
            .unwrap()
            .contains("rendering"));
        for name in [
            "p01_svc_1-4_confusion_matrix.csv",
            "p01_svc_1-4_confusion_matrix.png",
            "p01_dtc_1-4_confusion_matrix.csv",
        ] {
            assert!(!p01.join(name).exists(), "{} left behind", name);
        }
        assert!(blocked.is_dir());
        let accuracy =
            ResultTable::read_csv(&summary.output_dir.join("case_4_accuracy_1-4.csv")).unwrap();
        assert!(accuracy.participants().is_empty());
    }

    #[test]
    fn window_past_every_trial_fails_participant() {
        let input = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_participant(input.path(), "p01", 4);
        let cfg = config(input.path(), output.path()).with_window(50, 60);
        let summary = run(&cfg).unwrap();
        assert_eq!(summary.failed(), 1);
        assert!(summary.participants[0]
            .error
            .as_deref()
            .unwrap()
            .contains("retained no samples"));
    }
}
