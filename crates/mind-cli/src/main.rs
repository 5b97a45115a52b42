use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use log::info;
use mind_lib::{
    io::{read_condition_csv, ColumnSpec, Participant},
    trials::{average_trials, find_trials, process_trials, separate_trials},
};
use mind_run::{analyze_participant, read_config, run, RunConfig};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "mind",
    version,
    about = "Per-participant EEG trial classification over congruent/incongruent recordings"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

/// Settings shared by every command that trains models.
#[derive(Args, Clone, Default)]
struct PipelineArgs {
    /// TOML run configuration; flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,
    /// First sample index of the window (inclusive)
    #[arg(long)]
    start: Option<usize>,
    /// End sample index of the window (exclusive)
    #[arg(long)]
    end: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    /// Number of cross-validation folds
    #[arg(long)]
    folds: Option<usize>,
    /// Fraction of trials held out for testing
    #[arg(long)]
    test_ratio: Option<f64>,
    #[arg(long)]
    sample_column: Option<String>,
    #[arg(long)]
    marker_column: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify every participant under --input and write summary tables under --output
    Run {
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Participant directory to skip (repeatable)
        #[arg(long)]
        exclude: Vec<String>,
        /// Case identifier embedded in summary file names
        #[arg(long)]
        case_id: Option<String>,
        /// Only write confusion matrices as CSV
        #[arg(long)]
        no_png: bool,
    },
    /// Classify a single participant directory and print its metrics as JSON
    Participant {
        #[command(flatten)]
        pipeline: PipelineArgs,
        #[arg(long)]
        dir: PathBuf,
    },
    /// Print windowed channel averages of every trial in one condition file
    Trials {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value_t = 0)]
        start: usize,
        #[arg(long, default_value_t = usize::MAX)]
        end: usize,
        #[arg(long, default_value = "sample")]
        sample_column: String,
        #[arg(long, default_value = "type")]
        marker_column: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();

    match cli.command {
        Commands::Run {
            pipeline,
            input,
            output,
            exclude,
            case_id,
            no_png,
        } => cmd_run(&pipeline, input, output, exclude, case_id, no_png)?,
        Commands::Participant { pipeline, dir } => cmd_participant(&pipeline, &dir)?,
        Commands::Trials {
            file,
            start,
            end,
            sample_column,
            marker_column,
        } => cmd_trials(
            &file,
            start,
            end,
            ColumnSpec {
                sample: sample_column,
                marker: marker_column,
            },
        )?,
    }
    Ok(())
}

fn base_config(pipeline: &PipelineArgs, input: PathBuf, output: PathBuf) -> Result<RunConfig> {
    let mut config = match &pipeline.config {
        Some(path) => read_config(path)?,
        None => RunConfig::new(input, output),
    };
    if let Some(start) = pipeline.start {
        config.window_start = start;
    }
    if let Some(end) = pipeline.end {
        config.window_end = end;
    }
    if let Some(seed) = pipeline.seed {
        config.seed = seed;
    }
    if let Some(folds) = pipeline.folds {
        config.cv_folds = folds;
    }
    if let Some(ratio) = pipeline.test_ratio {
        config.test_ratio = ratio;
    }
    if let Some(column) = &pipeline.sample_column {
        config.sample_column = column.clone();
    }
    if let Some(column) = &pipeline.marker_column {
        config.marker_column = column.clone();
    }
    Ok(config)
}

fn cmd_run(
    pipeline: &PipelineArgs,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    exclude: Vec<String>,
    case_id: Option<String>,
    no_png: bool,
) -> Result<()> {
    if pipeline.config.is_none() && (input.is_none() || output.is_none()) {
        anyhow::bail!("either --config or both --input and --output are required");
    }
    let mut config = base_config(
        pipeline,
        input.clone().unwrap_or_default(),
        output.clone().unwrap_or_default(),
    )?;
    if let Some(input) = input {
        config.input_root = input;
    }
    if let Some(output) = output {
        config.output_root = output;
    }
    config.exclude.extend(exclude);
    if let Some(case_id) = case_id {
        config.case_id = case_id;
    }
    if no_png {
        config.render_png = false;
    }
    let summary = run(&config)?;
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_participant(pipeline: &PipelineArgs, dir: &Path) -> Result<()> {
    let config = base_config(pipeline, dir.to_path_buf(), dir.to_path_buf())?;
    config.validate()?;
    let id = dir
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .with_context(|| format!("{} has no directory name", dir.display()))?;
    info!("analysing participant {}", id);
    let participant = Participant {
        id,
        dir: dir.to_path_buf(),
    };
    let analysis = analyze_participant(&participant, &config)?;
    println!("{}", serde_json::to_string(&analysis)?);
    Ok(())
}

fn cmd_trials(path: &Path, start: usize, end: usize, columns: ColumnSpec) -> Result<()> {
    let table = read_condition_csv(path, &columns)?;
    let trials = separate_trials(&table, &find_trials(&table));
    let averaged = average_trials(&process_trials(&trials, start, end));
    println!("{}", serde_json::to_string(&averaged)?);
    Ok(())
}
