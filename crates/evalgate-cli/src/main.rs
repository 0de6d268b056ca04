//! evalgate - golden-set promotion gate CLI
//!
//! ## Commands
//!
//! - `run`: Evaluate the case suite, persist the report, print the gate outcome
//! - `latest`: Print the gate outcome of the most recent run for an environment

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, Level};

use evalgate_core::{
    init_tracing, Catalog, EvalEngine, LogFormat, OutputSet, ReportStore, RunConfig,
    DEFAULT_ENVIRONMENT, DEFAULT_MODEL_LABEL,
};

/// Exit code when `--check-gate` is set and promotion is blocked.
const GATE_BLOCKED_EXIT: u8 = 3;

const DEFAULT_OUTPUT_DIR: &str = "evals/results";

#[derive(Parser)]
#[command(name = "evalgate")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Golden-set evaluation and promotion gate", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate the golden set and decide whether promotion is allowed
    Run(RunArgs),

    /// Show the gate outcome of the latest persisted run
    Latest {
        /// Environment whose latest report to read
        #[arg(long = "env", default_value = DEFAULT_ENVIRONMENT)]
        environment: String,

        /// Directory holding persisted reports
        #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Case suite document (JSON)
    #[arg(long, env = "EVALGATE_SUITE")]
    suite: PathBuf,

    /// Rubric catalog document (JSON)
    #[arg(long, env = "EVALGATE_RUBRICS")]
    rubrics: PathBuf,

    /// Outputs document keyed by case id (JSON object or list of records)
    #[arg(long)]
    outputs: Option<PathBuf>,

    /// Target environment label
    #[arg(long = "env", default_value = DEFAULT_ENVIRONMENT)]
    environment: String,

    /// Evaluate each case against its own expected output
    #[arg(long)]
    use_expected: bool,

    /// Omit judge-dependent rubrics instead of scoring them 0.0
    #[arg(long)]
    allow_skip_llm_judge: bool,

    /// Model label, echoed in the report
    #[arg(long, default_value = DEFAULT_MODEL_LABEL)]
    model: String,

    /// Sampling temperature, echoed in the report
    #[arg(long)]
    temperature: Option<f64>,

    /// Comma-separated case ids to restrict the run to
    #[arg(long, value_delimiter = ',')]
    cases: Vec<String>,

    /// Directory receiving the timestamped report and latest pointer
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Exit with code 3 when promotion is blocked
    #[arg(long)]
    check_gate: bool,

    /// Concurrent case workers
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,
}

impl RunArgs {
    fn run_config(&self) -> RunConfig {
        let mut config = RunConfig::new(self.environment.clone())
            .with_model(self.model.clone(), self.temperature)
            .with_use_expected(self.use_expected)
            .with_allow_skip_llm_judge(self.allow_skip_llm_judge)
            .with_workers(self.jobs);

        let ids: Vec<&str> = self
            .cases
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty())
            .collect();
        if !ids.is_empty() {
            config = config.with_case_ids(ids);
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let format = if cli.json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    init_tracing(format, level);

    let code = match cli.command {
        Commands::Run(args) => cmd_run(&args).await?,
        Commands::Latest {
            environment,
            output_dir,
        } => cmd_latest(&environment, &output_dir)?,
    };
    Ok(ExitCode::from(code))
}

fn load_outputs(path: Option<&Path>) -> Result<OutputSet> {
    match path {
        Some(path) => OutputSet::load(path)
            .with_context(|| format!("Failed to load outputs: {:?}", path)),
        None => Ok(OutputSet::default()),
    }
}

async fn cmd_run(args: &RunArgs) -> Result<u8> {
    let catalog = Catalog::load(&args.suite, &args.rubrics).with_context(|| {
        format!(
            "Failed to load catalog from {:?} and {:?}",
            args.suite, args.rubrics
        )
    })?;
    let outputs = load_outputs(args.outputs.as_deref())?;
    if !args.use_expected && outputs.is_empty() {
        info!("no external outputs supplied; every case will be skipped");
    }

    let config = args.run_config();
    let store = ReportStore::new(&args.output_dir);
    let engine = EvalEngine::new(catalog, outputs);

    let report = engine
        .run_concurrent(&config, &store)
        .await
        .context("Evaluation run failed")?;

    println!("{}", serde_json::to_string_pretty(&report.outcome())?);

    if args.check_gate && !report.can_promote() {
        return Ok(GATE_BLOCKED_EXIT);
    }
    Ok(0)
}

fn cmd_latest(environment: &str, output_dir: &Path) -> Result<u8> {
    let store = ReportStore::new(output_dir);
    let report = store
        .load_latest(environment)
        .with_context(|| format!("Failed to read latest report in {:?}", output_dir))?;

    match report {
        Some(report) => {
            println!("{}", serde_json::to_string_pretty(&report.outcome())?);
            Ok(0)
        }
        None => anyhow::bail!(
            "No report for environment '{}' in {:?}",
            environment,
            output_dir
        ),
    }
}
