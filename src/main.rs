use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fintransform::abstractions::{JsonFileSource, JsonLinesSink, MemorySink, Sink};
use fintransform::app::{handle_fatal_error, init_logging, AppConfig};
use fintransform::config::PipelineConfig;
use fintransform::pipeline::{AmountPolicy, PipelineCoordinator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Validate financial records and persist them as target entities
#[derive(Parser)]
#[command(name = "fintransform")]
#[command(about = "Map/reduce transformation of external financial records", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the summary line
    Run {
        /// Input file: a JSON array, or JSON lines for .jsonl/.ndjson
        input: PathBuf,

        /// Append committed entities to this JSON lines file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Path to configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Maximum concurrent mapper and reducer tasks
        #[arg(long)]
        max_parallel: Option<usize>,

        /// How zero amounts are treated: present or non-zero
        #[arg(long)]
        amount_policy: Option<AmountPolicy>,
    },
    /// Source and map only: report what a run would persist
    Check {
        /// Input file: a JSON array, or JSON lines for .jsonl/.ndjson
        input: PathBuf,

        /// Path to configuration file
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// How zero amounts are treated: present or non-zero
        #[arg(long)]
        amount_policy: Option<AmountPolicy>,
    },
}

impl Commands {
    fn config_path(&self) -> Option<PathBuf> {
        match self {
            Commands::Run { config, .. } | Commands::Check { config, .. } => config.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    let app_config = AppConfig::new(verbose).with_config_path(cli.command.config_path());
    init_logging(&app_config);

    if let Err(e) = execute(cli.command, &app_config).await {
        handle_fatal_error(e, verbose);
    }
}

async fn execute(command: Commands, app_config: &AppConfig) -> Result<()> {
    let mut config = load_config(app_config.config_path.as_deref()).await?;

    match command {
        Commands::Run {
            input,
            output,
            max_parallel,
            amount_policy,
            ..
        } => {
            if let Some(n) = max_parallel {
                config.pipeline.max_parallel_mappers = n;
                config.pipeline.max_parallel_reducers = n;
            }
            if let Some(policy) = amount_policy {
                config.pipeline.amount_policy = policy;
            }

            let sink: Arc<dyn Sink> = match &output {
                Some(path) => Arc::new(JsonLinesSink::open(path.clone()).await.with_context(|| {
                    format!("Failed to open output file {}", path.display())
                })?),
                None => Arc::new(MemorySink::new()),
            };

            let pipeline = PipelineCoordinator::builder()
                .source(Arc::new(JsonFileSource::new(input)))
                .sink(sink)
                .config(config)
                .build()?;

            let report = pipeline.run().await?;
            debug!("Pipeline states: {:?}", report.states);

            println!("{}", report.summary.line);
            if report.summary.failed > 0 {
                warn!(
                    "{} of {} records failed to persist",
                    report.summary.failed, report.summary.total
                );
            }
        }
        Commands::Check {
            input,
            amount_policy,
            ..
        } => {
            if let Some(policy) = amount_policy {
                config.pipeline.amount_policy = policy;
            }

            let pipeline = PipelineCoordinator::builder()
                .source(Arc::new(JsonFileSource::new(input)))
                .sink(Arc::new(MemorySink::new()))
                .config(config)
                .build()?;

            let report = pipeline.dry_run().await?;
            println!("Units read: {}", report.units_read);
            println!("Would persist: {}", report.emitted);
            println!("Rejected: {}", report.rejected);
            println!("Distinct keys: {}", report.distinct_keys);
        }
    }

    Ok(())
}

async fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::load(path).await,
        None => PipelineConfig::from_env(),
    }
}
