//! `okrflow` command-line front end.

mod render;
mod shell;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use okrflow::config::PipelineConfig;
use okrflow::core::StageId;
use okrflow::events::LoggingEventSink;
use okrflow::invoker::StageInvokers;
use okrflow::observability::init_logging;
use okrflow::orchestrator::Orchestrator;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "okrflow", version, about = "Turn learning logs into retrospective OKRs")]
struct Cli {
    /// JSON configuration file (defaults, then file, then OKRFLOW_* variables)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Base URL of the transformation service
    #[arg(long, global = true, value_name = "URL")]
    base_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline over a log file, stopping at the first failure
    Run(RunArgs),
    /// Start an interactive session
    Shell,
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// File with one log entry per line, or '-' for stdin
    #[arg(long, value_name = "FILE", required_unless_present = "sample")]
    logs: Option<String>,

    /// Use the built-in sample logs
    #[arg(long, conflicts_with = "logs")]
    sample: bool,

    /// Last step to run
    #[arg(long, value_name = "STEP", default_value_t = 5,
          value_parser = clap::value_parser!(u8).range(1..=5))]
    through: u8,

    /// Directory to write the results JSON into
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_logging(&config.logging)?;
    debug!(base_url = %config.base_url, "Loaded configuration");

    let orchestrator = Orchestrator::new(StageInvokers::http(&config)?)
        .with_event_sink(Arc::new(LoggingEventSink::debug()));

    match cli.command {
        Commands::Run(args) => cmd_run(&orchestrator, args).await,
        Commands::Shell => shell::run(&orchestrator).await,
    }
}

fn load_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::new(),
    };
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(url) = &cli.base_url {
        config.base_url.clone_from(url);
    }
    if cli.json_logs {
        config.logging.json = true;
    }
    config.validate()?;
    Ok(config)
}

async fn cmd_run(orchestrator: &Orchestrator, args: RunArgs) -> Result<()> {
    match args.logs.as_deref() {
        _ if args.sample => orchestrator.load_sample_logs(),
        Some("-") => {
            let mut text = String::new();
            tokio::io::stdin().read_to_string(&mut text).await?;
            orchestrator.set_draft_logs(text);
        }
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read logs from {path}"))?;
            orchestrator.set_draft_logs(text);
        }
        None => bail!("either --logs or --sample is required"),
    }

    let last = StageId::from_index(usize::from(args.through))
        .ok_or_else(|| anyhow!("--through must be between 1 and 5"))?;
    for stage in StageId::ALL.into_iter().take(last.index()) {
        eprintln!("{}", stage.loading_message());
        let outcome = orchestrator.run_stage(stage).await;
        if !outcome.is_success() {
            bail!("{outcome}");
        }
        println!("== Step {}: {} ==", stage.index(), stage.title());
        println!("{}", render::output(stage, orchestrator.stage_output(stage).as_ref()));
    }

    if let Some(dir) = args.export {
        let path = orchestrator.export_to_dir(&dir).await?;
        eprintln!("Results saved to {}", path.display());
    }
    Ok(())
}
