use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use corroborate_core::{
    ConfigLoader, NO_RESULTS_MESSAGE, ResearchAssistant, ResearchError, ResearchMode,
    ResearchReport, RunOptions, TelemetryOptions, init_metrics_from_env, init_telemetry,
};
use serde_json::json;
use tokio::runtime::Runtime;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "corroborate",
    version,
    about = "Multi-source research with claim corroboration"
)]
struct Cli {
    /// Path to a TOML configuration file. Falls back to `CORROBORATE_CONFIG`, then `corroborate.toml`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log detail (-v info, -vv debug, -vvv trace). `RUST_LOG` wins when set.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Markdown)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Small sequential fan-out over every source.
    Quick(QuickArgs),
    /// Larger concurrent fan-out with per-source toggles.
    Deep(DeepArgs),
}

#[derive(Args, Debug)]
struct QuickArgs {
    /// Query to research.
    #[arg(long)]
    query: String,
}

#[derive(Args, Debug)]
struct DeepArgs {
    /// Query to research.
    #[arg(long)]
    query: String,

    /// Skip web search.
    #[arg(long)]
    no_web: bool,

    /// Skip the encyclopedia.
    #[arg(long)]
    no_encyclopedia: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    Markdown,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(TelemetryOptions::with_verbosity(cli.verbose))?;
    init_metrics_from_env("corroborate-cli")?;

    let config = ConfigLoader::load(cli.config.clone()).context("failed to load configuration")?;
    let assistant = ResearchAssistant::from_config(config)?;

    let (query, options) = match cli.command {
        Command::Quick(args) => (args.query, RunOptions::quick()),
        Command::Deep(args) => (
            args.query,
            RunOptions::deep(!args.no_web, !args.no_encyclopedia),
        ),
    };

    let rt = Runtime::new()?;
    let output = rt.block_on(async {
        info!(%query, mode = options.mode.as_str(), "starting research");
        match cli.format {
            OutputFormat::Markdown => Ok::<_, anyhow::Error>(match options.mode {
                ResearchMode::Quick => assistant.quick(&query).await,
                ResearchMode::Deep => {
                    assistant
                        .deep(&query, options.use_web, options.use_encyclopedia)
                        .await
                }
            }),
            OutputFormat::Json => json_output(assistant.orchestrator().run(&query, options).await),
        }
    })?;

    println!("{output}");
    Ok(())
}

/// JSON for a finished run. An empty result set is reported as a message
/// object rather than an error exit.
fn json_output(result: Result<ResearchReport, ResearchError>) -> Result<String> {
    let value = match result {
        Ok(report) => serde_json::to_value(&report).context("failed to serialize report")?,
        Err(err) if err.is_no_results() => json!({ "message": NO_RESULTS_MESSAGE }),
        Err(err) => return Err(err.into()),
    };
    serde_json::to_string_pretty(&value).context("failed to serialize report")
}
