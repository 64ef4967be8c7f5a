use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use spindle_engine::{DiagnosticLog, ExecutorConfig, FileWatchSink, FunctionExecutor};
use spindle_types::ExecutionResult;
use tokio_util::sync::CancellationToken;
use tracing::{Level, info, warn};

mod catalog;
mod manifest;

/// Run user functions against declared parameter bindings.
#[derive(Parser, Debug)]
#[command(name = "spindle", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Invoke the function described by a manifest
    Run(RunArgs),
    /// List the built-in functions and their parameters
    Functions,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// YAML or JSON invocation manifest
    #[arg(long)]
    manifest: PathBuf,

    /// Write self-watch snapshots to this file (overrides SPINDLE_WATCH_FILE)
    #[arg(long)]
    watch_file: Option<PathBuf>,

    /// Self-watch sampling interval in milliseconds (overrides SPINDLE_WATCH_INTERVAL_MS)
    #[arg(long)]
    watch_interval_ms: Option<u64>,

    /// Print the execution result as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    init_tracing();
    match Cli::parse().command {
        Command::Run(args) => run_manifest(args).await,
        Command::Functions => {
            list_functions();
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing() {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .try_init();
}

fn executor_config(args: &RunArgs) -> ExecutorConfig {
    let mut config = ExecutorConfig::from_environment();
    if let Some(path) = &args.watch_file {
        config = config.with_watch_sink(Arc::new(FileWatchSink::new(path)));
    }
    match args.watch_interval_ms {
        Some(0) => warn!("ignoring zero watch interval; keeping {:?}", config.watch_interval),
        Some(millis) => config = config.with_watch_interval(Duration::from_millis(millis)),
        None => {}
    }
    config
}

async fn run_manifest(args: RunArgs) -> Result<ExitCode> {
    let manifest = manifest::load_manifest(&args.manifest)?;
    let request = manifest::bind_manifest(&manifest, &catalog::builtin_catalog())?;
    let executor = FunctionExecutor::new(executor_config(&args), DiagnosticLog::stdout());

    let cancellation = CancellationToken::new();
    let interrupt = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; cancelling invocation");
            interrupt.cancel();
        }
    });

    let result = tokio::task::spawn_blocking(move || executor.execute(request, &cancellation))
        .await
        .context("invocation thread terminated abnormally")?;
    print_result(&result, args.json)?;

    Ok(if result.is_success() { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

fn print_result(result: &ExecutionResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }
    let elapsed = result.duration().num_milliseconds();
    if result.is_success() {
        println!("{} succeeded in {} ms", result.function, elapsed);
    } else {
        println!(
            "{} failed in {} ms: {}: {}",
            result.function, elapsed, result.exception_type, result.exception_message
        );
    }
    Ok(())
}

fn list_functions() {
    for (name, function) in catalog::builtin_catalog() {
        let parameters: Vec<&str> = function.descriptor().parameter_names().collect();
        println!("{}({})", name, parameters.join(", "));
    }
}
