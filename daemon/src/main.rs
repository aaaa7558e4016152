//! DEXF command-line entry point.

use anyhow::Context;
use clap::Parser;
use dexf_node::{run_script, LogFormat, NodeConfig, Protocol, SnapshotStore, Step};
use dexf_utils::format_duration;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dexf", about = "DEXF liquidity farming and governance engine")]
struct Cli {
    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long, env = "DEXF_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "DEXF_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "DEXF_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Snapshot file holding protocol state between runs.
    #[arg(long, env = "DEXF_STATE_FILE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the effective configuration as TOML.
    Config,

    /// Apply a JSON script of timed operations to the protocol.
    Simulate {
        /// JSON array of steps.
        #[arg(long)]
        script: PathBuf,

        /// Write step outcomes here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Stop at the first failing step.
        #[arg(long)]
        fail_fast: bool,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => NodeConfig::default(),
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = cli.log_format {
        config.log_format = format;
    }
    if let Some(path) = &cli.state_file {
        config.state_file = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

/// Resume from the snapshot when one exists, otherwise deploy fresh.
fn open_protocol(
    config: &NodeConfig,
) -> anyhow::Result<(Protocol, Option<SnapshotStore>)> {
    let Some(path) = &config.state_file else {
        return Ok((Protocol::new(config)?, None));
    };
    let store = SnapshotStore::open(path)
        .with_context(|| format!("opening state file {}", path.display()))?;
    let protocol = if store.is_empty()? {
        tracing::info!(path = %path.display(), "no saved state, deploying fresh");
        Protocol::new(config)?
    } else {
        tracing::info!(path = %path.display(), "resuming from saved state");
        Protocol::load_from_store(&store)?
    };
    Ok((protocol, Some(store)))
}

fn simulate(
    config: &NodeConfig,
    script: &Path,
    output: Option<&Path>,
    fail_fast: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(script)
        .with_context(|| format!("reading script {}", script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing script {}", script.display()))?;

    let (mut protocol, store) = open_protocol(config)?;
    tracing::info!(
        steps = steps.len(),
        epoch_duration = %format_duration(config.farm.epoch_duration_secs),
        timelock_delay = %format_duration(config.timelock.delay_secs),
        "running script"
    );
    let outcomes = run_script(&mut protocol, &config.addresses.deployer, &steps, fail_fast)?;
    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();

    let rendered = serde_json::to_string_pretty(&outcomes)?;
    match output {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing outcomes to {}", path.display()))?,
        None => println!("{rendered}"),
    }

    if let Some(store) = store {
        protocol.save_to_store(&store)?;
        store.flush()?;
        tracing::info!(path = %store.path().display(), "state saved");
    }
    tracing::info!(applied = outcomes.len() - failed, failed, "script finished");
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    dexf_node::init_logging(config.log_format, &config.log_level);

    match &cli.command {
        Command::Config => print!("{}", config.to_toml_string()?),
        Command::Simulate {
            script,
            output,
            fail_fast,
        } => simulate(&config, script, output.as_deref(), *fail_fast)?,
    }
    Ok(())
}
