//! Rule engine driven by JSON lines.
//!
//! Each line read from stdin is a request such as
//! `{"operation": "create_rule", "rule": "age > 30"}`; each answer is written to stdout as one
//! line `{"status": 200, "body": {...}}`. Logs go to stderr.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use rule_tree::{
    config::{LogFormat, LoggingConfig},
    EngineConfig, RuleService,
};
use std::{
    io::{self, BufRead, Write},
    path::PathBuf,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "rule-engine")]
#[command(about = "Create, evaluate, edit and store boolean rules over JSON lines", version)]
struct Args {
    /// Configuration file; `RULE_ENGINE_*` environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = EngineConfig::load(args.config.as_deref())
        .context("failed to load the configuration")?;
    init_logging(&config.logging)?;

    let store = config
        .store
        .open()
        .context("failed to open the rule store")?;
    let service = RuleService::new(store);
    info!(rules = service.store().len(), "rule engine ready");

    let mut stdout = io::stdout().lock();
    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read a request")?;
        if line.trim().is_empty() {
            continue;
        }

        let response = service.handle_line(&line);
        serde_json::to_writer(&mut stdout, &response).context("failed to write a response")?;
        writeln!(stdout)?;
        stdout.flush()?;
    }

    Ok(())
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("invalid log level")?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.try_init(),
    }
    .map_err(|error| anyhow!("failed to initialize logging: {error}"))
}
