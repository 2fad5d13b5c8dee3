//! Ferry CLI - keep downstream forks synchronized with their upstreams.

use std::path::Path;

use anyhow::{Context, Result, bail};
use clap::Parser;
use ferry_core::Config;
use ferry_core::config::DEFAULT_CONFIG_FILE;
use ferry_git::CancelToken;

mod commands;
mod logging;
mod output;
mod prompt;
mod services;

use commands::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_level, cli.log_format);
    output::set_quiet(cli.quiet);

    if let Err(e) = run(cli) {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let cancel = CancelToken::new();
    let signals = tokio::runtime::Runtime::new().context("failed to start signal handler")?;
    let token = cancel.clone();
    signals.spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, stopping at the next command boundary");
            token.cancel();
        }
    });

    match cli.command {
        Commands::Monorepo(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::monorepo::run(&args, config, cancel)
        }
        Commands::Mirror(args) => {
            let config = load_config(cli.config.as_deref())?;
            commands::mirror::run(&args, &config, cancel)
        }
        Commands::Completions { shell } => commands::completions::run(shell),
    }
}

/// Load `path`, or `ferry.toml` when present, or the defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(path) if !path.exists() => bail!("config file {} does not exist", path.display()),
        Some(path) => path,
        None => Path::new(DEFAULT_CONFIG_FILE),
    };
    let config = Config::load(path).with_context(|| format!("cannot load {}", path.display()))?;
    tracing::debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}
