//! specgate CLI entrypoint.

use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod handlers;

use commands::{Commands, LogFormat, Overrides};

#[derive(Parser)]
#[command(name = "specgate")]
#[command(author, version, about = "OpenAPI generation, lint and breaking-change gate", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

fn init_logging(format: LogFormat, ci: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(!ci).init(),
    }
}

fn load_config(
    path: Option<&PathBuf>,
    overrides: &Overrides,
) -> Result<specgate_core::ValidationConfig, Box<dyn std::error::Error>> {
    let (path, explicit) = match path {
        Some(path) => (path.clone(), true),
        None => (PathBuf::from(config::DEFAULT_CONFIG_FILE), false),
    };
    let mut config = config::load(&path, explicit)?;
    let ci_detected = config::ci_from_env(|name| std::env::var(name).ok());
    config::apply(&mut config, overrides, ci_detected);
    Ok(config)
}

fn exit_with(code: i32) -> Result<(), Box<dyn std::error::Error>> {
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = match &cli.command {
        Commands::Init { force } => {
            init_logging(cli.log_format, false);
            return exit_with(handlers::init(*force)?);
        }
        Commands::Validate { overrides, .. }
        | Commands::Install { overrides }
        | Commands::Checksum { overrides } => overrides,
    };
    let config = load_config(cli.config.as_ref(), overrides)?;

    if config.ci {
        console::set_colors_enabled(false);
    }
    init_logging(cli.log_format, config.ci);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling running tools");
            on_signal.cancel();
        }
    });

    let code = match cli.command {
        Commands::Validate { json, .. } => handlers::validate(config, json, &cancel).await?,
        Commands::Install { .. } => handlers::install(config, &cancel).await?,
        Commands::Checksum { .. } => handlers::checksum(config, &cancel).await?,
        Commands::Init { force } => handlers::init(force)?,
    };
    exit_with(code)
}
