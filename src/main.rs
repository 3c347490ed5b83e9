//! Kiru - Prompt-Driven Video Editing
//!
//! Entry point: serves the HTTP API or runs one-off commands against
//! local files.

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use kiru::cli::{Args, Commands};
use kiru::config::Config;
use kiru::registry::OutputRegistry;
use kiru::server::run_server;
use kiru::timeparse;
use kiru::workflow::Workflow;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logging(args.verbose)?;

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("kiru.toml").exists() {
                info!("Found kiru.toml in current directory, loading...");
                Config::from_file("kiru.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Serve { listen } => {
            let listen = listen.unwrap_or_else(|| config.server.listen.clone());
            let addr: SocketAddr = listen
                .parse()
                .with_context(|| format!("invalid listen address '{}'", listen))?;

            let workflow = Arc::new(Workflow::new(config)?);
            run_server(workflow, addr).await?;
        }
        Commands::Process { prompt, input } => {
            let workflow = Workflow::new(config)?;
            let outcome = workflow.process(&prompt, &input).await?;

            println!("{}", outcome.narrative);
            for artifact in &outcome.artifacts {
                println!("  {}", artifact.path.display());
            }
        }
        Commands::Normalize { expression } => {
            let seconds = timeparse::normalize(&expression)?;
            println!("{}", seconds);
        }
        Commands::Outputs => {
            let registry = OutputRegistry::new(&config.output.root, &config.output.extension)?;
            let artifacts = registry.list().await?;

            if artifacts.is_empty() {
                println!("No outputs in {}", registry.root().display());
            } else {
                println!("{:<50} {:>12}", "Name", "Size (KB)");
                println!("{}", "-".repeat(63));
                for artifact in artifacts {
                    let size = tokio::fs::metadata(&artifact.path).await?.len();
                    println!("{:<50} {:>12.1}", artifact.name, size as f64 / 1024.0);
                }
            }
        }
        Commands::Config { output } => {
            config.save_to_file(&output)?;
            info!("Configuration written to {}", output.display());
        }
    }

    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".kiru").join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "kiru.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("kiru.log").display()
    );

    Ok(())
}
