mod cli;
mod config;
mod output;

use std::process;

use anyhow::Context;
use clap::Parser;
#[cfg(feature = "colored-output")]
use colored::*;
use stream_resolver::{Resolver, StreamMap};
use tracing::{Level, error};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::cli::{Args, OutputFormat};
use crate::config::{AppConfig, resolve_options};
use crate::output::OutputManager;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let format = args.output;

    if let Err(e) = run(args).await {
        match format {
            OutputFormat::Json | OutputFormat::JsonCompact => {
                let error_json = serde_json::json!({
                    "status": "error",
                    "message": format!("{e:#}"),
                });
                println!("{error_json}");
            }
            OutputFormat::Pretty => {
                error!("Application error: {:#}", e);
                #[cfg(feature = "colored-output")]
                {
                    eprintln!("{} {:#}", "Error:".red().bold(), e);
                }
                #[cfg(not(feature = "colored-output"))]
                {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    init_logging(args.verbose, args.quiet)?;

    let config = AppConfig::load(args.config.as_deref())?;
    let options = resolve_options(&args, &config);

    let resolver = Resolver::with_default_client().context("Failed to create HTTP client")?;

    let streams: StreamMap = resolver
        .resolve(&args.url, &options)
        .await
        .with_context(|| format!("Failed to resolve streams for URL: {}", args.url))?;

    let colored = config.output.colored && !args.no_color;
    let output = OutputManager::new(colored).format_streams(&streams, args.output)?;
    println!("{output}");
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(verbose)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialise logging")?;
    Ok(())
}
