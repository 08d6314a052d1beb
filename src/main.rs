// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! fitlog command-line client and API server.

use clap::Parser;
use fitlog::{
    cli::{commands, Cli, Command},
    config::Config,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let debug = cli.debug || config.debug;
    if matches!(cli.command, Command::Serve) {
        init_server_logging(debug);
        tracing::info!(port = config.port, "Starting fitlog API");
    } else {
        init_cli_logging(debug);
    }

    if let Err(e) = commands::run(cli.command, config).await {
        tracing::debug!(error = ?e, "Command failed");
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn env_filter(debug: bool) -> EnvFilter {
    let default = if debug { "fitlog=debug" } else { "fitlog=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Structured JSON logging for the server.
fn init_server_logging(debug: bool) {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(format)
        .init();
}

/// Compact logging on stderr, keeping stdout for command output.
fn init_cli_logging(debug: bool) {
    let format = tracing_subscriber::fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter(debug))
        .with(format)
        .init();
}
