// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanwerk: document photo scanner.
//
// Entry point. Initialises logging, parses the command line, and runs the
// chosen subcommand. Exit status is non-zero if any file failed.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use scanwerk_core::human_errors::humanize_error;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "scanwerk starting");

    let result = match &cli.command {
        Commands::Scan(args) => commands::run_scan(args).await.map(|summary| summary.succeeded()),
        Commands::Config(args) => commands::run_config(args).map(|()| true),
        Commands::List(args) => commands::run_list(args).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!(error = %e, "scanwerk failed");
            let human = humanize_error(&e);
            eprintln!("error: {}", human.message);
            eprintln!("  {}", human.suggestion);
            ExitCode::from(2)
        }
    }
}
