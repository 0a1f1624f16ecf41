// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stapeldruck: batch print a folder through the OS print spooler
//
// Entry point. Initialises logging, parses the command line, and runs the
// chosen subcommand.

mod cli;
mod commands;
mod services;

use std::process::ExitCode;

use clap::Parser;
use stapeldruck_core::error::StapeldruckError;
use stapeldruck_core::human_errors::{Severity, humanize_error};

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Stapeldruck starting");

    match commands::run(cli).await {
        Ok(code) => code,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

/// Operator mistakes are warnings; everything else is logged as an error.
fn report(err: &StapeldruckError) {
    let human = humanize_error(err);
    if err.is_operator_error() || human.severity == Severity::ActionRequired {
        eprintln!("warning: {}", human.message);
    } else {
        tracing::error!(error = %err, "command failed");
        eprintln!("error: {}", human.message);
    }
    eprintln!("  {}", human.suggestion);
}
