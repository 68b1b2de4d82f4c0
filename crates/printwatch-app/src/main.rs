// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printwatch — folder-polling print dispatcher
//
// Entry point. Loads the configuration, initialises logging, and runs the
// monitor loop until Ctrl-C or SIGTERM.

mod logging;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info, warn};

use printwatch_core::ServiceConfig;
use printwatch_core::config::DEFAULT_CONFIG_FILE;
use printwatch_print::gateway::refresh_diagnostics;
use printwatch_print::{CommandPrintExecutor, Monitor, PrintExecutor, SystemQueryGateway};

#[derive(Debug, Parser)]
#[command(name = "printwatch", version, about = "Prints PDF batches dropped into numbered folders")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ServiceConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("printwatch: cannot load {}: {e}", cli.config.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&config.log_folder) {
        eprintln!(
            "printwatch: cannot open log folder {}: {e}",
            config.log_folder.display()
        );
        return ExitCode::FAILURE;
    }

    info!(version = env!("CARGO_PKG_VERSION"), "print service starting");
    info!(folder = %config.monitor_folder.display(), "monitoring folder");

    if let Err(e) = tokio::fs::create_dir_all(&config.diagnostics_folder).await {
        warn!(
            folder = %config.diagnostics_folder.display(),
            error = %e,
            "cannot create diagnostics folder"
        );
    }

    let config = Arc::new(config);
    let gateway = SystemQueryGateway::new(config.query_tool.clone());
    let executor = CommandPrintExecutor::new(&config, gateway.clone());
    let mut monitor = Monitor::new(Arc::clone(&config), executor);

    let shutdown = shutdown::shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = run_cycle(&config, &gateway, &mut monitor) => {}
        }
    }

    info!("monitoring stopped");
    ExitCode::SUCCESS
}

/// One monitor cycle: diagnostics, a sweep of the root, then the pause.
async fn run_cycle<E: PrintExecutor>(
    config: &ServiceConfig,
    gateway: &SystemQueryGateway,
    monitor: &mut Monitor<E>,
) {
    let snapshot = refresh_diagnostics(gateway, &config.diagnostics_folder).await;
    debug!(printers = ?snapshot.printers, jobs = ?snapshot.jobs, "diagnostics refreshed");

    match monitor.check_and_process_folders(&config.monitor_folder).await {
        Ok(report) => debug!(
            processed = report.processed,
            unassigned = report.unassigned,
            failed = report.failed,
            printed = report.printed,
            "cycle finished"
        ),
        Err(e) => error!(
            folder = %config.monitor_folder.display(),
            error = %e,
            "cannot list monitored folder"
        ),
    }

    tokio::time::sleep(config.poll_interval()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_flag_defaults_to_config_json() {
        let cli = Cli::try_parse_from(["printwatch"]).expect("parse");
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_FILE));
    }

    #[test]
    fn config_flag_accepts_a_path() {
        let cli = Cli::try_parse_from(["printwatch", "--config", "/etc/printwatch.json"])
            .expect("parse");
        assert_eq!(cli.config, PathBuf::from("/etc/printwatch.json"));
    }
}
