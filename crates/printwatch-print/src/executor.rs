// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print executor — hands one document to the external print tool.
//
// The tool (SumatraPDF by default) does the actual rendering and spooling.
// We run it as a direct child process with an explicit argument list, bound
// its run time, and then wait for the spooler to stop reporting a printing
// job on the target printer before calling the document done.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, instrument, warn};

use printwatch_core::ServiceConfig;
use printwatch_core::error::{PrintwatchError, Result};

use crate::gateway::StatusGateway;
use crate::poll::{StatusPollPolicy, wait_while_printing};

/// Placeholder replaced by the printer name in the argument template.
pub const PRINTER_PLACEHOLDER: &str = "{printer}";
/// Placeholder replaced by the document path in the argument template.
pub const FILE_PLACEHOLDER: &str = "{file}";

/// Prints a single document on a named printer.
#[allow(async_fn_in_trait)]
pub trait PrintExecutor {
    /// `Ok(())` only once the document has been handed over and the printer
    /// no longer reports it as printing.
    async fn print_document(&self, document: &Path, printer: &str) -> Result<()>;
}

/// Build the print tool's arguments from the template.
///
/// Every `{printer}` and `{file}` is substituted.  A template that mentions
/// neither gets the printer name and document path appended, which is the
/// layout `-print-to <printer> <file>` expects.
pub fn build_print_args(template: &[String], printer: &str, document: &Path) -> Vec<String> {
    let file = document.to_string_lossy();
    let templated = template
        .iter()
        .any(|a| a.contains(PRINTER_PLACEHOLDER) || a.contains(FILE_PLACEHOLDER));

    let mut args: Vec<String> = template
        .iter()
        .map(|a| {
            a.replace(PRINTER_PLACEHOLDER, printer)
                .replace(FILE_PLACEHOLDER, &file)
        })
        .collect();
    if !templated {
        args.push(printer.to_string());
        args.push(file.into_owned());
    }
    args
}

/// Executor that runs the configured print tool.
#[derive(Debug, Clone)]
pub struct CommandPrintExecutor<G> {
    program: PathBuf,
    template: Vec<String>,
    timeout: Duration,
    poll: StatusPollPolicy,
    gateway: G,
}

impl<G: StatusGateway> CommandPrintExecutor<G> {
    pub fn new(config: &ServiceConfig, gateway: G) -> Self {
        Self {
            program: config.sumatra_path.clone(),
            template: config.print_command.args(),
            timeout: config.print_timeout(),
            poll: StatusPollPolicy::from_config(config),
            gateway,
        }
    }

    /// Run the print tool once, bounded by the configured timeout.
    async fn run_print_tool(&self, document: &Path, printer: &str) -> Result<()> {
        let args = build_print_args(&self.template, printer, document);
        let failed = |detail: String| PrintwatchError::PrintCommandFailed {
            document: document.display().to_string(),
            printer: printer.to_string(),
            detail,
        };

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed(format!("cannot start {}: {e}", self.program.display())))?;

        match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(failed(status.to_string())),
            Ok(Err(e)) => Err(failed(e.to_string())),
            Err(_) => {
                if let Err(e) = child.kill().await {
                    warn!(error = %e, "could not kill timed-out print tool");
                }
                Err(PrintwatchError::PrintTimeout {
                    document: document.display().to_string(),
                    printer: printer.to_string(),
                    timeout: self.timeout,
                })
            }
        }
    }
}

impl<G: StatusGateway> PrintExecutor for CommandPrintExecutor<G> {
    #[instrument(skip(self, document), fields(document = %document.display()))]
    async fn print_document(&self, document: &Path, printer: &str) -> Result<()> {
        info!("sending document to printer");
        self.run_print_tool(document, printer).await?;
        wait_while_printing(&self.gateway, printer, document, &self.poll).await
    }
}
