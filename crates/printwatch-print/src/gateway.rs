// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printer-status gateway.
//
// Asks the operating system which printers are installed and which jobs are
// in flight.  The production implementation shells out to the system
// management query tool (`wmic` on Windows) with an explicit argument list
// and parses its fixed-width tabular output.  Besides feeding the print
// executor's busy-wait, the results are dumped to two flat files every cycle
// so an operator can see what the spooler is doing.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, error, instrument};

use printwatch_core::error::{PrintwatchError, Result};
use printwatch_core::types::PrintJobRecord;

/// Diagnostics file listing installed printers, one per line.
pub const PRINTERS_FILE: &str = "printers.txt";

/// Diagnostics file listing print jobs, one record per line.
pub const PRINT_JOBS_FILE: &str = "printing_files.txt";

/// Read-only view of the system's printers and print jobs.
#[allow(async_fn_in_trait)]
pub trait StatusGateway {
    /// Names of every installed printer.
    async fn list_printers(&self) -> Result<Vec<String>>;

    /// Every print job currently known to the spooler.
    async fn list_print_jobs(&self) -> Result<Vec<PrintJobRecord>>;

    /// Status text of each job whose name mentions `printer`.
    async fn printer_job_statuses(&self, printer: &str) -> Result<Vec<String>>;
}

/// Gateway backed by the system management query tool.
#[derive(Debug, Clone)]
pub struct SystemQueryGateway {
    tool: PathBuf,
}

impl SystemQueryGateway {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self { tool: tool.into() }
    }

    /// Run the query tool and return its stdout.
    #[instrument(skip(self), fields(tool = %self.tool.display()))]
    async fn query(&self, args: &[String]) -> Result<String> {
        let query = args.join(" ");
        let output = Command::new(&self.tool)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| PrintwatchError::QueryFailed {
                query: query.clone(),
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PrintwatchError::QueryFailed {
                query,
                detail: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        debug!(bytes = output.stdout.len(), "query completed");
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl StatusGateway for SystemQueryGateway {
    async fn list_printers(&self) -> Result<Vec<String>> {
        let out = self.query(&args(&["printer", "get", "Name"])).await?;
        Ok(parse_printer_table(&out))
    }

    async fn list_print_jobs(&self) -> Result<Vec<PrintJobRecord>> {
        let out = self
            .query(&args(&["printjob", "get", "Document,JobStatus,Name"]))
            .await?;
        Ok(parse_job_table(&out))
    }

    async fn printer_job_statuses(&self, printer: &str) -> Result<Vec<String>> {
        // WQL string literal; a quote in the printer name must not end it.
        let filter = format!("name like '%{}%'", printer.replace('\'', "\\'"));
        let query = vec![
            "printjob".to_string(),
            "where".to_string(),
            filter,
            "get".to_string(),
            "JobStatus".to_string(),
        ];
        let out = self.query(&query).await?;
        Ok(parse_table(&out)
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next())
            .collect())
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

// -- Tabular output ---------------------------------------------------------

/// Fixed-width table as printed by the query tool.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Index of a column by header, ignoring case.
    pub fn column(&self, header: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(header))
    }
}

/// Parse fixed-width tabular text.
///
/// The first non-blank line is the header row.  Each header word marks where
/// its column starts; data rows are cut at those offsets and trimmed.  Blank
/// rows are dropped.  Offsets are counted in characters, not bytes, so
/// document titles with accents stay aligned.
pub fn parse_table(output: &str) -> Table {
    let mut lines = output
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.trim().is_empty());

    let Some(header) = lines.next() else {
        return Table::default();
    };

    let header: Vec<char> = header.chars().collect();
    let mut starts = Vec::new();
    for (i, c) in header.iter().enumerate() {
        if !c.is_whitespace() && (i == 0 || header[i - 1].is_whitespace()) {
            starts.push(i);
        }
    }
    let headers = starts
        .iter()
        .enumerate()
        .map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(header.len());
            header[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect();

    let rows = lines
        .map(|line| {
            let chars: Vec<char> = line.chars().collect();
            starts
                .iter()
                .enumerate()
                .map(|(n, &start)| {
                    // The last column runs to the end of the line.
                    let end = match starts.get(n + 1) {
                        Some(&next) => next.min(chars.len()),
                        None => chars.len(),
                    };
                    let start = start.min(end);
                    chars[start..end].iter().collect::<String>().trim().to_string()
                })
                .collect()
        })
        .collect();

    Table { headers, rows }
}

/// Printer names from `printer get Name` output.
pub fn parse_printer_table(output: &str) -> Vec<String> {
    parse_table(output)
        .rows
        .into_iter()
        .filter_map(|row| row.into_iter().next())
        .filter(|name| !name.is_empty())
        .collect()
}

/// Job records from `printjob get Document,JobStatus,Name` output.
///
/// Columns are looked up by header so the tool's column order does not
/// matter; a missing column yields empty cells.
pub fn parse_job_table(output: &str) -> Vec<PrintJobRecord> {
    let table = parse_table(output);
    let document = table.column("Document");
    let status = table.column("JobStatus");
    let name = table.column("Name");

    let cell = |row: &[String], idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    table
        .rows
        .iter()
        .map(|row| PrintJobRecord {
            document: cell(row, document),
            name: cell(row, name),
            status: cell(row, status),
        })
        .collect()
}

// -- Diagnostics dump -------------------------------------------------------

/// What a diagnostics refresh managed to write.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiagnosticsSnapshot {
    /// Printers written, or `None` if the query failed.
    pub printers: Option<usize>,
    /// Jobs written, or `None` if the query failed.
    pub jobs: Option<usize>,
}

/// Rewrite `printers.txt` and `printing_files.txt` under `dir`.
///
/// A failed query leaves its file as it was; the next cycle tries again.
pub async fn refresh_diagnostics<G: StatusGateway>(gateway: &G, dir: &Path) -> DiagnosticsSnapshot {
    let mut snapshot = DiagnosticsSnapshot::default();

    match gateway.list_printers().await {
        Ok(printers) => {
            let body: String = printers.iter().map(|p| format!("{p}\n")).collect();
            match tokio::fs::write(dir.join(PRINTERS_FILE), body).await {
                Ok(()) => snapshot.printers = Some(printers.len()),
                Err(e) => error!(error = %e, "could not write printer list"),
            }
        }
        Err(e) => error!(error = %e, "could not list printers"),
    }

    match gateway.list_print_jobs().await {
        Ok(jobs) => {
            let body: String = jobs.iter().map(|j| format!("{j}\n")).collect();
            match tokio::fs::write(dir.join(PRINT_JOBS_FILE), body).await {
                Ok(()) => snapshot.jobs = Some(jobs.len()),
                Err(e) => error!(error = %e, "could not write print job list"),
            }
        }
        Err(e) => error!(error = %e, "could not list print jobs"),
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRINTERS: &str = "Name                           \r\r\n\
                            HP-OFFICE                      \r\r\n\
                            Microsoft Print to PDF         \r\r\n\
                            \r\r\n";

    #[test]
    fn printer_table_drops_header_and_blank_rows() {
        assert_eq!(
            parse_printer_table(PRINTERS),
            vec!["HP-OFFICE", "Microsoft Print to PDF"]
        );
    }

    #[test]
    fn job_table_splits_fixed_width_columns() {
        let jobs = parse_job_table(
            "Document     JobStatus          Name            \r\n\
             a.pdf        Printing           HP-OFFICE, 12   \r\n\
             b.pdf        Spooling           HP-OFFICE, 13   \r\n",
        );
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].document, "a.pdf");
        assert_eq!(jobs[0].status, "Printing");
        assert_eq!(jobs[0].name, "HP-OFFICE, 12");
        assert!(!jobs[1].is_printing());
    }

    #[test]
    fn job_columns_found_by_header_in_any_order() {
        let jobs = parse_job_table(
            "Name            JobStatus   Document\n\
             HP-OFFICE, 12   Printing    a.pdf\n",
        );
        assert_eq!(jobs[0].document, "a.pdf");
        assert_eq!(jobs[0].name, "HP-OFFICE, 12");
    }

    #[test]
    fn short_rows_yield_empty_cells() {
        let table = parse_table("JobStatus   Name\nPrinting\n");
        assert_eq!(table.rows, vec![vec!["Printing".to_string(), String::new()]]);
    }

    #[test]
    fn empty_output_is_empty_table() {
        assert_eq!(parse_table(""), Table::default());
        assert!(parse_job_table("\r\n\r\n").is_empty());
    }

    #[test]
    fn accented_titles_stay_aligned() {
        let jobs = parse_job_table(
            "Document     JobStatus\n\
             relatório    Printing\n",
        );
        assert_eq!(jobs[0].document, "relatório");
        assert_eq!(jobs[0].status, "Printing");
    }

    struct FailingGateway;

    impl StatusGateway for FailingGateway {
        async fn list_printers(&self) -> Result<Vec<String>> {
            Err(PrintwatchError::QueryFailed {
                query: "printer get Name".into(),
                detail: "tool missing".into(),
            })
        }

        async fn list_print_jobs(&self) -> Result<Vec<PrintJobRecord>> {
            Ok(vec![PrintJobRecord {
                document: "a.pdf".into(),
                name: "HP-OFFICE, 1".into(),
                status: "Printing".into(),
            }])
        }

        async fn printer_job_statuses(&self, _printer: &str) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn failed_query_leaves_previous_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(PRINTERS_FILE), "OLD-PRINTER\n").expect("seed");

        let snapshot = refresh_diagnostics(&FailingGateway, dir.path()).await;

        assert_eq!(snapshot.printers, None);
        assert_eq!(snapshot.jobs, Some(1));
        let printers = std::fs::read_to_string(dir.path().join(PRINTERS_FILE)).expect("read");
        assert_eq!(printers, "OLD-PRINTER\n");
        let jobs = std::fs::read_to_string(dir.path().join(PRINT_JOBS_FILE)).expect("read");
        assert_eq!(jobs, "a.pdf\tHP-OFFICE, 1\tPrinting\n");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_tool_is_query_failure() {
        let gateway = SystemQueryGateway::new("/nonexistent/query-tool");
        let err = gateway.list_printers().await.unwrap_err();
        assert!(matches!(err, PrintwatchError::QueryFailed { .. }));
    }
}
