// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Monitor loop — one sweep over the monitored root per cycle.
//
// Every numbered subfolder with a printer assignment is handed to the folder
// processor.  Folders still waiting for their assignment are only reported,
// and those reports are rate-limited across all folders so a batch that sits
// unassigned for an hour does not flood the log every five seconds.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, instrument, warn};

use printwatch_core::ServiceConfig;
use printwatch_core::error::Result;
use printwatch_core::types::is_batch_folder_name;

use crate::executor::PrintExecutor;
use crate::folder::{FolderProcessor, FolderReport};
use crate::markers::{resolve_printer, sorted_entries};

/// Lets one event through per window.
#[derive(Debug, Clone)]
pub struct WarningRateLimiter {
    window: Duration,
    last: Option<Instant>,
}

impl WarningRateLimiter {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Whether an event at `now` may be reported; records it if so.
    pub fn allow(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.window => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Totals for one sweep of the monitored root.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Batch folders handed to the processor.
    pub processed: u32,
    /// Batch folders without a printer assignment.
    pub unassigned: u32,
    /// "No assignment" warnings actually logged.
    pub warnings: u32,
    /// Batch folders whose processing raised an error.
    pub failed: u32,
    /// Documents printed across all folders.
    pub printed: u32,
}

enum Visit {
    Skipped,
    Unassigned,
    Processed(FolderReport),
}

/// Owns the per-process scheduling state.
pub struct Monitor<E> {
    config: Arc<ServiceConfig>,
    processor: FolderProcessor<E>,
    unresolved_warnings: WarningRateLimiter,
}

impl<E: PrintExecutor> Monitor<E> {
    pub fn new(config: Arc<ServiceConfig>, executor: E) -> Self {
        let unresolved_warnings = WarningRateLimiter::new(config.unresolved_warning_window());
        Self {
            processor: FolderProcessor::new(Arc::clone(&config), executor),
            config,
            unresolved_warnings,
        }
    }

    pub fn executor(&self) -> &E {
        self.processor.executor()
    }

    /// Sweep `root` once.
    ///
    /// Only a failure to list `root` itself is returned; errors inside a
    /// folder are logged and the sweep moves on to the next one.
    #[instrument(skip(self, root), fields(root = %root.display()))]
    pub async fn check_and_process_folders(&mut self, root: &Path) -> Result<CycleReport> {
        let mut report = CycleReport::default();

        for name in sorted_entries(root).await? {
            let folder = root.join(&name);
            match self.visit(&folder, &name, &mut report).await {
                Ok(Visit::Skipped) => {}
                Ok(Visit::Unassigned) => report.unassigned += 1,
                Ok(Visit::Processed(folder_report)) => {
                    report.processed += 1;
                    report.printed += folder_report.printed;
                }
                Err(e) => {
                    report.failed += 1;
                    error!(folder = %folder.display(), error = %e, "error processing folder");
                }
            }
        }

        Ok(report)
    }

    async fn visit(&mut self, folder: &Path, name: &str, report: &mut CycleReport) -> Result<Visit> {
        let is_dir = tokio::fs::metadata(folder)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false);
        if !is_dir || !is_batch_folder_name(name) {
            return Ok(Visit::Skipped);
        }

        match resolve_printer(folder, &self.config.semaphore_extension).await? {
            Some(printer) => {
                info!(folder = %folder.display(), printer = %printer, "processing folder");
                let folder_report = self.processor.process_folder(folder, &printer).await?;
                info!(
                    folder = %folder.display(),
                    printed = folder_report.printed,
                    failed = folder_report.failed,
                    state = %folder_report.state,
                    "folder pass finished"
                );
                Ok(Visit::Processed(folder_report))
            }
            None => {
                if self.unresolved_warnings.allow(Instant::now()) {
                    warn!(folder = %folder.display(), "no valid printer assignment marker found");
                    report.warnings += 1;
                }
                Ok(Visit::Unassigned)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct RecordingExecutor {
        calls: Mutex<Vec<(PathBuf, String)>>,
    }

    impl PrintExecutor for RecordingExecutor {
        async fn print_document(&self, document: &Path, printer: &str) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push((document.to_path_buf(), printer.to_string()));
            Ok(())
        }
    }

    fn monitor(root: &Path) -> Monitor<RecordingExecutor> {
        let config = ServiceConfig {
            monitor_folder: root.to_path_buf(),
            remove_printed_file: true,
            remove_printed_folder: true,
            ..ServiceConfig::default()
        };
        Monitor::new(Arc::new(config), RecordingExecutor::default())
    }

    fn write(path: PathBuf, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn limiter_allows_one_event_per_window() {
        let mut limiter = WarningRateLimiter::new(Duration::from_secs(600));
        let t0 = Instant::now();
        assert!(limiter.allow(t0));
        assert!(!limiter.allow(t0 + Duration::from_secs(1)));
        assert!(!limiter.allow(t0 + Duration::from_secs(599)));
        assert!(limiter.allow(t0 + Duration::from_secs(600)));
        assert!(!limiter.allow(t0 + Duration::from_secs(601)));
    }

    #[tokio::test]
    async fn only_assigned_numeric_folders_are_processed() {
        let root = tempfile::tempdir().expect("tempdir");
        let r = root.path();
        write(r.join("3/printer.sem"), "HP-OFFICE\n");
        write(r.join("3/a.pdf"), "x");
        write(r.join("3/a.sem"), "");
        // No assignment marker.
        write(r.join("7/b.pdf"), "x");
        write(r.join("7/b.sem"), "");
        // Not a batch folder name.
        write(r.join("tmp/printer.sem"), "HP-OFFICE");
        write(r.join("tmp/c.pdf"), "x");
        write(r.join("tmp/c.sem"), "");
        // A numeric file, not a folder.
        write(r.join("12"), "x");

        let mut monitor = monitor(r);
        let report = monitor.check_and_process_folders(r).await.expect("sweep");

        let calls = monitor.executor().calls.lock().unwrap().clone();
        assert_eq!(calls, vec![(r.join("3/a.pdf"), "HP-OFFICE".to_string())]);
        assert_eq!(report.processed, 1);
        assert_eq!(report.unassigned, 1);
        assert_eq!(report.printed, 1);
        assert!(r.join("7/b.sem").exists());
        assert!(r.join("tmp/c.sem").exists());
    }

    #[tokio::test]
    async fn unassigned_warnings_are_rate_limited_across_folders_and_cycles() {
        let root = tempfile::tempdir().expect("tempdir");
        let r = root.path();
        for id in ["1", "2", "3"] {
            std::fs::create_dir(r.join(id)).unwrap();
        }

        let mut monitor = monitor(r);
        let first = monitor.check_and_process_folders(r).await.expect("sweep");
        let second = monitor.check_and_process_folders(r).await.expect("sweep");

        assert_eq!(first.unassigned, 3);
        assert_eq!(first.warnings + second.warnings, 1);
        assert!(monitor.executor().calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn sentinel_folder_is_removed_during_sweep() {
        let root = tempfile::tempdir().expect("tempdir");
        let r = root.path();
        write(r.join("4/printer.sem"), "HP-OFFICE");
        write(r.join("4/deletar.del"), "");
        write(r.join("4/notes.txt"), "x");

        let mut monitor = monitor(r);
        monitor.check_and_process_folders(r).await.expect("sweep");

        assert!(!r.join("4").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn broken_folder_does_not_stop_the_sweep() {
        let root = tempfile::tempdir().expect("tempdir");
        let r = root.path();
        // A directory where the assignment marker should be makes it unreadable.
        std::fs::create_dir_all(r.join("1/printer.sem")).unwrap();
        write(r.join("2/printer.sem"), "HP-OFFICE");
        write(r.join("2/a.pdf"), "x");
        write(r.join("2/a.sem"), "");

        let mut monitor = monitor(r);
        let report = monitor.check_and_process_folders(r).await.expect("sweep");

        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 1);
        assert_eq!(monitor.executor().calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let root = tempfile::tempdir().expect("tempdir");
        let mut monitor = monitor(root.path());
        assert!(
            monitor
                .check_and_process_folders(&root.path().join("gone"))
                .await
                .is_err()
        );
    }
}
