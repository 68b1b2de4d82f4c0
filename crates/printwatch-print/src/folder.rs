// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Folder processor — drains one batch folder.
//
// A batch folder moves through
//
//   unassigned -> assigned -> draining -> deletable -> deleted
//
// and every transition is driven by marker files the upstream writer drops
// in (assignment marker, ready markers, deletion sentinel) or that we remove
// (ready markers, documents, the folder itself).  Nothing is remembered
// between polls: a document that failed to print still has its ready marker,
// so the next poll simply offers it again.

use std::io;
use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use printwatch_core::ServiceConfig;
use printwatch_core::error::{PrintwatchError, Result, is_lock_conflict};
use printwatch_core::types::{DELETION_SENTINEL, FolderState, is_document_name, ready_marker_name};

use crate::executor::PrintExecutor;
use crate::markers::{exists, resolve_printer, sorted_entries};

/// What one pass over a folder did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FolderReport {
    /// Documents printed and cleaned up.
    pub printed: u32,
    /// Print attempts that failed; those documents are retried next poll.
    pub failed: u32,
    /// Failures where the job reached the spooler but the printer never went
    /// idle.  Also counted in `failed`.
    pub stalled: u32,
    /// Documents without a ready marker.
    pub not_ready: u32,
    /// Documents passed over because the per-pass cap was reached.
    pub capped: u32,
    /// Folder state once the pass finished.
    pub state: FolderState,
}

impl Default for FolderReport {
    fn default() -> Self {
        Self {
            printed: 0,
            failed: 0,
            stalled: 0,
            not_ready: 0,
            capped: 0,
            state: FolderState::Assigned,
        }
    }
}

/// Classify a folder from the markers it currently holds.
pub async fn inspect_folder(folder: &Path, config: &ServiceConfig) -> Result<FolderState> {
    if !exists(folder).await {
        return Ok(FolderState::Deleted);
    }
    let ext = &config.semaphore_extension;
    if resolve_printer(folder, ext).await?.is_none() {
        return Ok(FolderState::Unassigned);
    }

    let entries = sorted_entries(folder).await?;
    if config.remove_printed_folder && sentinel_count(&entries) == 1 {
        return Ok(FolderState::Deletable);
    }
    let ready = entries.iter().any(|name| {
        is_document_name(name) && entries.binary_search(&ready_marker_name(name, ext)).is_ok()
    });
    Ok(if ready {
        FolderState::Draining
    } else {
        FolderState::Assigned
    })
}

fn sentinel_count(entries: &[String]) -> usize {
    entries.iter().filter(|n| n.as_str() == DELETION_SENTINEL).count()
}

/// Prints a folder's ready documents and cleans up after them.
pub struct FolderProcessor<E> {
    config: Arc<ServiceConfig>,
    executor: E,
}

impl<E: PrintExecutor> FolderProcessor<E> {
    pub fn new(config: Arc<ServiceConfig>, executor: E) -> Self {
        Self { config, executor }
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Print every ready document in `folder` on `printer`, in name order,
    /// then delete the folder if its sentinel says so.
    ///
    /// The cap check is `printed <= documents_to_print`, so a pass can print
    /// one document more than the configured cap.
    #[instrument(skip(self, folder), fields(folder = %folder.display()))]
    pub async fn process_folder(&self, folder: &Path, printer: &str) -> Result<FolderReport> {
        let ext = &self.config.semaphore_extension;
        let mut report = FolderReport::default();

        for name in sorted_entries(folder).await? {
            if !is_document_name(&name) {
                continue;
            }
            if report.printed > self.config.documents_to_print {
                report.capped += 1;
                continue;
            }

            let document = folder.join(&name);
            let marker = folder.join(ready_marker_name(&name, ext));
            if !exists(&marker).await {
                report.not_ready += 1;
                continue;
            }

            match self.executor.print_document(&document, printer).await {
                Ok(()) => {}
                Err(e @ PrintwatchError::StatusPollExhausted { .. }) => {
                    warn!(
                        document = %name,
                        printer,
                        error = %e,
                        "printer never went idle after the job was sent; document kept and may print again"
                    );
                    report.failed += 1;
                    report.stalled += 1;
                    continue;
                }
                Err(e) => {
                    error!(document = %name, printer, error = %e, "print failed; document kept for the next poll");
                    report.failed += 1;
                    continue;
                }
            }
            info!(document = %name, printer, "document printed");

            match tokio::fs::remove_file(&marker).await {
                Ok(()) => info!(marker = %marker.display(), "ready marker removed"),
                Err(e) => error!(marker = %marker.display(), error = %e, "could not remove ready marker"),
            }

            if self.config.remove_printed_file {
                match tokio::fs::remove_file(&document).await {
                    Ok(()) => info!(document = %document.display(), "printed document removed"),
                    Err(e) => {
                        error!(document = %document.display(), error = %e, "could not remove printed document");
                        continue;
                    }
                }
            }
            report.printed += 1;
        }

        let entries = sorted_entries(folder).await?;
        if self.config.remove_printed_folder && sentinel_count(&entries) == 1 {
            info!("folder cleared for removal after printing");
            if remove_folder(folder).await? {
                report.state = FolderState::Deleted;
                return Ok(report);
            }
        }

        report.state = inspect_folder(folder, &self.config).await?;
        Ok(report)
    }
}

/// Delete everything in `folder`, then the folder itself.
///
/// Files held open by someone else are skipped with a warning; the folder
/// then cannot be removed either and stays for the next poll.  Returns
/// whether the folder is gone.
async fn remove_folder(folder: &Path) -> Result<bool> {
    let mut entries = tokio::fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        // Does not follow symlinks: a link to a directory is unlinked, not emptied.
        if entry.file_type().await?.is_dir() {
            tokio::fs::remove_dir_all(&path).await?;
            continue;
        }
        skip_if_locked(&path, tokio::fs::remove_file(&path).await)?;
    }

    let removed = skip_if_locked(folder, tokio::fs::remove_dir_all(folder).await)?;
    if removed {
        info!(folder = %folder.display(), "folder removed after printing");
    }
    Ok(removed)
}

/// `Ok(false)` when the removal failed only because the path is in use.
fn skip_if_locked(path: &Path, removal: io::Result<()>) -> Result<bool> {
    match removal {
        Ok(()) => Ok(true),
        Err(e) if is_lock_conflict(&e) => {
            warn!(path = %path.display(), error = %e, "in use; left in place");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}
