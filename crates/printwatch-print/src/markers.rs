// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Marker-file lookups shared by the folder processor and the monitor loop.

use std::io::ErrorKind;
use std::path::Path;

use tracing::warn;

use printwatch_core::error::Result;
use printwatch_core::types::assignment_marker_name;

/// Names of a directory's entries in lexicographic order.
///
/// Entries whose names are not valid UTF-8 cannot be matched against any
/// marker and are left out with a warning.
pub async fn sorted_entries(dir: &Path) -> Result<Vec<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        match entry.file_name().into_string() {
            Ok(name) => names.push(name),
            Err(raw) => warn!(dir = %dir.display(), name = ?raw, "skipping entry with a non-UTF-8 name"),
        }
    }
    names.sort_unstable();
    Ok(names)
}

/// Whether `path` exists; lookup errors count as absent.
pub async fn exists(path: &Path) -> bool {
    tokio::fs::try_exists(path).await.unwrap_or(false)
}

/// Printer named by the folder's assignment marker.
///
/// `None` when the marker is missing or holds only whitespace.
pub async fn resolve_printer(folder: &Path, extension: &str) -> Result<Option<String>> {
    let marker = folder.join(assignment_marker_name(extension));
    match tokio::fs::read_to_string(&marker).await {
        Ok(content) => {
            let printer = content.trim();
            Ok((!printer.is_empty()).then(|| printer.to_string()))
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
