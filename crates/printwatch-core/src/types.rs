// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Printwatch dispatcher.
//
// Batch folders coordinate with their upstream writer purely through marker
// files; the names below are that contract.

use serde::{Deserialize, Serialize};

/// Base name of the marker that names a folder's printer.
pub const ASSIGNMENT_MARKER_STEM: &str = "printer";

/// File whose presence allows a drained folder to be deleted.
pub const DELETION_SENTINEL: &str = "deletar.del";

/// Suffix of printable documents (case-sensitive).
pub const DOCUMENT_SUFFIX: &str = ".pdf";

/// Job status text meaning the printer is still busy with a job.
pub const PRINTING_STATUS: &str = "Printing";

/// Batch folders are named by a non-empty run of ASCII digits.
pub fn is_batch_folder_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| b.is_ascii_digit())
}

/// Whether a folder entry is a printable document.
pub fn is_document_name(name: &str) -> bool {
    name.ends_with(DOCUMENT_SUFFIX)
}

/// `printer<ext>`.
pub fn assignment_marker_name(extension: &str) -> String {
    format!("{ASSIGNMENT_MARKER_STEM}{extension}")
}

/// Ready marker for a document: its name minus the final extension, plus
/// the marker extension. `a.b.pdf` pairs with `a.b<ext>`.
pub fn ready_marker_name(document: &str, extension: &str) -> String {
    let stem = match document.rfind('.') {
        Some(0) | None => document,
        Some(idx) => &document[..idx],
    };
    format!("{stem}{extension}")
}

/// One row of the system's print job listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobRecord {
    /// Document title as reported by the spooler.
    pub document: String,
    /// Job name, which embeds the printer name.
    pub name: String,
    /// Free-form status text, e.g. `Printing`.
    pub status: String,
}

impl PrintJobRecord {
    pub fn is_printing(&self) -> bool {
        self.status.contains(PRINTING_STATUS)
    }
}

impl std::fmt::Display for PrintJobRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}\t{}", self.document, self.name, self.status)
    }
}

/// Lifecycle of a batch folder, derived from which markers exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FolderState {
    /// No printer assignment yet; the folder is left alone.
    Unassigned,
    /// Printer known, nothing ready to print.
    Assigned,
    /// At least one document has its ready marker.
    Draining,
    /// Folder deletion is enabled and exactly one sentinel is present.
    Deletable,
    /// The folder is gone.
    Deleted,
}

impl std::fmt::Display for FolderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Unassigned => "unassigned",
            Self::Assigned => "assigned",
            Self::Draining => "draining",
            Self::Deletable => "deletable",
            Self::Deleted => "deleted",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_folder_names_are_all_digits() {
        assert!(is_batch_folder_name("3"));
        assert!(is_batch_folder_name("0042"));
        assert!(!is_batch_folder_name(""));
        assert!(!is_batch_folder_name("3a"));
        assert!(!is_batch_folder_name("-3"));
        assert!(!is_batch_folder_name("tmp"));
    }

    #[test]
    fn ready_marker_drops_final_extension_only() {
        assert_eq!(ready_marker_name("a.pdf", ".sem"), "a.sem");
        assert_eq!(ready_marker_name("report.v2.pdf", ".sem"), "report.v2.sem");
    }

    #[test]
    fn documents_match_lowercase_suffix_only() {
        assert!(is_document_name("a.pdf"));
        assert!(!is_document_name("a.PDF"));
        assert!(!is_document_name("a.pdf.sem"));
    }

    #[test]
    fn printing_status_is_substring_match() {
        let job = PrintJobRecord {
            document: "a.pdf".into(),
            name: "HP-OFFICE, 12".into(),
            status: "Spooling | Printing".into(),
        };
        assert!(job.is_printing());
        assert_eq!(job.to_string(), "a.pdf\tHP-OFFICE, 12\tSpooling | Printing");
    }
}
