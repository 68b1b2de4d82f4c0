// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Printwatch.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Printwatch operations.
#[derive(Debug, Error)]
pub enum PrintwatchError {
    // -- Startup --
    #[error("invalid configuration: {0}")]
    Config(String),

    // -- System query --
    #[error("system query `{query}` failed: {detail}")]
    QueryFailed { query: String, detail: String },

    // -- Printing --
    #[error("print command for {document} on {printer} failed: {detail}")]
    PrintCommandFailed {
        document: String,
        printer: String,
        detail: String,
    },

    #[error("print of {document} on {printer} aborted after {}s", .timeout.as_secs())]
    PrintTimeout {
        document: String,
        printer: String,
        timeout: Duration,
    },

    #[error("printer {printer} still reports a printing job after {}s", .waited.as_secs())]
    StatusPollExhausted { printer: String, waited: Duration },

    // -- Storage --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PrintwatchError>;

/// Windows `ERROR_SHARING_VIOLATION`.
const WIN_SHARING_VIOLATION: i32 = 32;
/// Windows `ERROR_LOCK_VIOLATION`.
const WIN_LOCK_VIOLATION: i32 = 33;

/// Whether an I/O error means "someone else holds this file".
///
/// These are the failures the cleanup code tolerates with a warning: the
/// file stays where it is and the next poll tries again.
pub fn is_lock_conflict(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    if matches!(
        err.kind(),
        ErrorKind::PermissionDenied | ErrorKind::ResourceBusy
    ) {
        return true;
    }
    cfg!(windows)
        && matches!(
            err.raw_os_error(),
            Some(WIN_SHARING_VIOLATION | WIN_LOCK_VIOLATION)
        )
}
