// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printwatch Print — printer-status gateway, print executor, folder
// processor and monitor loop.  This crate turns the marker files dropped in
// the monitored root into print jobs, using the types and configuration
// defined in `printwatch-core`.

pub mod executor;
pub mod folder;
pub mod gateway;
pub mod markers;
pub mod monitor;
pub mod poll;

pub use executor::{CommandPrintExecutor, PrintExecutor};
pub use folder::{FolderProcessor, FolderReport};
pub use gateway::{StatusGateway, SystemQueryGateway};
pub use monitor::{CycleReport, Monitor};
