// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Service configuration, read once at startup from a JSON file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PrintwatchError, Result};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Argument template for the print tool.
///
/// A plain string is split on whitespace; a list is used verbatim, which is
/// the only way to pass an argument that itself contains spaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrintCommand {
    Line(String),
    Args(Vec<String>),
}

impl PrintCommand {
    /// The template as an argument list.
    pub fn args(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(String::from).collect(),
            Self::Args(args) => args.clone(),
        }
    }
}

impl Default for PrintCommand {
    fn default() -> Self {
        Self::Line("-print-to".into())
    }
}

/// Immutable service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Directory holding the rotating log file.
    pub log_folder: PathBuf,
    /// Extension shared by the assignment and ready markers (with the dot).
    pub semaphore_extension: String,
    /// Delete each document once it has printed.
    pub remove_printed_file: bool,
    /// Delete the whole folder once the deletion sentinel shows up.
    pub remove_printed_folder: bool,
    /// Per-folder, per-invocation document cap.
    pub documents_to_print: u32,
    /// Print tool executable.
    pub sumatra_path: PathBuf,
    /// Argument template for the print tool (`{printer}`, `{file}`).
    pub print_command: PrintCommand,
    /// Bound on the print tool's run time, in seconds.
    pub print_timeout: u64,
    /// Root directory whose numbered subfolders are watched.
    pub monitor_folder: PathBuf,
    /// Sleep between cycles, in seconds.
    pub poll_interval_secs: u64,
    /// First wait while a printer still reports a printing job, in seconds.
    pub status_poll_interval_secs: u64,
    /// Cap for the backed-off wait, in seconds.
    pub status_poll_max_interval_secs: u64,
    /// Give up waiting for the printer after this many seconds.
    pub status_poll_max_secs: u64,
    /// Minimum spacing of "no assignment marker" warnings, in seconds.
    pub unresolved_warning_secs: u64,
    /// Where `printers.txt` and `printing_files.txt` are written.
    pub diagnostics_folder: PathBuf,
    /// System query executable used for printer and job status.
    pub query_tool: PathBuf,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_folder: PathBuf::from("logs"),
            semaphore_extension: ".sem".into(),
            remove_printed_file: false,
            remove_printed_folder: false,
            documents_to_print: 5,
            sumatra_path: PathBuf::from("SumatraPDF.exe"),
            print_command: PrintCommand::default(),
            print_timeout: 60,
            monitor_folder: PathBuf::new(),
            poll_interval_secs: 5,
            status_poll_interval_secs: 5,
            status_poll_max_interval_secs: 5,
            status_poll_max_secs: 900,
            unresolved_warning_secs: 600,
            diagnostics_folder: PathBuf::from("."),
            query_tool: PathBuf::from("wmic"),
        }
    }
}

impl ServiceConfig {
    /// Read, parse and validate the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|e| {
            PrintwatchError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&data)
    }

    /// Parse and validate a configuration document.
    pub fn from_json(data: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.monitor_folder.as_os_str().is_empty() {
            return Err(PrintwatchError::Config("monitor_folder is required".into()));
        }
        if !self.semaphore_extension.starts_with('.') || self.semaphore_extension.len() < 2 {
            return Err(PrintwatchError::Config(format!(
                "semaphore_extension must look like \".sem\", got {:?}",
                self.semaphore_extension
            )));
        }
        for (name, value) in [
            ("print_timeout", self.print_timeout),
            ("poll_interval_secs", self.poll_interval_secs),
            ("status_poll_interval_secs", self.status_poll_interval_secs),
        ] {
            if value == 0 {
                return Err(PrintwatchError::Config(format!("{name} must be positive")));
            }
        }
        if self.status_poll_max_interval_secs < self.status_poll_interval_secs {
            return Err(PrintwatchError::Config(
                "status_poll_max_interval_secs is below status_poll_interval_secs".into(),
            ));
        }
        Ok(())
    }

    pub fn print_timeout(&self) -> Duration {
        Duration::from_secs(self.print_timeout)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn unresolved_warning_window(&self) -> Duration {
        Duration::from_secs(self.unresolved_warning_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_key_set_parses() {
        let config = ServiceConfig::from_json(
            r#"{
                "log_folder": "C:\\printwatch\\logs",
                "semaphore_extension": ".sem",
                "remove_printed_file": true,
                "remove_printed_folder": true,
                "documents_to_print": 10,
                "sumatra_path": "C:\\SumatraPDF\\SumatraPDF.exe",
                "print_command": "-silent -print-to",
                "print_timeout": 120,
                "monitor_folder": "D:\\spool"
            }"#,
        )
        .expect("parse");

        assert!(config.remove_printed_file);
        assert_eq!(config.documents_to_print, 10);
        assert_eq!(config.print_command.args(), vec!["-silent", "-print-to"]);
        assert_eq!(config.print_timeout(), Duration::from_secs(120));
        // Keys the file leaves out fall back to defaults.
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.unresolved_warning_window(), Duration::from_secs(600));
    }

    #[test]
    fn print_command_accepts_argument_list() {
        let config = ServiceConfig::from_json(
            r#"{"monitor_folder": "/spool", "print_command": ["-print-to", "{printer}", "-print-settings", "fit, 2x", "{file}"]}"#,
        )
        .expect("parse");
        assert_eq!(
            config.print_command.args(),
            vec!["-print-to", "{printer}", "-print-settings", "fit, 2x", "{file}"]
        );
    }

    #[test]
    fn missing_monitor_folder_is_rejected() {
        let err = ServiceConfig::from_json("{}").unwrap_err();
        assert!(matches!(err, PrintwatchError::Config(_)));
    }

    #[test]
    fn extension_without_dot_is_rejected() {
        let err = ServiceConfig::from_json(r#"{"monitor_folder": "/spool", "semaphore_extension": "sem"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("semaphore_extension"));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ServiceConfig::from_json(r#"{"monitor_folder": "/spool", "print_timeout": 0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("print_timeout"));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, r#"{"monitor_folder": "/spool"}"#).expect("write");
        let config = ServiceConfig::load(&path).expect("load");
        assert_eq!(config.monitor_folder, PathBuf::from("/spool"));
    }

    #[test]
    fn load_of_missing_file_is_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = ServiceConfig::load(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, PrintwatchError::Config(_)));
    }
}
