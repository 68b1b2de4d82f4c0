// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bounded wait for a printer to finish its current job.
//
// After the print tool exits, the spooler may still be feeding the job to
// the device.  We keep asking the status gateway until no job for the
// printer reports `Printing`, backing off exponentially up to a cap, and
// give up once the total wait exceeds the policy's bound.

use std::path::Path;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use printwatch_core::ServiceConfig;
use printwatch_core::error::{PrintwatchError, Result};
use printwatch_core::types::PRINTING_STATUS;

use crate::gateway::StatusGateway;

/// Backoff policy for the printer busy-wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPollPolicy {
    /// Delay before the first re-check.
    pub interval: Duration,
    /// Upper bound for a single delay.
    pub max_interval: Duration,
    /// Total time after which the wait is abandoned.
    pub max_duration: Duration,
}

impl Default for StatusPollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_interval: Duration::from_secs(5),
            max_duration: Duration::from_secs(900),
        }
    }
}

impl StatusPollPolicy {
    pub fn from_config(config: &ServiceConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.status_poll_interval_secs),
            max_interval: Duration::from_secs(config.status_poll_max_interval_secs),
            max_duration: Duration::from_secs(config.status_poll_max_secs),
        }
    }

    /// delay = min(interval * 2^attempt, max_interval)
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.interval.as_millis() as u64;
        let exp_ms = base_ms.saturating_mul(1u64 << attempt.min(10));
        Duration::from_millis(exp_ms.min(self.max_interval.as_millis() as u64))
    }
}

/// Wait until `printer` has no job in the printing state.
///
/// A failed status query counts as "not printing": the query tool reports
/// nothing useful in that case and blocking the whole service on it would
/// be worse than moving on.
pub async fn wait_while_printing<G: StatusGateway>(
    gateway: &G,
    printer: &str,
    document: &Path,
    policy: &StatusPollPolicy,
) -> Result<()> {
    let started = Instant::now();
    let mut attempt = 0u32;

    loop {
        let busy = match gateway.printer_job_statuses(printer).await {
            Ok(statuses) => statuses.iter().any(|s| s.contains(PRINTING_STATUS)),
            Err(e) => {
                warn!(printer, error = %e, "job status query failed; assuming printer is idle");
                false
            }
        };
        if !busy {
            debug!(printer, attempt, "printer idle");
            return Ok(());
        }

        let waited = started.elapsed();
        if waited >= policy.max_duration {
            return Err(PrintwatchError::StatusPollExhausted {
                printer: printer.to_string(),
                waited,
            });
        }

        info!(
            document = %document.display(),
            printer,
            "waiting for the printer to finish"
        );
        let delay = policy.delay(attempt).min(policy.max_duration - waited);
        tokio::time::sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
