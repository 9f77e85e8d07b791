//! Reporters: where a finished run goes.

pub mod file;
pub mod http;

pub use file::JsonFileReporter;
pub use http::{SharedReport, report_routes};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::ReportError;
use crate::pipeline::types::{Reporter, RunReport};

/// Logs a per-bucket summary of each run via `tracing`.
pub struct LogReporter;

#[async_trait]
impl Reporter for LogReporter {
    fn name(&self) -> &str {
        "log"
    }

    async fn report(&self, report: &RunReport) -> Result<(), ReportError> {
        let elapsed_ms = (report.finished_at - report.started_at).num_milliseconds();
        info!(
            run_id = %report.run_id,
            total = report.total_messages,
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            duplicates = report.duplicates.len(),
            cancelled = report.cancelled,
            elapsed_ms,
            "Run finished"
        );

        for (bucket, ids) in report.buckets.buckets() {
            info!(bucket = %bucket, count = ids.len(), "Bucket");
        }

        for failure in &report.failures {
            warn!(
                message_id = %failure.message_id,
                kind = failure.kind.label(),
                attempts = failure.attempts,
                reason = %failure.reason,
                "Message left unclassified"
            );
        }

        Ok(())
    }
}
