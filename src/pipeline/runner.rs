//! Pipeline runner: fetch → organize → report.
//!
//! Owns no classification or bucketing logic. Only run-level failures
//! (fetch, report) surface as `PipelineError`.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::pipeline::organizer::Organizer;
use crate::pipeline::types::{MessageSource, Reporter, RunReport};

/// Composes a message source, the organizer, and any number of reporters.
pub struct PipelineRunner {
    source: Arc<dyn MessageSource>,
    organizer: Organizer,
    reporters: Vec<Arc<dyn Reporter>>,
}

impl PipelineRunner {
    pub fn new(source: Arc<dyn MessageSource>, organizer: Organizer) -> Self {
        Self {
            source,
            organizer,
            reporters: Vec::new(),
        }
    }

    /// Add a reporter that receives every finished run.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporters.push(reporter);
        self
    }

    /// Run the pipeline to completion.
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        self.run_until(&CancellationToken::new()).await
    }

    /// Run the pipeline; `cancel` stops classification dispatch early.
    ///
    /// A cancelled run still reports and returns its partial result.
    pub async fn run_until(&self, cancel: &CancellationToken) -> Result<RunReport, PipelineError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(%run_id, source = self.source.name(), "Pipeline run started");

        let messages = self.source.fetch_messages().await.map_err(|e| {
            error!(%run_id, error = %e, "Fetch failed, aborting run");
            PipelineError::Fetch(e)
        })?;
        info!(%run_id, count = messages.len(), "Fetched messages");

        let outcome = self.organizer.organize_until(&messages, cancel).await;

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            total_messages: messages.len(),
            cancelled: cancel.is_cancelled(),
            buckets: outcome.store,
            failures: outcome.failures,
            skipped: outcome.skipped,
            duplicates: outcome.duplicates,
        };

        let results = join_all(self.reporters.iter().map(|r| r.report(&report))).await;
        for (reporter, result) in self.reporters.iter().zip(results) {
            if let Err(e) = result {
                error!(%run_id, reporter = reporter.name(), error = %e, "Reporter failed");
                return Err(PipelineError::Report(e));
            }
        }

        info!(
            %run_id,
            buckets = report.buckets.bucket_count(),
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled,
            "Pipeline run complete"
        );
        Ok(report)
    }
}
