//! JSON file reporter: persists each run report.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use crate::error::ReportError;
use crate::pipeline::types::{Reporter, RunReport};

const NAME: &str = "json-file";

/// Writes the run report as pretty JSON, replacing the file atomically.
pub struct JsonFileReporter {
    path: PathBuf,
}

impl JsonFileReporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> ReportError {
        ReportError::Io {
            name: NAME.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }
}

#[async_trait]
impl Reporter for JsonFileReporter {
    fn name(&self) -> &str {
        NAME
    }

    async fn report(&self, report: &RunReport) -> Result<(), ReportError> {
        let json = serde_json::to_vec_pretty(report)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(parent, e))?;
        }

        // Write-then-rename so readers never see a half-written report
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &json)
            .await
            .map_err(|e| self.io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(&self.path, e))?;

        info!(path = %self.path.display(), bytes = json.len(), "Wrote run report");
        Ok(())
    }
}
