//! JSON file source: a single array of messages.
//!
//! ```json
//! [{"id": "m1", "content": "Great news!", "sender": "alice@example.com"}]
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SourceError;
use crate::pipeline::types::{Message, MessageSource};

/// Reads messages from a JSON array, keeping file order.
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MessageSource for JsonFileSource {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.clone(),
                source,
            })?;

        let messages: Vec<Message> =
            serde_json::from_str(&raw).map_err(|e| SourceError::Parse {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;

        debug!(path = %self.path.display(), count = messages.len(), "Loaded messages");
        Ok(messages)
    }
}
