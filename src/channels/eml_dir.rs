//! Maildir-style source: a directory of `.eml` files.
//!
//! Files are read in file-name order so the batch order is stable across
//! runs. The message ID is the `Message-ID` header, or the file stem when
//! the header is missing. Unparsable files are skipped with a warning; an
//! unreadable directory fails the fetch.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::DateTime;
use mail_parser::MessageParser;
use tracing::{debug, warn};

use super::email_text::{compose_content, strip_html, strip_quoted_text};
use crate::error::SourceError;
use crate::pipeline::types::{Message, MessageSource};

/// Reads every `*.eml` file in a directory (non-recursive).
pub struct EmlDirSource {
    dir: PathBuf,
}

impl EmlDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn list_eml_files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let io_err = |source| SourceError::Io {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            let path = entry.path();
            let is_eml = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("eml"));
            if is_eml {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl MessageSource for EmlDirSource {
    fn name(&self) -> &str {
        "eml-dir"
    }

    async fn fetch_messages(&self) -> Result<Vec<Message>, SourceError> {
        let files = self.list_eml_files().await?;
        let mut messages = Vec::with_capacity(files.len());

        for path in files {
            let raw = tokio::fs::read(&path).await.map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;
            match parse_eml(&path, &raw) {
                Some(message) => messages.push(message),
                None => warn!(path = %path.display(), "Skipping unparsable email file"),
            }
        }

        debug!(dir = %self.dir.display(), count = messages.len(), "Loaded email files");
        Ok(messages)
    }
}

/// Parse one RFC 5322 message into a pipeline `Message`.
fn parse_eml(path: &Path, raw: &[u8]) -> Option<Message> {
    let parsed = MessageParser::default().parse(raw)?;

    let id = parsed
        .message_id()
        .map(|s| s.to_string())
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))?;

    let subject = parsed.subject().map(|s| s.to_string());

    let sender = parsed
        .from()
        .and_then(|addr| addr.first())
        .and_then(|a| a.address())
        .map(|s| s.to_string());

    let body = if let Some(text) = parsed.body_text(0) {
        text.into_owned()
    } else if let Some(html) = parsed.body_html(0) {
        strip_html(html.as_ref())
    } else {
        String::new()
    };

    let received_at = parsed
        .date()
        .and_then(|d| DateTime::from_timestamp(d.to_timestamp(), 0));

    Some(Message {
        id,
        content: compose_content(subject.as_deref(), &strip_quoted_text(&body)),
        subject,
        sender,
        received_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPLY: &str = "From: Alice <alice@example.com>\r\n\
        To: bob@example.com\r\n\
        Subject: Re: Launch\r\n\
        Message-ID: <launch-reply@example.com>\r\n\
        Date: Sun, 15 Feb 2026 10:00:00 +0000\r\n\
        \r\n\
        I'm thrilled, congratulations!\r\n\
        \r\n\
        On Sat, Feb 14, 2026 at 9:00 AM Bob <bob@example.com> wrote:\r\n\
        > I'm worried about the deadline.\r\n";

    const NO_ID: &str = "From: carol@example.com\r\n\
        Subject: Minutes\r\n\
        \r\n\
        Minutes attached.\r\n";

    #[test]
    fn parses_headers_and_strips_quotes() {
        let message = parse_eml(Path::new("a.eml"), REPLY.as_bytes()).unwrap();
        assert_eq!(message.id, "launch-reply@example.com");
        assert_eq!(message.sender.as_deref(), Some("alice@example.com"));
        assert_eq!(message.subject.as_deref(), Some("Re: Launch"));
        assert!(message.content.starts_with("Re: Launch\n\n"));
        assert!(message.content.contains("thrilled"));
        assert!(!message.content.contains("worried"));
        assert!(message.received_at.is_some());
    }

    #[test]
    fn falls_back_to_file_stem_for_id() {
        let message = parse_eml(Path::new("/inbox/0042.eml"), NO_ID.as_bytes()).unwrap();
        assert_eq!(message.id, "0042");
        assert!(message.received_at.is_none());
    }

    #[tokio::test]
    async fn reads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("002.eml"), REPLY).unwrap();
        std::fs::write(dir.path().join("001.eml"), NO_ID).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "not an email").unwrap();

        let messages = EmlDirSource::new(dir.path()).fetch_messages().await.unwrap();
        let ids: Vec<&str> = messages.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["001", "launch-reply@example.com"]);
    }

    #[tokio::test]
    async fn missing_directory_is_io_error() {
        let err = EmlDirSource::new("/definitely/not/a/maildir")
            .fetch_messages()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
