//! Message sources (fetch collaborators).
//!
//! Sources are pure I/O: they turn stored mail into `Message`s in a stable
//! order and never classify anything themselves.

pub mod eml_dir;
pub mod email_text;
pub mod json_file;

pub use eml_dir::EmlDirSource;
pub use json_file::JsonFileSource;

use std::path::Path;
use std::sync::Arc;

use crate::error::SourceError;
use crate::pipeline::types::MessageSource;

/// Pick a source for `path`: a directory of `.eml` files or a `.json` file.
pub fn open_source(path: &Path) -> Result<Arc<dyn MessageSource>, SourceError> {
    if path.is_dir() {
        return Ok(Arc::new(EmlDirSource::new(path)));
    }

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    if is_json {
        return Ok(Arc::new(JsonFileSource::new(path)));
    }

    Err(SourceError::Unsupported {
        path: path.to_path_buf(),
        reason: "expected a .json file or a directory of .eml files".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_opens_eml_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = open_source(dir.path()).unwrap();
        assert_eq!(source.name(), "eml-dir");
    }

    #[test]
    fn json_path_opens_json_source() {
        let source = open_source(Path::new("inbox.JSON")).unwrap();
        assert_eq!(source.name(), "json-file");
    }

    #[test]
    fn other_paths_are_unsupported() {
        assert!(matches!(
            open_source(Path::new("inbox.mbox")),
            Err(SourceError::Unsupported { .. })
        ));
    }
}
