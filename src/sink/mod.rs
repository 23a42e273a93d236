//! Recording persistence
//!
//! A [`RecordingSink`] turns finalized recording bytes into a named file.
//! The history log is a separate concern: an entry is appended for every
//! completed recording whether or not the save itself went through, so a
//! dismissed save dialog does not erase the recording from history.

pub mod history;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::{RecordingError, RecordingResult};

pub use history::{HistoryEntry, HistoryLog, HISTORY_CAP};

/// Persists finalized recording bytes under a suggested filename
#[async_trait]
pub trait RecordingSink: Send + Sync {
    async fn persist(&self, data: &[u8], filename: &str) -> RecordingResult<PathBuf>;
}

/// Sink that writes recordings into a directory on disk
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl RecordingSink for FileSink {
    async fn persist(&self, data: &[u8], filename: &str) -> RecordingResult<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let path = self.dir.join(filename);
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| RecordingError::Sink(format!("writing {}: {}", path.display(), e)))?;

        tracing::info!("Saved recording to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_sink_writes_named_file() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let path = sink
            .persist(b"chunks", "Reclip_2026-08-25_09-05-03.webm")
            .await
            .unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "Reclip_2026-08-25_09-05-03.webm"
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"chunks");
    }

    #[tokio::test]
    async fn test_file_sink_creates_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("recordings").join("2026");
        let sink = FileSink::new(&nested);

        sink.persist(b"x", "a.webm").await.unwrap();
        assert!(nested.join("a.webm").exists());
    }
}
