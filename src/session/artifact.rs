//! Recorded artifact
//!
//! Chunks are appended in order while the session is active and finalized
//! into one immutable blob when the session stops. Chunks are never
//! dropped silently; finalizing with nothing captured is an error.

use serde::{Deserialize, Serialize};

use crate::error::{RecordingError, RecordingResult};

/// Ordered, append-only sequence of encoded media chunks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedArtifact {
    mime_type: String,
    chunks: Vec<Vec<u8>>,
}

impl RecordedArtifact {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            mime_type: mime_type.into(),
            chunks: Vec::new(),
        }
    }

    pub fn from_chunks(mime_type: impl Into<String>, chunks: Vec<Vec<u8>>) -> Self {
        Self {
            mime_type: mime_type.into(),
            chunks,
        }
    }

    pub fn append(&mut self, chunk: Vec<u8>) {
        self.chunks.push(chunk);
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Concatenate all chunks into the final blob
    ///
    /// An empty chunk sequence is reported, not swallowed.
    pub fn finalize(self) -> RecordingResult<Vec<u8>> {
        if self.chunks.is_empty() {
            return Err(RecordingError::EmptyArtifact);
        }

        let mut blob = Vec::with_capacity(self.byte_len());
        for chunk in &self.chunks {
            blob.extend_from_slice(chunk);
        }
        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finalize_concatenates_in_order() {
        let mut artifact = RecordedArtifact::new("video/webm");
        artifact.append(vec![1, 2]);
        artifact.append(vec![3]);
        artifact.append(vec![4, 5, 6]);

        assert_eq!(artifact.chunk_count(), 3);
        assert_eq!(artifact.byte_len(), 6);
        assert_eq!(artifact.finalize().unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_finalize_empty_is_an_error() {
        let artifact = RecordedArtifact::new("video/webm");
        assert!(matches!(
            artifact.finalize(),
            Err(RecordingError::EmptyArtifact)
        ));
    }
}
