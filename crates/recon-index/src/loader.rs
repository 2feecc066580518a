use std::path::Path;

use crate::error::{IndexError, Result};

/// Read-time filters applied to each discovered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    pub max_file_size: u64,
    /// Minimum number of non-whitespace-trimmed characters.
    pub min_content_chars: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_file_size: 2_000_000,
            min_content_chars: 10,
        }
    }
}

/// A file read for chunking. Dropped once its chunks are built.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: String,
    pub content: String,
    pub size_bytes: u64,
}

impl Document {
    /// Content length in characters.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Bytes inspected for NUL when sniffing binary content.
const BINARY_SNIFF_LEN: usize = 8192;

/// Read `abs_path`, rejecting oversized, binary and near-empty files.
///
/// Invalid UTF-8 sequences are dropped rather than failing the file.
///
/// # Errors
///
/// Returns `IndexError::FileRead` with the reason the file was skipped.
pub async fn load_document(abs_path: &Path, rel_path: &str, config: &LoaderConfig) -> Result<Document> {
    let skip = |reason: String| IndexError::FileRead {
        path: rel_path.to_owned(),
        reason,
    };

    let metadata = tokio::fs::metadata(abs_path)
        .await
        .map_err(|e| skip(e.to_string()))?;
    if metadata.len() > config.max_file_size {
        return Err(skip(format!(
            "file size {} exceeds limit {}",
            metadata.len(),
            config.max_file_size
        )));
    }

    let bytes = tokio::fs::read(abs_path)
        .await
        .map_err(|e| skip(e.to_string()))?;
    if bytes.iter().take(BINARY_SNIFF_LEN).any(|b| *b == 0) {
        return Err(skip("binary content".into()));
    }

    let content: String = String::from_utf8_lossy(&bytes)
        .chars()
        .filter(|c| *c != char::REPLACEMENT_CHARACTER)
        .collect();
    let trimmed_len = content.trim().chars().count();
    if trimmed_len < config.min_content_chars {
        return Err(skip(format!(
            "content too short ({trimmed_len} chars, minimum {})",
            config.min_content_chars
        )));
    }

    Ok(Document {
        path: rel_path.to_owned(),
        content,
        size_bytes: bytes.len() as u64,
    })
}
