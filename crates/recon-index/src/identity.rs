//! Deterministic chunk identifiers and path prefix expansion.

use std::path::Path;

/// Number of leading characters of the chunk text folded into its identity.
const ID_TEXT_PREFIX_CHARS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkId {
    /// Point id: the first 128 bits of the digest as a UUID string.
    pub point_id: String,
    /// Full hex digest.
    pub content_hash: String,
}

/// Hash `"{path}:{index}:{first 100 chars of text}"`.
///
/// Unchanged content at the same position reproduces the same id, so
/// re-ingestion overwrites instead of duplicating.
#[must_use]
pub fn chunk_id(rel_path: &str, index: usize, text: &str) -> ChunkId {
    let prefix: String = text.chars().take(ID_TEXT_PREFIX_CHARS).collect();
    let hash = blake3::hash(format!("{rel_path}:{index}:{prefix}").as_bytes());

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash.as_bytes()[..16]);
    ChunkId {
        point_id: uuid::Builder::from_custom_bytes(bytes)
            .into_uuid()
            .to_string(),
        content_hash: hash.to_hex().to_string(),
    }
}

/// Relative path with `/` separators regardless of platform.
#[must_use]
pub fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Every ancestor directory of `rel_path` plus the path itself.
///
/// `src/api/handler.rs` → `["src", "src/api", "src/api/handler.rs"]`. Stored
/// on each point so a prefix filter is an exact keyword match in the store and
/// only matches at component boundaries.
#[must_use]
pub fn path_prefixes(rel_path: &str) -> Vec<String> {
    let mut prefixes = Vec::new();
    let mut acc = String::new();
    for part in rel_path.split('/').filter(|p| !p.is_empty()) {
        if !acc.is_empty() {
            acc.push('/');
        }
        acc.push_str(part);
        prefixes.push(acc.clone());
    }
    prefixes
}

/// Canonical form of a user-supplied prefix: no leading `./` or `/`, no
/// trailing `/`, no empty segments. Returns `None` when nothing is left.
#[must_use]
pub fn normalize_prefix(prefix: &str) -> Option<String> {
    let trimmed = prefix.trim().trim_start_matches("./");
    let joined = trimmed
        .split('/')
        .filter(|p| !p.is_empty() && *p != ".")
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}
