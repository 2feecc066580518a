//! Candidate file enumeration. Discovery only looks at names; content checks
//! happen in the loader.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Default extension allow-list.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    ".py",
    ".ts",
    ".tsx",
    ".js",
    ".java",
    ".go",
    ".rs",
    ".cs",
    ".cpp",
    ".h",
    ".hpp",
    ".c",
    ".md",
    ".yaml",
    ".yml",
    ".toml",
    ".json",
    ".txt",
    ".sh",
    ".ps1",
    ".dockerfile",
];

/// Default directory names never descended into.
pub const DEFAULT_IGNORED_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    ".git",
    "__pycache__",
    ".venv",
    "venv",
    "build",
    "target",
    ".next",
    ".nuxt",
    "coverage",
    ".pytest_cache",
    ".mypy_cache",
    "*.egg-info",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    /// Lowercase extensions with a leading dot.
    pub extensions: HashSet<String>,
    /// Exact directory names, or `*.suffix` patterns.
    pub ignored_dirs: Vec<String>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_EXTENSIONS.iter().copied(),
            DEFAULT_IGNORED_DIRS.iter().copied(),
        )
    }
}

impl DiscoveryConfig {
    /// Build a config, normalizing extensions to lowercase with a leading dot.
    #[must_use]
    pub fn new<E, D>(extensions: E, ignored_dirs: D) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let extensions = extensions
            .into_iter()
            .map(|e| {
                let e = e.as_ref().trim().to_lowercase();
                if e.starts_with('.') { e } else { format!(".{e}") }
            })
            .collect();
        let ignored_dirs = ignored_dirs
            .into_iter()
            .map(|d| d.as_ref().trim().to_owned())
            .filter(|d| !d.is_empty())
            .collect();
        Self {
            extensions,
            ignored_dirs,
        }
    }

    fn is_ignored_dir(&self, name: &str) -> bool {
        self.ignored_dirs.iter().any(|pattern| {
            match pattern.strip_prefix('*') {
                Some(suffix) => name.ends_with(suffix),
                None => name == pattern,
            }
        })
    }

    /// Case-insensitive extension check.
    #[must_use]
    pub fn is_allowed(&self, path: &Path) -> bool {
        extension_of(path).is_some_and(|ext| self.extensions.contains(&ext))
    }
}

/// Lowercase extension with leading dot, as stored in point payloads.
#[must_use]
pub fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
}

/// Enumerates candidate files under a root. Each call to [`files`](Self::files)
/// walks the tree again.
#[derive(Debug, Clone)]
pub struct FileDiscoverer {
    root: PathBuf,
    config: DiscoveryConfig,
}

impl FileDiscoverer {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: DiscoveryConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walk the tree in file-name order, yielding allowed files outside ignored
    /// directories. Unreadable directory entries are logged and skipped.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + '_ {
        let config = self.config.clone();
        ignore::WalkBuilder::new(&self.root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(std::ffi::OsStr::cmp)
            .filter_entry(move |entry| {
                let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
                entry.depth() == 0
                    || !is_dir
                    || !config.is_ignored_dir(&entry.file_name().to_string_lossy())
            })
            .build()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {e}");
                    None
                }
            })
            .filter(|e| e.file_type().is_some_and(|ft| ft.is_file()))
            .filter(|e| self.config.is_allowed(e.path()))
            .map(ignore::DirEntry::into_path)
    }
}
