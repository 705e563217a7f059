// Source discovery: finding and loading the Python files of a project

pub mod ignore;
pub mod loader;

pub use ignore::{GlobIgnore, IgnoreBackend, IgnoreMatcher, NaiveIgnore};
pub use loader::SourceText;

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Directories never descended into
pub const SKIP_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "env",
    "venv",
    ".venv",
    "node_modules",
    ".idea",
    ".mypy_cache",
    ".tox",
];

/// Walks a project root for Python files
pub struct FileScanner {
    include: Vec<glob::Pattern>,
    ignore: Box<dyn IgnoreMatcher>,
}

impl FileScanner {
    /// Create a scanner from include patterns and an ignore matcher
    pub fn new(include: &[String], ignore: Box<dyn IgnoreMatcher>) -> Result<Self> {
        let include = include
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { include, ignore })
    }

    /// Discover Python files under `root`, sorted by path
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.exists() {
            return Err(Error::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(Error::InvalidPath(root.to_path_buf()));
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().map_or(true, |ext| ext != "py") {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(path);
            if !self.is_included(relative) {
                continue;
            }
            if self.ignore.is_ignored(relative) {
                debug!(path = %relative.display(), "ignored");
                continue;
            }

            files.push(path.to_path_buf());
        }

        files.sort();
        debug!(root = %root.display(), files = files.len(), "scan complete");
        Ok(files)
    }

    fn is_included(&self, relative: &Path) -> bool {
        let path = relative.to_string_lossy().replace('\\', "/");
        self.include.iter().any(|p| {
            p.matches(&path)
                || relative
                    .file_name()
                    .map_or(false, |name| p.matches(&name.to_string_lossy()))
        })
    }
}

fn is_skipped_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map_or(false, |name| SKIP_DIRS.contains(&name))
}

/// Convert a file path to a dotted module path relative to `root`
///
/// `pkg/sub/mod.py` becomes `pkg.sub.mod` and `pkg/__init__.py` becomes `pkg`.
pub fn module_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts: Vec<String> = relative
        .iter()
        .map(|s| s.to_string_lossy().into_owned())
        .collect();

    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".py") {
            *last = stem.to_string();
        }
    }

    if parts.last().map(String::as_str) == Some("__init__") {
        parts.pop();
    }

    parts.join(".")
}
