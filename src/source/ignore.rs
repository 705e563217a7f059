// Ignore-pattern matching for file discovery

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Decides whether a discovered path is skipped
///
/// Paths are relative to the scan root and use `/` separators.
pub trait IgnoreMatcher: Send + Sync {
    fn is_ignored(&self, relative: &Path) -> bool;
}

/// Which matcher implementation to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnoreBackend {
    /// `glob::Pattern` matching
    #[default]
    Glob,
    /// Prefix, extension and substring checks, no glob syntax
    Naive,
}

impl IgnoreBackend {
    /// Build the matcher for a set of patterns
    pub fn build(&self, patterns: &[String]) -> Result<Box<dyn IgnoreMatcher>> {
        Ok(match self {
            IgnoreBackend::Glob => Box::new(GlobIgnore::new(patterns)?),
            IgnoreBackend::Naive => Box::new(NaiveIgnore::new(patterns)),
        })
    }
}

fn normalized(relative: &Path) -> String {
    relative.to_string_lossy().replace('\\', "/")
}

/// Glob-backed matcher
///
/// A pattern matches the relative path itself or any of its parent
/// directories, so `build/**` and `build` both skip everything under `build/`.
pub struct GlobIgnore {
    patterns: Vec<glob::Pattern>,
}

impl GlobIgnore {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| glob::Pattern::new(p))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }
}

impl IgnoreMatcher for GlobIgnore {
    fn is_ignored(&self, relative: &Path) -> bool {
        let path = normalized(relative);
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: false,
            require_literal_leading_dot: false,
        };

        let mut prefixes = vec![path.as_str()];
        prefixes.extend(path.match_indices('/').map(|(i, _)| &path[..i]));

        self.patterns.iter().any(|pattern| {
            prefixes
                .iter()
                .any(|candidate| pattern.matches_with(candidate, options))
        })
    }
}

/// Simple matcher without glob semantics
///
/// `dir/**` skips paths starting with `dir`, `*.ext` skips by extension and
/// anything else skips paths containing the pattern text.
pub struct NaiveIgnore {
    patterns: Vec<String>,
}

impl NaiveIgnore {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.to_vec(),
        }
    }
}

impl IgnoreMatcher for NaiveIgnore {
    fn is_ignored(&self, relative: &Path) -> bool {
        let path = normalized(relative);

        self.patterns.iter().any(|pattern| {
            if pattern.contains("**") {
                let prefix = pattern.trim_end_matches("/**").trim_end_matches("**");
                !prefix.is_empty() && path.starts_with(prefix)
            } else if let Some(ext) = pattern.strip_prefix("*.") {
                relative.extension().map_or(false, |e| e == ext)
            } else {
                path.contains(pattern.as_str())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_glob_ignore_directory() {
        let matcher = GlobIgnore::new(&patterns(&["build/**", "tests"])).unwrap();
        assert!(matcher.is_ignored(Path::new("build/lib/mod.py")));
        assert!(matcher.is_ignored(Path::new("tests/test_cart.py")));
        assert!(!matcher.is_ignored(Path::new("src/build.py")));
    }

    #[test]
    fn test_glob_ignore_wildcards() {
        let matcher = GlobIgnore::new(&patterns(&["*.egg-info/**", "**/migrations/*.py"])).unwrap();
        assert!(matcher.is_ignored(Path::new("shop.egg-info/setup.py")));
        assert!(matcher.is_ignored(Path::new("app/orders/migrations/0001_initial.py")));
        assert!(!matcher.is_ignored(Path::new("app/orders/models.py")));
    }

    #[test]
    fn test_glob_invalid_pattern() {
        assert!(GlobIgnore::new(&patterns(&["[unclosed"])).is_err());
    }

    #[test]
    fn test_naive_ignore() {
        let matcher = NaiveIgnore::new(&patterns(&["tests/**", "*.pyi", "generated"]));
        assert!(matcher.is_ignored(Path::new("tests/test_main.py")));
        assert!(matcher.is_ignored(Path::new("stubs/api.pyi")));
        assert!(matcher.is_ignored(Path::new("pkg/generated_models.py")));
        assert!(!matcher.is_ignored(Path::new("src/main.py")));
    }

    #[test]
    fn test_backend_build() {
        let list = patterns(&["dist/**"]);
        for backend in [IgnoreBackend::Glob, IgnoreBackend::Naive] {
            let matcher = backend.build(&list).unwrap();
            assert!(matcher.is_ignored(Path::new("dist/pkg/a.py")));
            assert!(!matcher.is_ignored(Path::new("src/a.py")));
        }
    }

    #[test]
    fn test_backend_default_and_serde() {
        assert_eq!(IgnoreBackend::default(), IgnoreBackend::Glob);
        let parsed: IgnoreBackend = serde_json::from_str("\"naive\"").unwrap();
        assert_eq!(parsed, IgnoreBackend::Naive);
    }
}
