//! File filtering for source discovery.
//!
//! Wraps glob-based include/exclude patterns (gitignore-style syntax) used
//! by the directory loader to restrict which files enter a bundle. An
//! empty include list means "everything"; excludes always win.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use thiserror::Error;

/// Directories that never contain bundle sources.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "**/__pycache__/**",
    "**/.git/**",
    "**/.venv/**",
    "**/venv/**",
    "**/*.egg-info/**",
];

/// Error produced when compiling filter patterns.
#[derive(Debug, Error)]
#[error("invalid file pattern {pattern:?}: {message}")]
pub struct FilterError {
    pub pattern: String,
    pub message: String,
}

/// Compiled include/exclude patterns.
#[derive(Debug, Clone)]
pub struct FileFilter {
    includes: Option<GlobSet>,
    excludes: GlobSet,
}

impl FileFilter {
    /// Build a filter from pattern lists. The default exclusions are always
    /// applied in addition to `excludes`.
    pub fn new(includes: &[String], excludes: &[String]) -> Result<Self, FilterError> {
        let includes = if includes.is_empty() {
            None
        } else {
            Some(build_glob_set(includes.iter().map(String::as_str))?)
        };
        let excludes = build_glob_set(
            DEFAULT_EXCLUSIONS
                .iter()
                .copied()
                .chain(excludes.iter().map(String::as_str)),
        )?;
        Ok(FileFilter { includes, excludes })
    }

    /// Filter accepting every file except the default exclusions.
    pub fn accept_all() -> Self {
        FileFilter::new(&[], &[]).expect("default exclusions are valid patterns")
    }

    /// Whether `path` passes the filter.
    pub fn matches(&self, path: &Path) -> bool {
        if self.excludes.is_match(path) {
            return false;
        }
        match &self.includes {
            Some(includes) => includes.is_match(path),
            None => true,
        }
    }
}

fn build_glob_set<'a>(patterns: impl Iterator<Item = &'a str>) -> Result<GlobSet, FilterError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| FilterError {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| FilterError {
        pattern: String::new(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_all_passes_regular_sources() {
        let filter = FileFilter::accept_all();
        assert!(filter.matches(Path::new("pkg/mod.py")));
        assert!(filter.matches(Path::new("app.py")));
    }

    #[test]
    fn default_exclusions_always_apply() {
        let filter = FileFilter::accept_all();
        assert!(!filter.matches(Path::new("pkg/__pycache__/mod.cpython-311.pyc")));
        assert!(!filter.matches(Path::new(".venv/lib/site.py")));
    }

    #[test]
    fn includes_restrict_matching() {
        let filter = FileFilter::new(&["src/**/*.py".to_string()], &[]).unwrap();
        assert!(filter.matches(Path::new("src/pkg/mod.py")));
        assert!(!filter.matches(Path::new("tests/test_mod.py")));
    }

    #[test]
    fn excludes_win_over_includes() {
        let filter = FileFilter::new(
            &["**/*.py".to_string()],
            &["**/generated_*.py".to_string()],
        )
        .unwrap();
        assert!(filter.matches(Path::new("pkg/mod.py")));
        assert!(!filter.matches(Path::new("pkg/generated_schema.py")));
    }

    #[test]
    fn bad_pattern_reports_error() {
        assert!(FileFilter::new(&["[".to_string()], &[]).is_err());
    }
}
