//! Project file discovery
//!
//! Walks the project tree respecting .gitignore, filters to the
//! configured extensions, skips build output and dependency install
//! directories, and yields root-relative paths with forward slashes so
//! snapshots are portable across platforms.

use crate::core::config::{
    SnapshotOptions, DEFAULT_EXCLUDE_DIRS, MAX_FILE_SIZE, TEST_FILE_SUFFIXES, TEST_PATH_MARKERS,
};
use crate::core::error::{Error, Result};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A discovered source file
#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    /// Absolute path on disk
    pub abs_path: PathBuf,
    /// Path relative to the project root, `/`-separated
    pub rel_path: String,
}

/// Walks project files for the snapshot assembler
#[derive(Debug)]
pub struct FileWalker {
    root: PathBuf,
    extensions: Vec<String>,
    exclude_globs: Vec<glob::Pattern>,
    include_tests: bool,
}

impl FileWalker {
    pub fn new(options: &SnapshotOptions) -> Result<Self> {
        let mut exclude_globs = Vec::with_capacity(options.exclude_globs.len());
        for pattern in &options.exclude_globs {
            let compiled = glob::Pattern::new(pattern).map_err(|e| Error::Validation {
                field: "exclude glob",
                value: format!("{pattern}: {e}"),
            })?;
            exclude_globs.push(compiled);
        }

        Ok(Self {
            root: options.project_path.clone(),
            extensions: options
                .include_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            exclude_globs,
            include_tests: options.include_tests,
        })
    }

    /// Walk all matching files, sorted by relative path
    pub fn walk(&self) -> Result<Vec<DiscoveredFile>> {
        if !self.root.is_dir() {
            return Err(Error::Validation {
                field: "project_path",
                value: self.root.display().to_string(),
            });
        }

        let mut files = Vec::new();
        let walker = WalkBuilder::new(&self.root)
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .max_filesize(Some(MAX_FILE_SIZE))
            .build();

        for entry in walker.flatten() {
            let path = entry.path();
            if path.is_dir() || !self.has_wanted_extension(path) {
                continue;
            }

            let Some(rel_path) = relative_slash_path(&self.root, path) else {
                continue;
            };
            if self.is_excluded(&rel_path) {
                debug!(path = %rel_path, "Excluded from scan");
                continue;
            }

            files.push(DiscoveredFile {
                abs_path: path.to_path_buf(),
                rel_path,
            });
        }

        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(files)
    }

    fn has_wanted_extension(&self, path: &Path) -> bool {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        self.extensions.iter().any(|wanted| wanted == &ext)
    }

    fn is_excluded(&self, rel_path: &str) -> bool {
        let segments: Vec<&str> = rel_path.split('/').collect();

        if segments
            .iter()
            .any(|seg| DEFAULT_EXCLUDE_DIRS.contains(seg))
        {
            return true;
        }

        if !self.include_tests && is_test_path(rel_path, &segments) {
            return true;
        }

        let basename = segments.last().copied().unwrap_or(rel_path);
        self.exclude_globs
            .iter()
            .any(|p| p.matches(rel_path) || p.matches(basename))
    }
}

/// Test doubles and fixtures, by directory marker or file suffix
fn is_test_path(rel_path: &str, segments: &[&str]) -> bool {
    if segments.iter().any(|seg| TEST_PATH_MARKERS.contains(seg)) {
        return true;
    }
    let stem = rel_path.rsplit('/').next().unwrap_or(rel_path);
    let stem = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem);
    TEST_FILE_SUFFIXES
        .iter()
        .any(|suffix| stem.ends_with(suffix))
}

/// Root-relative path with `/` separators
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

/// Read a file's text, retrying once on transient failures
pub fn read_file_text(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if Error::is_transient(&e) => {
            std::fs::read_to_string(path).map_err(|e| Error::File {
                file_path: path.to_path_buf(),
                operation: "read",
                source: e,
            })
        }
        Err(e) => Err(Error::File {
            file_path: path.to_path_buf(),
            operation: "read",
            source: e,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn options_for(root: &Path) -> SnapshotOptions {
        SnapshotOptions::new(root)
    }

    #[test]
    fn test_walk_filters_extensions() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "const a = 1;").unwrap();
        fs::write(dir.path().join("b.py"), "b = 1").unwrap();
        fs::write(dir.path().join("README.md"), "# hi").unwrap();

        let walker = FileWalker::new(&options_for(dir.path())).unwrap();
        let files = walker.walk().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, "a.ts");
    }

    #[test]
    fn test_walk_skips_default_dirs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("node_modules/pkg")).unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join("src/main.ts"), "x").unwrap();

        let files = FileWalker::new(&options_for(dir.path()))
            .unwrap()
            .walk()
            .unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, "src/main.ts");
    }

    #[test]
    fn test_walk_test_files_toggle() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("__tests__")).unwrap();
        fs::write(dir.path().join("__tests__/util.ts"), "x").unwrap();
        fs::write(dir.path().join("app.test.ts"), "x").unwrap();
        fs::write(dir.path().join("app.ts"), "x").unwrap();

        let without = FileWalker::new(&options_for(dir.path()))
            .unwrap()
            .walk()
            .unwrap();
        assert_eq!(without.len(), 1);
        assert_eq!(without[0].rel_path, "app.ts");

        let mut opts = options_for(dir.path());
        opts.include_tests = true;
        let with = FileWalker::new(&opts).unwrap().walk().unwrap();
        assert_eq!(with.len(), 3);
    }

    #[test]
    fn test_walk_exclude_globs() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("generated")).unwrap();
        fs::write(dir.path().join("generated/api.ts"), "x").unwrap();
        fs::write(dir.path().join("main.ts"), "x").unwrap();

        let mut opts = options_for(dir.path());
        opts.exclude_globs = vec!["generated/**".to_string()];
        let files = FileWalker::new(&opts).unwrap().walk().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].rel_path, "main.ts");
    }

    #[test]
    fn test_invalid_glob_rejected() {
        let dir = tempdir().unwrap();
        let mut opts = options_for(dir.path());
        opts.exclude_globs = vec!["[".to_string()];
        assert!(matches!(
            FileWalker::new(&opts).unwrap_err(),
            Error::Validation { .. }
        ));
    }

    #[test]
    fn test_missing_root_rejected() {
        let opts = options_for(Path::new("/nonexistent/project/root"));
        let walker = FileWalker::new(&opts).unwrap();
        assert!(matches!(
            walker.walk().unwrap_err(),
            Error::Validation { .. }
        ));
    }

    #[test]
    fn test_relative_slash_path() {
        let root = Path::new("/tmp/project");
        let nested = Path::new("/tmp/project/src/deep/mod.ts");
        assert_eq!(
            relative_slash_path(root, nested).as_deref(),
            Some("src/deep/mod.ts")
        );
    }
}
