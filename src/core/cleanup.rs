//! Scoped cleanup of temporary files and directories
//!
//! Paths are registered the moment they are created and removed in reverse
//! order when the scope is cleaned up. Removal is best-effort: failures are
//! logged at debug level and never returned.

use std::fs;
use std::path::PathBuf;

/// Kind of temporary resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TempKind {
    File,
    Directory,
}

#[derive(Debug)]
struct TempEntry {
    path: PathBuf,
    kind: TempKind,
}

/// Ordered list of temporary paths owned by one publish run
#[derive(Debug, Default)]
pub struct CleanupScope {
    entries: Vec<TempEntry>,
}

impl CleanupScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a temporary file for deletion
    pub fn register_file(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(TempEntry {
            path: path.into(),
            kind: TempKind::File,
        });
    }

    /// Register a temporary directory for recursive deletion
    pub fn register_dir(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(TempEntry {
            path: path.into(),
            kind: TempKind::Directory,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Delete every registered path, newest first
    ///
    /// Returns the number of paths that could not be removed.
    pub fn cleanup(&mut self) -> usize {
        let mut failures = 0;

        while let Some(entry) = self.entries.pop() {
            let result = match entry.kind {
                TempKind::File => fs::remove_file(&entry.path),
                TempKind::Directory => fs::remove_dir_all(&entry.path),
            };

            match result {
                Ok(()) => tracing::debug!(path = %entry.path.display(), "removed temporary path"),
                // Already gone counts as cleaned.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    failures += 1;
                    tracing::debug!(
                        path = %entry.path.display(),
                        error = %e,
                        "failed to remove temporary path"
                    );
                }
            }
        }

        failures
    }
}

impl Drop for CleanupScope {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            self.cleanup();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cleanup_removes_files_and_directories() {
        let temp_dir = TempDir::new().unwrap();
        let staging = temp_dir.path().join("staging");
        fs::create_dir_all(staging.join("nested")).unwrap();
        fs::write(staging.join("nested/file.txt"), "x").unwrap();
        let archive = temp_dir.path().join("out.zip");
        fs::write(&archive, "zip").unwrap();

        let mut scope = CleanupScope::new();
        scope.register_dir(&staging);
        scope.register_file(&archive);

        assert_eq!(scope.cleanup(), 0);
        assert!(!staging.exists());
        assert!(!archive.exists());
        assert!(scope.is_empty());
    }

    #[test]
    fn test_cleanup_runs_in_reverse_order() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("archive-dir");
        fs::create_dir(&dir).unwrap();
        let file = dir.join("site.ps1.zip");
        fs::write(&file, "zip").unwrap();

        let mut scope = CleanupScope::new();
        scope.register_dir(&dir);
        scope.register_file(&file);

        // The file goes first, then its now-empty parent.
        assert_eq!(scope.cleanup(), 0);
        assert!(!dir.exists());
    }

    #[test]
    fn test_missing_paths_are_not_failures() {
        let temp_dir = TempDir::new().unwrap();
        let mut scope = CleanupScope::new();
        scope.register_file(temp_dir.path().join("never-created"));
        scope.register_dir(temp_dir.path().join("never-created-dir"));

        assert_eq!(scope.cleanup(), 0);
    }

    #[test]
    fn test_wrong_kind_is_swallowed() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a-directory");
        fs::create_dir(&dir).unwrap();

        let mut scope = CleanupScope::new();
        scope.register_file(&dir);

        assert_eq!(scope.cleanup(), 1);
        assert!(dir.exists());
    }

    #[test]
    fn test_drop_cleans_up() {
        let temp_dir = TempDir::new().unwrap();
        let staging = temp_dir.path().join("staging");
        fs::create_dir(&staging).unwrap();

        {
            let mut scope = CleanupScope::new();
            scope.register_dir(&staging);
        }

        assert!(!staging.exists());
    }
}
