//! Source resolution
//!
//! Turns the caller's path into an absolute, validated [`ConfigurationSource`].

use crate::core::error::{PublishError, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Extension class of a configuration source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// `.ps1` configuration script
    Script,
    /// `.psm1` script module
    Module,
    /// `.zip` archive built earlier
    Archive,
}

impl SourceKind {
    /// Classify a path by its extension (case-insensitive)
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "ps1" => Some(SourceKind::Script),
            "psm1" => Some(SourceKind::Module),
            "zip" => Some(SourceKind::Archive),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Script => ".ps1",
            SourceKind::Module => ".psm1",
            SourceKind::Archive => ".zip",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Whether the run ends on local disk or in remote storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    ArchiveOnly,
    Upload,
}

impl ResolveMode {
    /// Extension classes accepted in this mode
    pub fn allowed_kinds(&self) -> &'static [SourceKind] {
        match self {
            ResolveMode::ArchiveOnly => &[SourceKind::Script, SourceKind::Module],
            ResolveMode::Upload => &[SourceKind::Script, SourceKind::Module, SourceKind::Archive],
        }
    }
}

/// A validated configuration source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationSource {
    path: PathBuf,
    kind: SourceKind,
}

impl ConfigurationSource {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// File name of the source, e.g. `site.ps1`
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Archive file name derived from the source, e.g. `site.ps1.zip`
    pub fn archive_name(&self) -> String {
        match self.kind {
            SourceKind::Archive => self.file_name(),
            _ => format!("{}.zip", self.file_name()),
        }
    }
}

/// Resolve `path` against `cwd` and validate it for `mode`
pub fn resolve_source(path: &Path, cwd: &Path, mode: ResolveMode) -> Result<ConfigurationSource> {
    let resolved = absolutize(path, cwd);

    let kind = SourceKind::from_path(&resolved)
        .filter(|kind| mode.allowed_kinds().contains(kind))
        .ok_or_else(|| {
            let found = resolved
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy()))
                .unwrap_or_else(|| "(none)".to_string());
            let allowed = mode
                .allowed_kinds()
                .iter()
                .map(|k| k.extension())
                .collect::<Vec<_>>()
                .join(", ");
            PublishError::invalid_argument(
                &resolved,
                format!("unsupported extension {}; expected one of {}", found, allowed),
            )
        })?;

    if !resolved.exists() {
        return Err(PublishError::invalid_argument(&resolved, "file does not exist"));
    }
    if !resolved.is_file() {
        return Err(PublishError::invalid_argument(&resolved, "not a regular file"));
    }

    tracing::debug!(path = %resolved.display(), %kind, "resolved configuration source");

    Ok(ConfigurationSource {
        path: resolved,
        kind,
    })
}

/// Join `path` onto `cwd` when relative and collapse `.` and `..` lexically
pub fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in joined.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
