//! Error handling for configuration publishing
//!
//! This module provides the error taxonomy of the publish pipeline with
//! recovery guidance, using the thiserror crate for ergonomic error handling.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T, E = PublishError> = std::result::Result<T, E>;

/// A single problem reported while parsing a configuration source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number
    pub line: usize,
    /// 1-based column number
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// Coarse error category surfaced to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidArgument,
    ParseError,
    ModuleNotFound,
    PermissionDenied,
    ResourceExists,
    ResourceUnavailable,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::ParseError => "ParseError",
            Self::ModuleNotFound => "ModuleNotFound",
            Self::PermissionDenied => "PermissionDenied",
            Self::ResourceExists => "ResourceExists",
            Self::ResourceUnavailable => "ResourceUnavailable",
        };
        f.write_str(name)
    }
}

/// Main error type for configuration publishing operations
#[derive(Error, Debug)]
pub enum PublishError {
    // Source resolution errors
    #[error("invalid argument for {}: {message}", .path.display())]
    InvalidArgument { path: PathBuf, message: String },

    // Parse errors
    #[error(
        "{} failed to parse with {} error(s):\n{}",
        .path.display(),
        .diagnostics.len(),
        format_diagnostics(.diagnostics)
    )]
    ParseError {
        path: PathBuf,
        diagnostics: Vec<Diagnostic>,
    },

    // Dependency errors
    #[error("required module '{module}' was not found (searched: {searched})")]
    ModuleNotFound { module: String, searched: String },

    // Overwrite guard
    #[error("destination {destination} already exists; use --force to overwrite")]
    DestinationExists { destination: String },

    // Access errors
    #[error("permission denied for {target}: {message}")]
    PermissionDenied { target: String, message: String },

    // Remote storage errors
    #[error("storage request to {target} failed: {message}")]
    Storage { target: String, message: String },

    // Compression errors
    #[error("failed to build archive {}: {message}", .path.display())]
    Archive { path: PathBuf, message: String },

    // Configuration file errors
    #[error("configuration error: {0}")]
    Config(String),

    // Workflow bookkeeping
    #[error(transparent)]
    State(#[from] crate::core::state_machine::IllegalTransition),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("  - {}", d))
        .collect::<Vec<_>>()
        .join("\n")
}

impl PublishError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::PermissionDenied {
            return Self::PermissionDenied {
                target: path.display().to_string(),
                message: source.to_string(),
            };
        }
        Self::Io { path, source }
    }

    /// Shorthand for an `InvalidArgument` error
    pub fn invalid_argument(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Get the category this error is reported under
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidArgument { .. } | Self::Config(_) => ErrorCategory::InvalidArgument,
            Self::ParseError { .. } => ErrorCategory::ParseError,
            Self::ModuleNotFound { .. } => ErrorCategory::ModuleNotFound,
            Self::PermissionDenied { .. } => ErrorCategory::PermissionDenied,
            Self::DestinationExists { .. } => ErrorCategory::ResourceExists,
            Self::Storage { .. } | Self::Archive { .. } | Self::State(_) | Self::Io { .. } => {
                ErrorCategory::ResourceUnavailable
            }
        }
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::InvalidArgument { .. } => vec![
                "Check that the path exists",
                "Use a .ps1 or .psm1 source (or .zip when uploading)",
            ],
            Self::ParseError { .. } => vec!["Fix the reported syntax errors and retry"],
            Self::ModuleNotFound { .. } => vec![
                "Install the module on this machine",
                "Add its parent directory to modules.searchPaths or DSC_MODULE_PATH",
            ],
            Self::DestinationExists { .. } => vec![
                "Pass --force to overwrite the existing artifact",
                "Choose a different output path or container",
            ],
            Self::PermissionDenied { .. } => vec![
                "Check file system permissions",
                "Check that the SAS token grants write access to the container",
            ],
            Self::Storage { .. } => vec![
                "Check the storage endpoint and network connectivity",
                "Retry once the storage service is reachable",
            ],
            Self::Archive { .. } => vec!["Check free disk space in the temp directory"],
            Self::Config(_) => vec!["Fix .dsc-publisher.yaml and retry"],
            Self::State(_) => vec!["Report this as a bug with the -vv log attached"],
            Self::Io { .. } => vec!["Check that the path is readable and writable"],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "INVALID_ARGUMENT",
            Self::ParseError { .. } => "PARSE_ERROR",
            Self::ModuleNotFound { .. } => "MODULE_NOT_FOUND",
            Self::DestinationExists { .. } => "DESTINATION_EXISTS",
            Self::PermissionDenied { .. } => "PERMISSION_DENIED",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Archive { .. } => "ARCHIVE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::State(_) => "STATE_ERROR",
            Self::Io { .. } => "IO_ERROR",
        }
    }
}
