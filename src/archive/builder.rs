//! Archive building
//!
//! Parses a configuration source for the modules it imports, copies the
//! source and those modules into a fresh staging directory and compresses
//! the staging directory into a single zip.
//!
//! Every temporary path is registered with the caller's [`CleanupScope`]
//! the moment it is created, so a failure at any step leaves nothing
//! behind once the scope is cleaned up.

use crate::core::cleanup::CleanupScope;
use crate::core::error::{PublishError, Result};
use crate::modules::locator::{LocatedModule, ModuleLocator};
use crate::source::parser::{ModuleDependencyParser, RequiredModule};
use crate::source::resolver::{ConfigurationSource, SourceKind};
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Prefix of staging directory names under the temp root
pub const STAGING_PREFIX: &str = "dsc-staging-";

/// Extra content placed next to the configuration source
#[derive(Debug, Clone, Default)]
pub struct ArchiveOptions {
    /// Configuration data file (`.psd1`) copied into the staging root
    pub configuration_data: Option<PathBuf>,
    /// Files or directories copied into the staging root
    pub additional_paths: Vec<PathBuf>,
    /// Do not scan the source for required modules
    pub skip_dependency_detection: bool,
}

/// Contents of a populated staging directory
#[derive(Debug, Clone)]
pub struct StagedContent {
    pub dir: PathBuf,
    pub modules: Vec<LocatedModule>,
    /// Top-level entry names, in the order they were created
    pub entries: Vec<String>,
}

/// A written archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub path: PathBuf,
    /// Number of zip entries (files and directories)
    pub entries: usize,
    pub bytes: u64,
}

/// Builds configuration archives
pub struct ArchiveBuilder {
    parser: Box<dyn ModuleDependencyParser>,
    locator: ModuleLocator,
    temp_root: PathBuf,
}

impl ArchiveBuilder {
    pub fn new(
        parser: Box<dyn ModuleDependencyParser>,
        locator: ModuleLocator,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            parser,
            locator,
            temp_root: temp_root.into(),
        }
    }

    pub fn temp_root(&self) -> &Path {
        &self.temp_root
    }

    pub fn locator(&self) -> &ModuleLocator {
        &self.locator
    }

    /// Modules imported by `source`
    ///
    /// Fails with `ParseError` carrying every diagnostic. No file is
    /// created by this step.
    pub fn required_modules(
        &self,
        source: &ConfigurationSource,
        skip_dependency_detection: bool,
    ) -> Result<Vec<RequiredModule>> {
        if source.kind() == SourceKind::Archive {
            return Err(PublishError::invalid_argument(
                source.path(),
                "an archive cannot be archived again",
            ));
        }
        if skip_dependency_detection {
            tracing::debug!("dependency detection skipped");
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(source.path())
            .map_err(|e| PublishError::io(source.path(), e))?;
        let outcome = self.parser.parse(&text);

        if !outcome.errors.is_empty() {
            return Err(PublishError::ParseError {
                path: source.path().to_path_buf(),
                diagnostics: outcome.errors,
            });
        }

        tracing::debug!(
            modules = ?outcome.module_names(),
            configurations = ?outcome.configurations,
            "parsed configuration source"
        );
        Ok(outcome.modules)
    }

    /// Create a staging directory and copy everything the archive holds
    ///
    /// The directory is registered with `scope` before anything is copied.
    pub fn stage(
        &self,
        source: &ConfigurationSource,
        modules: &[RequiredModule],
        options: &ArchiveOptions,
        scope: &mut CleanupScope,
    ) -> Result<StagedContent> {
        let dir = self
            .temp_root
            .join(format!("{}{}", STAGING_PREFIX, uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).map_err(|e| PublishError::io(&dir, e))?;
        scope.register_dir(&dir);
        tracing::debug!(path = %dir.display(), "created staging directory");

        let mut entries = Vec::new();

        let source_name = source.file_name();
        copy_file(source.path(), &dir.join(&source_name))?;
        entries.push(source_name);

        let mut located = Vec::with_capacity(modules.len());
        for module in modules {
            let found = self.locator.locate(module)?;
            let dest = dir.join(&found.name);
            copy_tree(&found.path, &dest)?;
            tracing::debug!(
                module = %found.name,
                from = %found.path.display(),
                "copied module into staging"
            );
            if !entries.contains(&found.name) {
                entries.push(found.name.clone());
            }
            located.push(found);
        }

        if let Some(data) = &options.configuration_data {
            let name = stage_extra(data, &dir)?;
            entries.push(name);
        }
        for extra in &options.additional_paths {
            let name = stage_extra(extra, &dir)?;
            entries.push(name);
        }

        Ok(StagedContent {
            dir,
            modules: located,
            entries,
        })
    }

    /// Compress `staging` into a zip at `destination`
    ///
    /// Fails with `DestinationExists` if the file exists and `force` is not
    /// set; with `force` the file is replaced. The archive is written to a
    /// sibling file registered with `scope` and renamed into place once
    /// complete, so a failure never leaves a partial archive at
    /// `destination`.
    pub fn compress(
        staging: &Path,
        destination: &Path,
        force: bool,
        scope: &mut CleanupScope,
    ) -> Result<ArchiveSummary> {
        if destination.exists() && !force {
            return Err(PublishError::DestinationExists {
                destination: destination.display().to_string(),
            });
        }
        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| PublishError::io(parent, e))?;
        }

        let partial = partial_path(destination);
        scope.register_file(&partial);
        let count = write_archive(staging, &partial)?;
        fs::rename(&partial, destination).map_err(|e| PublishError::io(destination, e))?;

        let bytes = fs::metadata(destination)
            .map_err(|e| PublishError::io(destination, e))?
            .len();
        tracing::info!(
            path = %destination.display(),
            entries = count,
            bytes,
            "archive written"
        );

        Ok(ArchiveSummary {
            path: destination.to_path_buf(),
            entries: count,
            bytes,
        })
    }
}

/// Hidden sibling of `destination` the archive is written to first
fn partial_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    destination.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()))
}

/// Zip every entry under `staging` into `path`, returning the entry count
fn write_archive(staging: &Path, path: &Path) -> Result<usize> {
    let archive_err = |message: String| PublishError::Archive {
        path: path.to_path_buf(),
        message,
    };

    let file = File::create(path).map_err(|e| PublishError::io(path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut count = 0;

    for entry in WalkDir::new(staging).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| archive_err(e.to_string()))?;
        let name = entry_name(staging, entry.path())?;

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)
                .map_err(|e| archive_err(e.to_string()))?;
        } else {
            zip.start_file(name, options)
                .map_err(|e| archive_err(e.to_string()))?;
            let mut input =
                File::open(entry.path()).map_err(|e| PublishError::io(entry.path(), e))?;
            io::copy(&mut input, &mut zip).map_err(|e| PublishError::io(entry.path(), e))?;
        }
        count += 1;
    }

    let writer = zip.finish().map_err(|e| archive_err(e.to_string()))?;
    let file = writer
        .into_inner()
        .map_err(|e| PublishError::io(path, e.into_error()))?;
    file.sync_all().map_err(|e| PublishError::io(path, e))?;
    Ok(count)
}

/// Zip entry name of `path` relative to `root`, `/`-separated
fn entry_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| PublishError::Archive {
        path: path.to_path_buf(),
        message: format!("{} is outside {}", path.display(), root.display()),
    })?;
    Ok(relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to).map_err(|e| PublishError::io(from, e))?;
    Ok(())
}

/// Copy a directory tree, merging into `to` when it already exists
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(from).to_path_buf();
            match e.into_io_error() {
                Some(source) => PublishError::io(path, source),
                None => PublishError::invalid_argument(path, "filesystem loop while copying"),
            }
        })?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| PublishError::io(&target, e))?;
        } else {
            copy_file(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Copy a file or directory into the staging root, returning its entry name
fn stage_extra(path: &Path, staging: &Path) -> Result<String> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PublishError::invalid_argument(path, "path has no file name"))?;

    if path.is_dir() {
        copy_tree(path, &staging.join(&name))?;
    } else if path.is_file() {
        copy_file(path, &staging.join(&name))?;
    } else {
        return Err(PublishError::invalid_argument(path, "file does not exist"));
    }

    tracing::debug!(path = %path.display(), "copied additional content into staging");
    Ok(name)
}
