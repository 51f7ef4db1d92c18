//! Installed module lookup
//!
//! Modules are installed as `<root>/<Name>/` or, side by side,
//! `<root>/<Name>/<version>/`. Roots are searched in order and the first
//! root holding a matching module wins.

use crate::core::error::{PublishError, Result};
use crate::modules::version::ModuleVersion;
use crate::source::parser::RequiredModule;
use lazy_static::lazy_static;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    static ref MANIFEST_VERSION_REGEX: Regex =
        Regex::new(r#"(?im)^\s*ModuleVersion\s*=\s*['"]?([^'"\s#;]+)"#).unwrap();
}

/// A module found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatedModule {
    /// Name as requested by the configuration
    pub name: String,
    /// Version directory chosen, or the manifest version of a flat module
    pub version: Option<ModuleVersion>,
    /// Directory whose contents are copied into the archive
    pub path: PathBuf,
}

/// Finds installed modules under an ordered list of search roots
#[derive(Debug, Clone, Default)]
pub struct ModuleLocator {
    search_paths: Vec<PathBuf>,
}

impl ModuleLocator {
    pub fn new(search_paths: Vec<PathBuf>) -> Self {
        Self { search_paths }
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    /// Locate `module`, honouring its requested version
    pub fn locate(&self, module: &RequiredModule) -> Result<LocatedModule> {
        let requested = match &module.version {
            Some(raw) => Some(raw.parse::<ModuleVersion>().map_err(|e| {
                PublishError::ModuleNotFound {
                    module: module.name.clone(),
                    searched: e.to_string(),
                }
            })?),
            None => None,
        };

        for root in &self.search_paths {
            let Some(candidate) = find_module_dir(root, &module.name) else {
                continue;
            };

            let versions = installed_versions(&candidate);
            if versions.is_empty() {
                // Flat layout: the version comes from the module manifest.
                let version = manifest_version(&candidate);
                if let Some(wanted) = &requested
                    && version.as_ref() != Some(wanted)
                {
                    tracing::debug!(
                        module = %module.name,
                        path = %candidate.display(),
                        "installed module does not have the requested version"
                    );
                    continue;
                }
                tracing::debug!(module = %module.name, path = %candidate.display(), "located module");
                return Ok(LocatedModule {
                    name: module.name.clone(),
                    version,
                    path: candidate,
                });
            }

            let chosen = match &requested {
                Some(wanted) => versions.into_iter().find(|(v, _)| v == wanted),
                None => versions.into_iter().max_by(|(a, _), (b, _)| a.cmp(b)),
            };

            if let Some((version, path)) = chosen {
                tracing::debug!(
                    module = %module.name,
                    version = %version,
                    path = %path.display(),
                    "located module"
                );
                return Ok(LocatedModule {
                    name: module.name.clone(),
                    version: Some(version),
                    path,
                });
            }
        }

        let wanted = match &module.version {
            Some(version) => format!("{} {}", module.name, version),
            None => module.name.clone(),
        };
        Err(PublishError::ModuleNotFound {
            module: wanted,
            searched: self.describe_search_paths(),
        })
    }

    fn describe_search_paths(&self) -> String {
        if self.search_paths.is_empty() {
            return "no module search paths configured".to_string();
        }
        self.search_paths
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Child directory of `root` named `name`, compared case-insensitively
fn find_module_dir(root: &Path, name: &str) -> Option<PathBuf> {
    let exact = root.join(name);
    if exact.is_dir() {
        return Some(exact);
    }

    let entries = fs::read_dir(root).ok()?;
    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .find(|entry| entry.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|entry| entry.path())
}

/// `ModuleVersion` declared by `<Name>.psd1` in a flat module directory
fn manifest_version(module_dir: &Path) -> Option<ModuleVersion> {
    let name = module_dir.file_name()?.to_str()?;
    let manifest = fs::read_dir(module_dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(&format!("{}.psd1", name)))
        })?;

    let text = fs::read_to_string(&manifest).ok()?;
    let captures = MANIFEST_VERSION_REGEX.captures(&text)?;
    captures[1].parse().ok()
}

/// Version-named subdirectories of a module directory
fn installed_versions(module_dir: &Path) -> Vec<(ModuleVersion, PathBuf)> {
    let Ok(entries) = fs::read_dir(module_dir) else {
        return Vec::new();
    };

    entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| {
            let version = entry.file_name().to_str()?.parse::<ModuleVersion>().ok()?;
            Some((version, entry.path()))
        })
        .collect()
}
