//! Configuration Publisher - Main orchestrator for archive publishing
//!
//! Runs the three stages in order:
//! - Source resolution
//! - Archive building (parse, stage, compress)
//! - Publishing (leave on disk, or upload to a container)
//!
//! Mutating steps go through the [`ConfirmGate`]. Every temporary path is
//! owned by a [`CleanupScope`] that is emptied before `publish` returns,
//! whatever the outcome.

use crate::archive::builder::{ArchiveBuilder, ArchiveOptions};
use crate::core::cleanup::CleanupScope;
use crate::core::confirm::{ConfirmGate, GateOutcome};
use crate::core::error::{PublishError, Result};
use crate::core::state_machine::{PublishState, PublishStateMachine, StateTransition};
use crate::modules::locator::{LocatedModule, ModuleLocator};
use crate::source::parser::{DscScriptParser, ModuleDependencyParser};
use crate::source::resolver::{
    ConfigurationSource, ResolveMode, SourceKind, absolutize, resolve_source,
};
use crate::storage::{BlobTarget, ContentStore};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Prefix of the directory holding the upload-mode archive
pub const ARCHIVE_DIR_PREFIX: &str = "dsc-archive-";

/// Where the archive ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishMode {
    /// Write the archive to `output` and stop
    ArchiveOnly { output: PathBuf },
    /// Upload the archive to `container`
    Upload { container: String },
}

/// Publishing options passed from the CLI
#[derive(Debug, Clone)]
pub struct PublishOptions {
    /// Configuration source, relative to the publisher's working directory
    pub source: PathBuf,
    pub mode: PublishMode,
    /// Overwrite an existing archive or blob
    pub force: bool,
    pub archive: ArchiveOptions,
}

/// Published artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "location", rename_all = "lowercase")]
pub enum Artifact {
    Local(PathBuf),
    Remote(String),
}

impl std::fmt::Display for Artifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Artifact::Local(path) => write!(f, "{}", path.display()),
            Artifact::Remote(uri) => f.write_str(uri),
        }
    }
}

/// Publishing report returned after publish operation
#[derive(Debug, Clone, Serialize)]
pub struct PublishReport {
    pub source: PathBuf,
    pub state: PublishState,
    /// `None` when the gate skipped the final step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    pub modules: Vec<String>,
    pub skipped: bool,
    pub duration_ms: u64,
    pub history: Vec<StateTransition>,
}

/// What a dry inspection of a source found
#[derive(Debug, Clone, Serialize)]
pub struct PublishPlan {
    pub source: PathBuf,
    pub archive_name: String,
    pub modules: Vec<PlannedModule>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedModule {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub path: PathBuf,
}

impl From<LocatedModule> for PlannedModule {
    fn from(module: LocatedModule) -> Self {
        Self {
            name: module.name,
            version: module.version.map(|v| v.to_string()),
            path: module.path,
        }
    }
}

struct RunOutcome {
    artifact: Option<Artifact>,
    modules: Vec<String>,
}

/// Main configuration publisher orchestrator
pub struct ConfigurationPublisher {
    cwd: PathBuf,
    builder: ArchiveBuilder,
    store: Option<Box<dyn ContentStore>>,
    gate: ConfirmGate,
}

impl ConfigurationPublisher {
    /// Publisher resolving relative paths against `cwd`
    ///
    /// Starts with the DSC script parser, no module search paths, the system
    /// temp directory, no store and an interactive gate.
    pub fn new<P: AsRef<Path>>(cwd: P) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            builder: ArchiveBuilder::new(
                Box::new(DscScriptParser::new()),
                ModuleLocator::default(),
                std::env::temp_dir(),
            ),
            store: None,
            gate: ConfirmGate::interactive(),
        }
    }

    pub fn with_builder(mut self, builder: ArchiveBuilder) -> Self {
        self.builder = builder;
        self
    }

    /// Replace the parser, keeping locator and temp root
    pub fn with_parser(self, parser: Box<dyn ModuleDependencyParser>) -> Self {
        let locator = self.builder.locator().clone();
        let temp_root = self.builder.temp_root().to_path_buf();
        self.with_builder(ArchiveBuilder::new(parser, locator, temp_root))
    }

    pub fn with_store(mut self, store: Box<dyn ContentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_gate(mut self, gate: ConfirmGate) -> Self {
        self.gate = gate;
        self
    }

    /// Resolve, parse and locate modules without writing anything
    pub fn plan(&self, source: &Path, skip_dependency_detection: bool) -> Result<PublishPlan> {
        let source = resolve_source(source, &self.cwd, ResolveMode::Upload)?;
        let mut modules = Vec::new();

        if source.kind() != SourceKind::Archive {
            let required = self
                .builder
                .required_modules(&source, skip_dependency_detection)?;
            for module in &required {
                modules.push(PlannedModule::from(self.builder.locator().locate(module)?));
            }
        }

        Ok(PublishPlan {
            source: source.path().to_path_buf(),
            archive_name: source.archive_name(),
            modules,
        })
    }

    /// Run the whole pipeline
    ///
    /// Temporary paths are removed before this returns, on success and on
    /// failure.
    pub async fn publish(&self, options: &PublishOptions) -> Result<PublishReport> {
        let start_time = Instant::now();
        let mut machine = PublishStateMachine::new();
        let mut scope = CleanupScope::new();

        let result = self.run(options, &mut machine, &mut scope).await;

        if let Err(e) = &result {
            machine.fail(&e.to_string());
            tracing::info!(
                code = e.code(),
                error = machine.get_last_error().unwrap_or_default(),
                "publish failed, cleaning up"
            );
        }
        tracing::debug!("state history:\n{}", machine.get_history());
        let failures = scope.cleanup();
        if failures > 0 {
            tracing::debug!(failures, "some temporary paths could not be removed");
        }

        let outcome = result?;
        let skipped = outcome.artifact.is_none();
        Ok(PublishReport {
            source: absolutize(&options.source, &self.cwd),
            state: machine.get_state(),
            artifact: outcome.artifact,
            modules: outcome.modules,
            skipped,
            duration_ms: start_time.elapsed().as_millis() as u64,
            history: machine.transitions().to_vec(),
        })
    }

    async fn run(
        &self,
        options: &PublishOptions,
        machine: &mut PublishStateMachine,
        scope: &mut CleanupScope,
    ) -> Result<RunOutcome> {
        let resolve_mode = match &options.mode {
            PublishMode::ArchiveOnly { .. } => ResolveMode::ArchiveOnly,
            PublishMode::Upload { .. } => ResolveMode::Upload,
        };

        let source = resolve_source(&options.source, &self.cwd, resolve_mode)?;
        let upload = match &options.mode {
            PublishMode::Upload { container } => {
                let store = self.store.as_deref().ok_or_else(|| {
                    PublishError::Config(
                        "no storage configured; set storage.endpoint or storage.localRoot"
                            .to_string(),
                    )
                })?;
                let target =
                    BlobTarget::for_archive(container, Path::new(&source.archive_name()))?;
                Some((store, target))
            }
            PublishMode::ArchiveOnly { .. } => None,
        };
        advance(machine, PublishState::Resolved, &source.path().display().to_string())?;

        let (archive_path, modules) = if source.kind() == SourceKind::Archive {
            // Uploaded as-is under its own name.
            machine.transition_with_note(
                PublishState::Archived,
                Some("pre-built archive".to_string()),
            )?;
            tracing::info!(path = %source.path().display(), "using pre-built archive");
            (source.path().to_path_buf(), Vec::new())
        } else {
            match self.build(&source, options, machine, scope).await? {
                Some(built) => built,
                None => {
                    machine.transition_with_note(PublishState::Done, Some("skipped".to_string()))?;
                    return Ok(RunOutcome {
                        artifact: None,
                        modules: Vec::new(),
                    });
                }
            }
        };

        let Some((store, target)) = upload else {
            advance(machine, PublishState::Done, &archive_path.display().to_string())?;
            return Ok(RunOutcome {
                artifact: Some(Artifact::Local(archive_path)),
                modules,
            });
        };

        let description = format!(
            "Upload {} to container '{}' as blob '{}'",
            archive_path.display(),
            target.container,
            target.blob
        );
        let outcome = self
            .gate
            .run(&description, options.force, || async {
                store.ensure_container(&target.container).await?;
                if !options.force && store.blob_exists(&target).await? {
                    return Err(PublishError::DestinationExists {
                        destination: store.blob_uri(&target),
                    });
                }
                let content = tokio::fs::read(&archive_path)
                    .await
                    .map_err(|e| PublishError::io(&archive_path, e))?;
                store.upload_blob(&target, content, options.force).await
            })
            .await?;

        match outcome {
            GateOutcome::Taken(uri) => {
                advance(machine, PublishState::Uploaded, &uri)?;
                machine.transition(PublishState::Done)?;
                Ok(RunOutcome {
                    artifact: Some(Artifact::Remote(uri)),
                    modules,
                })
            }
            GateOutcome::Skipped => {
                machine.transition_with_note(PublishState::Done, Some("skipped".to_string()))?;
                Ok(RunOutcome {
                    artifact: None,
                    modules,
                })
            }
        }
    }

    /// Parse, stage and compress a script or module source
    ///
    /// Returns `None` when the gate declines the archive write.
    async fn build(
        &self,
        source: &ConfigurationSource,
        options: &PublishOptions,
        machine: &mut PublishStateMachine,
        scope: &mut CleanupScope,
    ) -> Result<Option<(PathBuf, Vec<String>)>> {
        let required = self
            .builder
            .required_modules(source, options.archive.skip_dependency_detection)?;
        advance(machine, PublishState::Parsed, &format!("{} module(s)", required.len()))?;

        let staged = self.builder.stage(source, &required, &options.archive, scope)?;
        advance(machine, PublishState::Staged, &staged.dir.display().to_string())?;
        let modules: Vec<String> = staged.modules.iter().map(|m| m.name.clone()).collect();

        let archive_path = match &options.mode {
            PublishMode::ArchiveOnly { output } => {
                let destination = absolutize(output, &self.cwd);
                if destination.exists() && !options.force {
                    return Err(PublishError::DestinationExists {
                        destination: destination.display().to_string(),
                    });
                }

                let description = format!(
                    "Create archive {} from {}",
                    destination.display(),
                    source.path().display()
                );
                let (staging, target, force) = (&staged.dir, &destination, options.force);
                let partials = &mut *scope;
                let outcome = self
                    .gate
                    .run(&description, force, move || async move {
                        ArchiveBuilder::compress(staging, target, force, partials)
                    })
                    .await?;
                match outcome {
                    GateOutcome::Taken(summary) => summary.path,
                    GateOutcome::Skipped => return Ok(None),
                }
            }
            PublishMode::Upload { .. } => {
                let dir = self
                    .builder
                    .temp_root()
                    .join(format!("{}{}", ARCHIVE_DIR_PREFIX, uuid::Uuid::new_v4()));
                std::fs::create_dir_all(&dir).map_err(|e| PublishError::io(&dir, e))?;
                scope.register_dir(&dir);

                let destination = dir.join(source.archive_name());
                scope.register_file(&destination);
                ArchiveBuilder::compress(&staged.dir, &destination, false, scope)?.path
            }
        };

        advance(machine, PublishState::Archived, &archive_path.display().to_string())?;
        Ok(Some((archive_path, modules)))
    }
}

/// Transition and report progress
fn advance(machine: &mut PublishStateMachine, to: PublishState, detail: &str) -> Result<()> {
    machine.transition_with_note(to, Some(detail.to_string()))?;
    tracing::info!(state = %to, "{}", detail);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalContainerStore;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    const SITE: &str = "Configuration Site {\n    Import-DscResource -ModuleName ModuleA\n    Node localhost {}\n}\n";

    struct Workspace {
        _dir: TempDir,
        root: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().to_path_buf();
            for sub in ["work", "modules/ModuleA/1.0.0/DSCResources", "tmp", "out", "store"] {
                fs::create_dir_all(root.join(sub)).unwrap();
            }
            fs::write(
                root.join("modules/ModuleA/1.0.0/ModuleA.psd1"),
                "@{ ModuleVersion = '1.0.0' }",
            )
            .unwrap();
            fs::write(
                root.join("modules/ModuleA/1.0.0/DSCResources/readme.txt"),
                "resources",
            )
            .unwrap();
            fs::write(root.join("work/site.ps1"), SITE).unwrap();
            Self { _dir: dir, root }
        }

        fn publisher(&self, gate: ConfirmGate) -> ConfigurationPublisher {
            ConfigurationPublisher::new(self.root.join("work"))
                .with_builder(ArchiveBuilder::new(
                    Box::new(DscScriptParser::new()),
                    ModuleLocator::new(vec![self.root.join("modules")]),
                    self.root.join("tmp"),
                ))
                .with_store(Box::new(LocalContainerStore::new(self.root.join("store"))))
                .with_gate(gate)
        }

        fn archive_only(&self, force: bool) -> PublishOptions {
            PublishOptions {
                source: PathBuf::from("site.ps1"),
                mode: PublishMode::ArchiveOnly {
                    output: self.root.join("out/site.zip"),
                },
                force,
                archive: ArchiveOptions::default(),
            }
        }

        fn upload(&self, force: bool) -> PublishOptions {
            PublishOptions {
                source: PathBuf::from("site.ps1"),
                mode: PublishMode::Upload {
                    container: "configs".to_string(),
                },
                force,
                archive: ArchiveOptions::default(),
            }
        }

        fn temp_is_empty(&self) -> bool {
            fs::read_dir(self.root.join("tmp")).unwrap().next().is_none()
        }
    }

    fn zip_names(path: &Path) -> Vec<String> {
        let zip = zip::ZipArchive::new(fs::File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = zip.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_archive_only_end_to_end() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::assume_yes());

        let report = publisher.publish(&ws.archive_only(false)).await.unwrap();

        let output = ws.root.join("out/site.zip");
        assert_eq!(report.artifact, Some(Artifact::Local(output.clone())));
        assert_eq!(report.state, PublishState::Done);
        assert_eq!(report.modules, vec!["ModuleA"]);
        assert!(!report.skipped);
        assert_eq!(
            zip_names(&output),
            vec![
                "ModuleA/",
                "ModuleA/DSCResources/",
                "ModuleA/DSCResources/readme.txt",
                "ModuleA/ModuleA.psd1",
                "site.ps1",
            ]
        );
        assert!(ws.temp_is_empty());

        let states: Vec<PublishState> = report.history.iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                PublishState::Resolved,
                PublishState::Parsed,
                PublishState::Staged,
                PublishState::Archived,
                PublishState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_second_run_without_force_fails_and_keeps_artifact() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::assume_yes());
        publisher.publish(&ws.archive_only(false)).await.unwrap();
        let output = ws.root.join("out/site.zip");
        let first = fs::read(&output).unwrap();

        let err = publisher.publish(&ws.archive_only(false)).await.unwrap_err();

        assert_eq!(err.code(), "DESTINATION_EXISTS");
        assert_eq!(fs::read(&output).unwrap(), first);
        assert!(ws.temp_is_empty());
    }

    #[tokio::test]
    async fn test_force_replaces_archive() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::assume_yes());
        publisher.publish(&ws.archive_only(false)).await.unwrap();
        fs::write(ws.root.join("work/site.ps1"), SITE.replace("localhost", "web01")).unwrap();

        publisher.publish(&ws.archive_only(true)).await.unwrap();

        let mut zip =
            zip::ZipArchive::new(fs::File::open(ws.root.join("out/site.zip")).unwrap()).unwrap();
        let mut script = String::new();
        zip.by_name("site.ps1")
            .unwrap()
            .read_to_string(&mut script)
            .unwrap();
        assert!(script.contains("web01"));
        assert_eq!(fs::read_dir(ws.root.join("out")).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_parse_error_leaves_no_temp_dirs() {
        let ws = Workspace::new();
        fs::write(ws.root.join("work/site.ps1"), "Configuration Site {\n").unwrap();
        let publisher = ws.publisher(ConfirmGate::assume_yes());

        let err = publisher.publish(&ws.archive_only(false)).await.unwrap_err();

        assert_eq!(err.code(), "PARSE_ERROR");
        assert!(ws.temp_is_empty());
        assert!(!ws.root.join("out/site.zip").exists());
    }

    #[tokio::test]
    async fn test_unknown_module_removes_staging() {
        let ws = Workspace::new();
        fs::write(
            ws.root.join("work/site.ps1"),
            "Configuration Site {\n  Import-DscResource -ModuleName NotInstalled\n}\n",
        )
        .unwrap();
        let publisher = ws.publisher(ConfirmGate::assume_yes());

        let err = publisher.publish(&ws.upload(false)).await.unwrap_err();

        assert_eq!(err.code(), "MODULE_NOT_FOUND");
        assert!(ws.temp_is_empty());
    }

    #[tokio::test]
    async fn test_upload_end_to_end() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::assume_yes());

        let report = publisher.publish(&ws.upload(false)).await.unwrap();

        let blob = ws.root.join("store/configs/site.ps1.zip");
        assert!(blob.is_file());
        match &report.artifact {
            Some(Artifact::Remote(uri)) => assert!(uri.ends_with("configs/site.ps1.zip")),
            other => panic!("unexpected artifact {:?}", other),
        }
        assert_eq!(zip_names(&blob).last().map(String::as_str), Some("site.ps1"));
        assert!(ws.temp_is_empty());
        assert_eq!(
            report.history.iter().map(|t| t.to).collect::<Vec<_>>(),
            vec![
                PublishState::Resolved,
                PublishState::Parsed,
                PublishState::Staged,
                PublishState::Archived,
                PublishState::Uploaded,
                PublishState::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_upload_existing_blob_requires_force() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::assume_yes());
        publisher.publish(&ws.upload(false)).await.unwrap();

        let err = publisher.publish(&ws.upload(false)).await.unwrap_err();
        assert_eq!(err.code(), "DESTINATION_EXISTS");
        assert!(ws.temp_is_empty());

        let report = publisher.publish(&ws.upload(true)).await.unwrap();
        assert!(matches!(report.artifact, Some(Artifact::Remote(_))));
    }

    #[tokio::test]
    async fn test_prebuilt_archive_is_uploaded_as_is() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::assume_yes());
        publisher.publish(&ws.archive_only(false)).await.unwrap();
        fs::copy(ws.root.join("out/site.zip"), ws.root.join("work/prebuilt.zip")).unwrap();
        let mut options = ws.upload(false);
        options.source = PathBuf::from("prebuilt.zip");

        let report = publisher.publish(&options).await.unwrap();

        assert_eq!(
            fs::read(ws.root.join("store/configs/prebuilt.zip")).unwrap(),
            fs::read(ws.root.join("work/prebuilt.zip")).unwrap()
        );
        assert!(report.modules.is_empty());
        assert_eq!(report.history[1].to, PublishState::Archived);
        assert!(ws.root.join("work/prebuilt.zip").exists());
    }

    #[tokio::test]
    async fn test_what_if_writes_nothing() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::what_if());

        let report = publisher.publish(&ws.upload(true)).await.unwrap();

        assert!(report.skipped);
        assert!(report.artifact.is_none());
        assert_eq!(report.state, PublishState::Done);
        assert!(!ws.root.join("store/configs").exists());
        assert!(ws.temp_is_empty());

        let report = publisher.publish(&ws.archive_only(true)).await.unwrap();
        assert!(report.skipped);
        assert!(!ws.root.join("out/site.zip").exists());
    }

    #[tokio::test]
    async fn test_upload_without_store_fails_before_staging() {
        let ws = Workspace::new();
        let publisher = ConfigurationPublisher::new(ws.root.join("work"))
            .with_builder(ArchiveBuilder::new(
                Box::new(DscScriptParser::new()),
                ModuleLocator::new(vec![ws.root.join("modules")]),
                ws.root.join("tmp"),
            ))
            .with_gate(ConfirmGate::assume_yes());

        let err = publisher.publish(&ws.upload(false)).await.unwrap_err();

        assert_eq!(err.code(), "CONFIG_ERROR");
        assert!(ws.temp_is_empty());
    }

    #[test]
    fn test_plan_locates_modules() {
        let ws = Workspace::new();
        let publisher = ws.publisher(ConfirmGate::what_if());

        let plan = publisher.plan(Path::new("site.ps1"), false).unwrap();

        assert_eq!(plan.archive_name, "site.ps1.zip");
        assert_eq!(plan.modules.len(), 1);
        assert_eq!(plan.modules[0].version.as_deref(), Some("1.0.0"));
        assert!(ws.temp_is_empty());
    }
}
