//! Package DSC configurations with the modules they import and publish the
//! resulting archive to disk or to blob storage.

pub mod archive;
pub mod core;
pub mod modules;
pub mod orchestration;
pub mod security;
pub mod source;
pub mod storage;

pub use crate::archive::{ArchiveBuilder, ArchiveOptions};
pub use crate::core::config::PublisherConfig;
pub use crate::core::config_loader::{CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader};
pub use crate::core::confirm::{ConfirmGate, ConfirmMode, GateOutcome};
pub use crate::core::error::{ErrorCategory, PublishError, Result};
pub use crate::core::state_machine::PublishState;
pub use crate::modules::ModuleLocator;
pub use crate::orchestration::{
    Artifact, ConfigurationPublisher, PublishMode, PublishOptions, PublishPlan, PublishReport,
};
pub use crate::security::SasCredential;
pub use crate::source::DscScriptParser;
pub use crate::storage::{BlobServiceClient, ContentStore, LocalContainerStore};
