//! Orchestration layer for configuration publishing
//!
//! Ties source resolution, archive building and storage into one run.

pub mod publisher;

pub use publisher::{
    ARCHIVE_DIR_PREFIX, Artifact, ConfigurationPublisher, PlannedModule, PublishMode,
    PublishOptions, PublishPlan, PublishReport,
};
