//! Configuration archives

pub mod builder;

pub use builder::{ArchiveBuilder, ArchiveOptions, ArchiveSummary, STAGING_PREFIX, StagedContent};
