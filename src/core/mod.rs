pub mod cleanup;
pub mod config;
pub mod config_loader;
pub mod confirm;
pub mod error;
pub mod state_machine;

pub use cleanup::CleanupScope;
pub use error::*;
