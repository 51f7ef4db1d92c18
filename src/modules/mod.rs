//! Installed DSC modules

pub mod locator;
pub mod version;

pub use locator::{LocatedModule, ModuleLocator};
pub use version::{InvalidModuleVersion, ModuleVersion};
