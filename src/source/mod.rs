//! Configuration sources
//!
//! Resolving the caller's path and discovering the modules it imports.

pub mod parser;
pub mod resolver;

pub use parser::{
    BUILTIN_MODULES, DscScriptParser, ModuleDependencyParser, ParseOutcome, RequiredModule,
};
pub use resolver::{ConfigurationSource, ResolveMode, SourceKind, absolutize, resolve_source};
