//! Configuration structures and types for dsc-publisher
//!
//! This module provides type-safe configuration management with serde support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Container used when neither the CLI nor the config names one
pub const DEFAULT_CONTAINER: &str = "windows-powershell-dsc";

/// Environment variable holding the SAS token by default
pub const DEFAULT_SAS_TOKEN_ENV: &str = "DSC_STORAGE_SAS_TOKEN";

/// Root configuration object
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherConfig {
    /// Schema version (required)
    pub version: String,

    /// Extend from base configuration file (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,

    /// Remote storage settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<StorageConfig>,

    /// Module discovery settings (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<ModulesConfig>,

    /// Publish behaviour (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish: Option<PublishBehaviourConfig>,
}

/// Blob storage settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StorageConfig {
    /// Blob service endpoint, e.g. `https://account.blob.core.windows.net`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Default container name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Name of the environment variable holding the SAS token
    #[serde(skip_serializing_if = "Option::is_none", rename = "sasTokenEnv")]
    pub sas_token_env: Option<String>,

    /// Local directory standing in for the blob service
    #[serde(skip_serializing_if = "Option::is_none", rename = "localRoot")]
    pub local_root: Option<PathBuf>,
}

/// Module discovery settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ModulesConfig {
    /// Directories searched for installed modules, in order
    #[serde(default, rename = "searchPaths")]
    pub search_paths: Vec<PathBuf>,
}

/// Publish behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PublishBehaviourConfig {
    /// Prompt before mutating steps (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confirm: Option<bool>,

    /// Where staging directories and temporary archives are created
    #[serde(skip_serializing_if = "Option::is_none", rename = "tempDir")]
    pub temp_dir: Option<PathBuf>,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            extends: None,
            storage: None,
            modules: None,
            publish: None,
        }
    }
}

impl PublisherConfig {
    /// Container to upload to when the caller names none
    pub fn container(&self) -> &str {
        self.storage
            .as_ref()
            .and_then(|s| s.container.as_deref())
            .unwrap_or(DEFAULT_CONTAINER)
    }

    /// Environment variable consulted for the SAS token
    pub fn sas_token_env(&self) -> &str {
        self.storage
            .as_ref()
            .and_then(|s| s.sas_token_env.as_deref())
            .unwrap_or(DEFAULT_SAS_TOKEN_ENV)
    }

    /// Configured module search paths
    pub fn module_search_paths(&self) -> Vec<PathBuf> {
        self.modules
            .as_ref()
            .map(|m| m.search_paths.clone())
            .unwrap_or_default()
    }

    /// Whether mutating steps are confirmed interactively
    pub fn confirm(&self) -> bool {
        self.publish
            .as_ref()
            .and_then(|p| p.confirm)
            .unwrap_or(true)
    }

    /// Directory for staging and temporary archives
    pub fn temp_dir(&self) -> PathBuf {
        self.publish
            .as_ref()
            .and_then(|p| p.temp_dir.clone())
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Render a commented default configuration file
    pub fn default_yaml() -> String {
        format!(
            r#"# dsc-publisher configuration
version: "1.0"

storage:
  # endpoint: https://${{DSC_STORAGE_ACCOUNT}}.blob.core.windows.net
  container: {container}
  sasTokenEnv: {token_env}

modules:
  searchPaths: []

publish:
  confirm: true
"#,
            container = DEFAULT_CONTAINER,
            token_env = DEFAULT_SAS_TOKEN_ENV,
        )
    }
}
