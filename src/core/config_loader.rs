//! Configuration file loader for dsc-publisher
//!
//! This module provides configuration loading, validation, and merging capabilities.

use super::config::*;
use crate::core::error::PublishError;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Configuration file name
pub const CONFIG_FILENAME: &str = ".dsc-publisher.yaml";

lazy_static! {
    /// Environment variable pattern (${VAR_NAME})
    static ref ENV_VAR_REGEX: Regex = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
}

/// Configuration load options
#[derive(Debug, Clone)]
pub struct ConfigLoadOptions {
    /// Project path to load config from
    pub project_path: PathBuf,

    /// Home directory holding the global config (skipped when `None`)
    pub home_dir: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<PublisherConfig>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options for `project_path` using the process environment
    pub fn from_process(project_path: PathBuf) -> Self {
        let env: HashMap<String, String> = std::env::vars().collect();
        let home_dir = env.get("HOME").or_else(|| env.get("USERPROFILE")).map(PathBuf::from);

        Self {
            project_path,
            home_dir,
            cli_args: None,
            env,
        }
    }
}

/// Configuration validation result
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationResult {
    /// Is configuration valid?
    pub valid: bool,

    /// Validation errors
    pub errors: Vec<ConfigValidationError>,

    /// Validation warnings
    pub warnings: Vec<ConfigValidationWarning>,
}

/// Configuration validation error
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationError {
    /// Field path (e.g., "storage.endpoint")
    pub field: String,

    /// Error message
    pub message: String,
}

/// Configuration validation warning
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigValidationWarning {
    /// Field path
    pub field: String,

    /// Warning message
    pub message: String,

    /// Suggestion
    pub suggestion: Option<String>,
}

/// Configuration file loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Project config (./.dsc-publisher.yaml)
    /// 4. Global config (~/.dsc-publisher.yaml)
    /// 5. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<PublisherConfig, PublishError> {
        let mut configs: Vec<PublisherConfig> = vec![PublisherConfig::default()];

        if let Some(home_dir) = &options.home_dir
            && let Some(global_config) = Self::load_config_file(&home_dir.join(CONFIG_FILENAME)).await?
        {
            configs.push(global_config);
        }

        let project_config_path = options.project_path.join(CONFIG_FILENAME);
        if let Some(project_config) = Self::load_config_file(&project_config_path).await? {
            configs.push(project_config);
        }

        if let Some(env_config) = Self::load_env_config(&options.env) {
            configs.push(env_config);
        }

        if let Some(cli_config) = options.cli_args {
            configs.push(cli_config);
        }

        let merged_config = Self::merge_configs(configs);

        Ok(Self::expand_env_vars(merged_config, &options.env))
    }

    /// Load configuration from YAML file
    fn load_config_file(
        file_path: &Path,
    ) -> std::pin::Pin<
        Box<
            dyn std::future::Future<Output = Result<Option<PublisherConfig>, PublishError>>
                + Send
                + '_,
        >,
    > {
        Box::pin(async move {
            if !file_path.exists() {
                return Ok(None);
            }

            let content = fs::read_to_string(file_path).await.map_err(|e| {
                PublishError::Config(format!(
                    "failed to read {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            let config: PublisherConfig = serde_yaml::from_str(&content).map_err(|e| {
                PublishError::Config(format!(
                    "failed to parse {}: {}",
                    file_path.display(),
                    e
                ))
            })?;

            if let Some(extends_path) = &config.extends {
                let base_path = file_path
                    .parent()
                    .ok_or_else(|| PublishError::Config("invalid config file path".to_string()))?
                    .join(extends_path);

                if let Some(base_config) = Self::load_config_file(&base_path).await? {
                    return Ok(Some(Self::merge_configs(vec![base_config, config])));
                }
            }

            Ok(Some(config))
        })
    }

    /// Load configuration from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Option<PublisherConfig> {
        let mut config = PublisherConfig::default();
        let mut has_changes = false;

        let mut storage = StorageConfig::default();
        if let Some(endpoint) = env.get("DSC_STORAGE_ENDPOINT") {
            storage.endpoint = Some(endpoint.clone());
            has_changes = true;
        }
        if let Some(container) = env.get("DSC_CONTAINER") {
            storage.container = Some(container.clone());
            has_changes = true;
        }
        if storage != StorageConfig::default() {
            config.storage = Some(storage);
        }

        // DSC_MODULE_PATH -> modules.searchPaths, split like PSModulePath
        if let Some(module_path) = env.get("DSC_MODULE_PATH") {
            let search_paths: Vec<PathBuf> = std::env::split_paths(module_path)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !search_paths.is_empty() {
                config.modules = Some(ModulesConfig { search_paths });
                has_changes = true;
            }
        }

        // DSC_NON_INTERACTIVE -> publish.confirm = false
        if env.get("DSC_NON_INTERACTIVE").map(|s| s.as_str()) == Some("true") {
            config.publish = Some(PublishBehaviourConfig {
                confirm: Some(false),
                ..Default::default()
            });
            has_changes = true;
        }

        if has_changes { Some(config) } else { None }
    }

    /// Merge multiple configurations with priority
    fn merge_configs(configs: Vec<PublisherConfig>) -> PublisherConfig {
        let mut result = PublisherConfig::default();

        for config in configs {
            Self::merge_into(&mut result, config);
        }

        result
    }

    /// Merge source config into target
    fn merge_into(target: &mut PublisherConfig, source: PublisherConfig) {
        if !source.version.is_empty() {
            target.version = source.version;
        }

        if source.extends.is_some() {
            target.extends = source.extends;
        }

        if let Some(source_storage) = source.storage {
            let target_storage = target.storage.get_or_insert_with(StorageConfig::default);
            if source_storage.endpoint.is_some() {
                target_storage.endpoint = source_storage.endpoint;
            }
            if source_storage.container.is_some() {
                target_storage.container = source_storage.container;
            }
            if source_storage.sas_token_env.is_some() {
                target_storage.sas_token_env = source_storage.sas_token_env;
            }
            if source_storage.local_root.is_some() {
                target_storage.local_root = source_storage.local_root;
            }
        }

        // Later search paths take precedence over earlier ones.
        if let Some(source_modules) = source.modules {
            let target_modules = target.modules.get_or_insert_with(ModulesConfig::default);
            let mut search_paths = source_modules.search_paths;
            for path in target_modules.search_paths.drain(..) {
                if !search_paths.contains(&path) {
                    search_paths.push(path);
                }
            }
            target_modules.search_paths = search_paths;
        }

        if let Some(source_publish) = source.publish {
            let target_publish = target
                .publish
                .get_or_insert_with(PublishBehaviourConfig::default);
            if source_publish.confirm.is_some() {
                target_publish.confirm = source_publish.confirm;
            }
            if source_publish.temp_dir.is_some() {
                target_publish.temp_dir = source_publish.temp_dir;
            }
        }
    }

    /// Expand `${VAR}` references in the storage endpoint
    fn expand_env_vars(mut config: PublisherConfig, env: &HashMap<String, String>) -> PublisherConfig {
        if let Some(storage) = &mut config.storage
            && let Some(endpoint) = &storage.endpoint
        {
            storage.endpoint = Some(Self::expand_string(endpoint, env));
        }

        config
    }

    /// Expand environment variables in a single string
    ///
    /// Unknown variables are left in place.
    fn expand_string(input: &str, env: &HashMap<String, String>) -> String {
        ENV_VAR_REGEX
            .replace_all(input, |caps: &regex::Captures<'_>| match env.get(&caps[1]) {
                Some(value) => value.clone(),
                None => {
                    tracing::warn!("environment variable {} not found", &caps[1]);
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Validate configuration
    pub fn validate(config: &PublisherConfig) -> ConfigValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Check version (required)
        if config.version.is_empty() {
            errors.push(ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
            });
        } else if config.version != "1.0" {
            warnings.push(ConfigValidationWarning {
                field: "version".to_string(),
                message: format!("Unknown version: {}", config.version),
                suggestion: Some("Currently supported version is \"1.0\" only".to_string()),
            });
        }

        // 2. Storage
        if let Some(storage) = &config.storage {
            Self::validate_storage(storage, &mut errors, &mut warnings);
        }

        // 3. Module search paths
        if let Some(modules) = &config.modules {
            for (i, path) in modules.search_paths.iter().enumerate() {
                if path.is_relative() {
                    warnings.push(ConfigValidationWarning {
                        field: format!("modules.searchPaths[{}]", i),
                        message: format!("{} is relative", path.display()),
                        suggestion: Some(
                            "Relative paths are resolved against the working directory".to_string(),
                        ),
                    });
                }
            }
        }

        ConfigValidationResult {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    fn validate_storage(
        storage: &StorageConfig,
        errors: &mut Vec<ConfigValidationError>,
        warnings: &mut Vec<ConfigValidationWarning>,
    ) {
        if let Some(endpoint) = &storage.endpoint {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                errors.push(ConfigValidationError {
                    field: "storage.endpoint".to_string(),
                    message: format!("{} is not an http(s) URL", endpoint),
                });
            } else if endpoint.starts_with("http://") {
                warnings.push(ConfigValidationWarning {
                    field: "storage.endpoint".to_string(),
                    message: "endpoint does not use TLS".to_string(),
                    suggestion: Some("Use an https:// endpoint".to_string()),
                });
            }
        }

        if let Some(container) = &storage.container
            && !is_valid_container_name(container)
        {
            errors.push(ConfigValidationError {
                field: "storage.container".to_string(),
                message: format!(
                    "'{}' must be 3-63 lowercase letters, digits or single hyphens",
                    container
                ),
            });
        }
    }

    /// Format validation result as human-readable string
    pub fn format_validation_result(result: &ConfigValidationResult) -> String {
        let mut lines = Vec::new();

        if result.valid {
            lines.push("✅ Configuration validation succeeded".to_string());
        } else {
            lines.push("❌ Configuration has errors".to_string());
        }

        if !result.errors.is_empty() {
            lines.push("\n🔴 Errors:".to_string());
            for error in &result.errors {
                lines.push(format!("  - [{}] {}", error.field, error.message));
            }
        }

        if !result.warnings.is_empty() {
            lines.push("\n🟡 Warnings:".to_string());
            for warning in &result.warnings {
                lines.push(format!("  - [{}] {}", warning.field, warning.message));
                if let Some(suggestion) = &warning.suggestion {
                    lines.push(format!("    Suggestion: {}", suggestion));
                }
            }
        }

        lines.join("\n")
    }
}

/// Blob container naming rules: 3-63 chars, lowercase alphanumerics and
/// hyphens, starting and ending alphanumeric, no double hyphen
pub fn is_valid_container_name(name: &str) -> bool {
    let len_ok = (3..=63).contains(&name.len());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let edges_ok = !name.starts_with('-') && !name.ends_with('-');

    len_ok && chars_ok && edges_ok && !name.contains("--")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options_for(project: &Path) -> ConfigLoadOptions {
        ConfigLoadOptions {
            project_path: project.to_path_buf(),
            home_dir: None,
            cli_args: None,
            env: HashMap::new(),
        }
    }

    #[test]
    fn test_load_env_config() {
        let mut env = HashMap::new();
        env.insert("DSC_CONTAINER".to_string(), "configs".to_string());
        env.insert("DSC_NON_INTERACTIVE".to_string(), "true".to_string());

        let config = ConfigLoader::load_env_config(&env).unwrap();

        assert_eq!(config.container(), "configs");
        assert!(!config.confirm());
    }

    #[test]
    fn test_load_env_config_module_path() {
        let joined = std::env::join_paths(["/opt/a", "/opt/b"]).unwrap();
        let mut env = HashMap::new();
        env.insert(
            "DSC_MODULE_PATH".to_string(),
            joined.to_string_lossy().into_owned(),
        );

        let config = ConfigLoader::load_env_config(&env).unwrap();

        assert_eq!(
            config.module_search_paths(),
            vec![PathBuf::from("/opt/a"), PathBuf::from("/opt/b")]
        );
    }

    #[test]
    fn test_load_env_config_empty() {
        assert!(ConfigLoader::load_env_config(&HashMap::new()).is_none());
    }

    #[test]
    fn test_expand_string() {
        let mut env = HashMap::new();
        env.insert("DSC_STORAGE_ACCOUNT".to_string(), "contoso".to_string());

        let input = "https://${DSC_STORAGE_ACCOUNT}.blob.core.windows.net";
        let result = ConfigLoader::expand_string(input, &env);

        assert_eq!(result, "https://contoso.blob.core.windows.net");
    }

    #[test]
    fn test_expand_string_keeps_unknown_variables() {
        let result = ConfigLoader::expand_string("https://${MISSING}.example", &HashMap::new());

        assert_eq!(result, "https://${MISSING}.example");
    }

    #[tokio::test]
    async fn test_load_project_config_with_extends() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("base.yaml"),
            "version: \"1.0\"\nstorage:\n  container: base-container\n  sasTokenEnv: BASE_SAS\n",
        )
        .unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            "version: \"1.0\"\nextends: base.yaml\nstorage:\n  container: project-container\n",
        )
        .unwrap();

        let config = ConfigLoader::load(options_for(temp_dir.path())).await.unwrap();

        assert_eq!(config.container(), "project-container");
        assert_eq!(config.sas_token_env(), "BASE_SAS");
    }

    #[tokio::test]
    async fn test_load_priority_cli_over_env_over_file() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILENAME),
            "version: \"1.0\"\nstorage:\n  container: from-file\n  endpoint: https://${ACCOUNT}.blob.core.windows.net\n",
        )
        .unwrap();

        let mut options = options_for(temp_dir.path());
        options
            .env
            .insert("DSC_CONTAINER".to_string(), "from-env".to_string());
        options
            .env
            .insert("ACCOUNT".to_string(), "contoso".to_string());

        let config = ConfigLoader::load(options.clone()).await.unwrap();
        assert_eq!(config.container(), "from-env");
        assert_eq!(
            config.storage.as_ref().unwrap().endpoint.as_deref(),
            Some("https://contoso.blob.core.windows.net")
        );

        options.cli_args = Some(PublisherConfig {
            storage: Some(StorageConfig {
                container: Some("from-cli".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        });
        let config = ConfigLoader::load(options).await.unwrap();
        assert_eq!(config.container(), "from-cli");
    }

    #[tokio::test]
    async fn test_load_rejects_malformed_yaml() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILENAME), "storage: [unclosed").unwrap();

        let err = ConfigLoader::load(options_for(temp_dir.path()))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_merge_search_paths_prefers_later_sources() {
        let global = PublisherConfig {
            modules: Some(ModulesConfig {
                search_paths: vec![PathBuf::from("/global")],
            }),
            ..Default::default()
        };
        let project = PublisherConfig {
            modules: Some(ModulesConfig {
                search_paths: vec![PathBuf::from("/project")],
            }),
            ..Default::default()
        };

        let merged = ConfigLoader::merge_configs(vec![global, project]);

        assert_eq!(
            merged.module_search_paths(),
            vec![PathBuf::from("/project"), PathBuf::from("/global")]
        );
    }

    #[test]
    fn test_validate_version_required() {
        let config = PublisherConfig {
            version: String::new(),
            ..Default::default()
        };

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].field, "version");
    }

    #[test]
    fn test_validate_storage() {
        let config = PublisherConfig {
            storage: Some(StorageConfig {
                endpoint: Some("ftp://nope".to_string()),
                container: Some("Bad_Name".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let result = ConfigLoader::validate(&config);

        assert!(!result.valid);
        let fields: Vec<_> = result.errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"storage.endpoint"));
        assert!(fields.contains(&"storage.container"));
    }

    #[test]
    fn test_container_names() {
        assert!(is_valid_container_name("windows-powershell-dsc"));
        assert!(is_valid_container_name("configs"));
        assert!(!is_valid_container_name("ab"));
        assert!(!is_valid_container_name("Configs"));
        assert!(!is_valid_container_name("-configs"));
        assert!(!is_valid_container_name("con--figs"));
    }

    #[test]
    fn test_format_validation_result() {
        let result = ConfigValidationResult {
            valid: false,
            errors: vec![ConfigValidationError {
                field: "version".to_string(),
                message: "Version is required".to_string(),
            }],
            warnings: vec![ConfigValidationWarning {
                field: "storage.endpoint".to_string(),
                message: "endpoint does not use TLS".to_string(),
                suggestion: Some("Use an https:// endpoint".to_string()),
            }],
        };

        let formatted = ConfigLoader::format_validation_result(&result);

        assert!(formatted.contains("❌ Configuration has errors"));
        assert!(formatted.contains("[version]"));
        assert!(formatted.contains("🟡 Warnings:"));
        assert!(formatted.contains("Suggestion: Use an https:// endpoint"));
    }
}
