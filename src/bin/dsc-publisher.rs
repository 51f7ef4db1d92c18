//! DSC Publisher CLI
//!
//! Packages a DSC configuration with its modules and publishes the archive

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dsc_publisher::archive::ArchiveOptions;
use dsc_publisher::core::config::{PublisherConfig, StorageConfig};
use dsc_publisher::{
    ArchiveBuilder, BlobServiceClient, CONFIG_FILENAME, ConfigLoadOptions, ConfigLoader,
    ConfigurationPublisher, ConfirmGate, ContentStore, DscScriptParser, LocalContainerStore,
    ModuleLocator, PublishError, PublishMode, PublishOptions, SasCredential,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::{EnvFilter, fmt};

/// Package and publish DSC configurations
#[derive(Parser, Debug)]
#[command(name = "dsc-publisher")]
#[command(version)]
#[command(about = "Package DSC configurations with their modules and publish them", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the archive and upload it to a blob container
    Publish {
        /// Configuration script (.ps1, .psm1) or pre-built archive (.zip)
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Target container (default: windows-powershell-dsc)
        #[arg(short, long)]
        container: Option<String>,

        /// Blob service endpoint, e.g. https://account.blob.core.windows.net
        #[arg(long)]
        endpoint: Option<String>,

        /// Publish into a local directory instead of the blob service
        #[arg(long, value_name = "DIR")]
        store_dir: Option<PathBuf>,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Build the archive and write it to a local file
    Archive {
        /// Configuration script (.ps1, .psm1)
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Archive file to create
        #[arg(short, long, value_name = "FILE")]
        output: PathBuf,

        #[command(flatten)]
        build: BuildArgs,
    },

    /// Resolve a configuration and its modules without writing anything
    Check {
        #[arg(value_name = "PATH")]
        path: PathBuf,

        /// Do not scan the script for required modules
        #[arg(long)]
        skip_dependency_detection: bool,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Initialize dsc-publisher configuration
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct BuildArgs {
    /// Configuration data file (.psd1) added to the archive
    #[arg(long, value_name = "FILE")]
    configuration_data: Option<PathBuf>,

    /// Extra file or directory added to the archive (repeatable)
    #[arg(long = "additional-path", value_name = "PATH")]
    additional_paths: Vec<PathBuf>,

    /// Do not scan the script for required modules
    #[arg(long)]
    skip_dependency_detection: bool,

    /// Overwrite an existing archive or blob
    #[arg(short, long)]
    force: bool,

    /// Do not ask for confirmation
    #[arg(short, long)]
    yes: bool,

    /// Describe what would happen without writing anything
    #[arg(long)]
    what_if: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl BuildArgs {
    fn archive_options(&self) -> ArchiveOptions {
        ArchiveOptions {
            configuration_data: self.configuration_data.clone(),
            additional_paths: self.additional_paths.clone(),
            skip_dependency_detection: self.skip_dependency_detection,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // What-if descriptions are logged at info level.
    let what_if = matches!(
        &cli.command,
        Commands::Publish { build, .. } | Commands::Archive { build, .. } if build.what_if
    );
    init_tracing(if what_if { cli.verbose.max(1) } else { cli.verbose });
    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    match run(cli).await {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("error: {:#}", e);
            process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("cannot determine the current directory")?;

    match cli.command {
        Commands::Publish {
            path,
            container,
            endpoint,
            store_dir,
            build,
        } => {
            let overrides = PublisherConfig {
                storage: Some(StorageConfig {
                    endpoint,
                    container,
                    local_root: store_dir,
                    ..Default::default()
                }),
                ..Default::default()
            };
            let Some(config) = load_config(&cwd, overrides).await? else {
                return Ok(1);
            };
            let mode = PublishMode::Upload {
                container: config.container().to_string(),
            };
            publish_command(&cwd, &config, path, mode, build).await
        }
        Commands::Archive {
            path,
            output,
            build,
        } => {
            let Some(config) = load_config(&cwd, PublisherConfig::default()).await? else {
                return Ok(1);
            };
            publish_command(&cwd, &config, path, PublishMode::ArchiveOnly { output }, build).await
        }
        Commands::Check {
            path,
            skip_dependency_detection,
            json,
        } => {
            let Some(config) = load_config(&cwd, PublisherConfig::default()).await? else {
                return Ok(1);
            };
            check_command(&cwd, &config, &path, skip_dependency_detection, json)
        }
        Commands::Init { force } => init_command(&cwd, force).await,
    }
}

/// Load and validate layered configuration; `None` when invalid
async fn load_config(cwd: &Path, overrides: PublisherConfig) -> Result<Option<PublisherConfig>> {
    let mut options = ConfigLoadOptions::from_process(cwd.to_path_buf());
    options.cli_args = Some(overrides);

    let config = match ConfigLoader::load(options).await {
        Ok(config) => config,
        Err(e) => {
            report_error(&e, false);
            return Ok(None);
        }
    };

    let validation = ConfigLoader::validate(&config);
    if !validation.valid {
        eprintln!("{}", ConfigLoader::format_validation_result(&validation));
        return Ok(None);
    }
    for warning in &validation.warnings {
        tracing::warn!("[{}] {}", warning.field, warning.message);
    }

    Ok(Some(config))
}

fn builder_for(config: &PublisherConfig) -> ArchiveBuilder {
    ArchiveBuilder::new(
        Box::new(DscScriptParser::new()),
        ModuleLocator::new(config.module_search_paths()),
        config.temp_dir(),
    )
}

fn store_for(config: &PublisherConfig) -> Result<Option<Box<dyn ContentStore>>, PublishError> {
    let Some(storage) = &config.storage else {
        return Ok(None);
    };

    if let Some(root) = &storage.local_root {
        return Ok(Some(Box::new(LocalContainerStore::new(root.clone()))));
    }
    if let Some(endpoint) = &storage.endpoint {
        let credential = SasCredential::from_env(config.sas_token_env());
        if let Some(credential) = &credential {
            tracing::debug!(token = %credential.masked(), "using SAS token from {}", config.sas_token_env());
        }
        let client = BlobServiceClient::new(endpoint, credential)?;
        return Ok(Some(Box::new(client)));
    }

    Ok(None)
}

fn gate_for(config: &PublisherConfig, build: &BuildArgs) -> ConfirmGate {
    if build.what_if {
        ConfirmGate::what_if()
    } else if build.yes || !config.confirm() {
        ConfirmGate::assume_yes()
    } else {
        ConfirmGate::interactive()
    }
}

async fn publish_command(
    cwd: &Path,
    config: &PublisherConfig,
    path: PathBuf,
    mode: PublishMode,
    build: BuildArgs,
) -> Result<i32> {
    let mut publisher = ConfigurationPublisher::new(cwd)
        .with_builder(builder_for(config))
        .with_gate(gate_for(config, &build));
    if matches!(mode, PublishMode::Upload { .. }) {
        match store_for(config) {
            Ok(Some(store)) => publisher = publisher.with_store(store),
            Ok(None) => {}
            Err(e) => return report_failure(e, build.json),
        }
    }

    let options = PublishOptions {
        source: path,
        mode,
        force: build.force,
        archive: build.archive_options(),
    };

    match publisher.publish(&options).await {
        Ok(report) => {
            if build.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                match &report.artifact {
                    Some(artifact) => println!("{}", artifact),
                    None => eprintln!("Skipped: nothing was written"),
                }
            }
            Ok(0)
        }
        Err(e) => {
            report_error(&e, build.json);
            Ok(1)
        }
    }
}

fn check_command(
    cwd: &Path,
    config: &PublisherConfig,
    path: &Path,
    skip_dependency_detection: bool,
    json: bool,
) -> Result<i32> {
    let publisher = ConfigurationPublisher::new(cwd).with_builder(builder_for(config));

    match publisher.plan(path, skip_dependency_detection) {
        Ok(plan) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&plan)?);
                return Ok(0);
            }

            println!("Source:  {}", plan.source.display());
            println!("Archive: {}", plan.archive_name);
            if plan.modules.is_empty() {
                println!("Modules: (none)");
            } else {
                println!("Modules:");
                for module in &plan.modules {
                    let version = module.version.as_deref().unwrap_or("-");
                    println!("  {} {} ({})", module.name, version, module.path.display());
                }
            }
            Ok(0)
        }
        Err(e) => {
            report_error(&e, json);
            Ok(1)
        }
    }
}

async fn init_command(cwd: &Path, force: bool) -> Result<i32> {
    let config_path = cwd.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        eprintln!(
            "{} already exists; use --force to overwrite",
            config_path.display()
        );
        return Ok(1);
    }

    tokio::fs::write(&config_path, PublisherConfig::default_yaml())
        .await
        .with_context(|| format!("failed to write {}", config_path.display()))?;
    println!("Created {}", config_path.display());
    Ok(0)
}

fn report_failure(error: PublishError, json: bool) -> Result<i32> {
    report_error(&error, json);
    Ok(1)
}

fn report_error(error: &PublishError, json: bool) {
    if json {
        let body = serde_json::json!({
            "error": {
                "code": error.code(),
                "category": error.category().to_string(),
                "message": error.to_string(),
                "suggestions": error.suggested_actions(),
            }
        });
        println!("{}", body);
        return;
    }

    eprintln!("error[{}] ({}): {}", error.code(), error.category(), error);
    for action in error.suggested_actions() {
        eprintln!("  - {}", action);
    }
}
