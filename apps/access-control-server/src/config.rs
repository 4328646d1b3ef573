use std::path::Path;

use access_control::AccessControlConfig;
use anyhow::Context;
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use serde::Deserialize;
use static_grants_plugin::StaticGrantsPluginConfig;

/// Demo server guarding video routes with ownership-aware access control.
#[derive(Debug, Parser)]
#[command(name = "access-control-server", version)]
pub struct Cli {
    /// YAML configuration file. `ACL_*` environment variables override it.
    #[arg(short, long)]
    pub config: Option<std::path::PathBuf>,

    /// Override the listen address.
    #[arg(long)]
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub database_url: String,
    /// Create and populate the demo `video` table on startup.
    pub seed_demo_data: bool,
    pub logging: LoggingConfig,
    pub access_control: AccessControlConfig,
    pub grants: StaticGrantsPluginConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8087".to_owned(),
            database_url: "sqlite::memory:".to_owned(),
            seed_demo_data: true,
            logging: LoggingConfig::default(),
            access_control: AccessControlConfig::default(),
            grants: StaticGrantsPluginConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl ServerConfig {
    /// Load configuration: defaults, then the YAML file, then `ACL_*` env vars.
    ///
    /// Nested keys use a double underscore: `ACL_LOGGING__LEVEL=debug`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing or any layer fails to deserialize.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            anyhow::ensure!(path.exists(), "config file not found: {}", path.display());
            figment = figment.merge(Yaml::file(path));
        }
        figment = figment.merge(Env::prefixed("ACL_").split("__"));

        figment
            .extract::<Self>()
            .context("failed to load server configuration")
    }

    #[must_use]
    pub fn with_cli_overrides(mut self, cli: &Cli) -> Self {
        if let Some(bind) = &cli.bind {
            self.bind_addr.clone_from(bind);
        }
        self
    }
}
