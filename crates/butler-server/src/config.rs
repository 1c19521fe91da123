//! Server configuration
//!
//! Read once at startup from an optional config file (TOML, YAML or JSON by
//! extension) with `REDIS_BUTLER__*` environment variables layered on top.
//!
//! Keys are lowercased by the loader, environment names included.

use anyhow::{Context, Result};
use butler_core::types::{DEFAULT_PORT, DEFAULT_TIMEOUT};
use butler_core::{EnvironmentDescriptor, EnvironmentRegistry};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "redis-butler.toml";
pub const CONFIG_PATH_VAR: &str = "REDIS_BUTLER_CONFIG";
const ENV_PREFIX: &str = "REDIS_BUTLER";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Front-end assets served for every non-API path
    #[serde(default)]
    pub static_dir: Option<PathBuf>,
    #[serde(default)]
    pub environments: BTreeMap<String, EnvironmentSettings>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSettings {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub database: i64,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_bind_address() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

impl Settings {
    /// Load from `REDIS_BUTLER_CONFIG` (or `redis-butler.toml`) plus environment
    pub fn load() -> Result<Self> {
        // An explicitly named file must exist; the default one is optional
        let (path, required) = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => (path, true),
            Err(_) => (DEFAULT_CONFIG_PATH.to_string(), false),
        };
        Self::load_from(&path, required)
    }

    fn load_from(path: &str, required: bool) -> Result<Self> {
        tracing::info!("Loading configuration from {} (required={})", path, required);

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }

    /// Parse settings from an in-memory document
    #[cfg(test)]
    pub fn parse(content: &str, format: config::FileFormat) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(content, format))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Build the read-only environment registry
    pub fn registry(&self) -> Result<EnvironmentRegistry> {
        let descriptors = self.environments.iter().map(|(name, env)| {
            EnvironmentDescriptor::new(name.clone(), env.host.clone(), env.port)
                .with_database(env.database)
                .with_password(env.password.clone())
                .with_timeout(Duration::from_millis(env.timeout_ms))
        });

        EnvironmentRegistry::new(descriptors).context("Invalid environment configuration")
    }
}
