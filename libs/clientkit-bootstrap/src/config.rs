use anyhow::{Context, Result};
use clientkit::{
    EncoderFailurePolicy, LayeredEnvironment, MapEnvironment, ProcessEnvironment,
    RegistrarOptions, TransportConfig, BASE_LOCATIONS_KEY, LOG_LEVEL_KEY,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Host application configuration: logging, the client registration pass and
/// the property bag that `${...}` placeholders resolve against.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Base directory for relative log file paths (defaults to the working directory).
    #[serde(default)]
    pub home_dir: Option<PathBuf>,
    /// Logging configuration (optional, uses defaults if None).
    #[serde(default)]
    pub logging: Option<LoggingConfig>,
    #[serde(default)]
    pub clients: ClientsConfig,
    /// Free-form properties, e.g. `payments.url: https://pay.internal`.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientsConfig {
    /// Module paths to scan for contracts.
    pub base_locations: Vec<String>,
    /// Default HTTP log level (`NONE`, `BASIC`, `HEADERS`, `FULL`).
    pub log_level: Option<String>,
    pub fail_fast: bool,
    pub encoder_failure: EncoderFailurePolicy,
    pub transport: TransportConfig,
}

impl ClientsConfig {
    pub fn registrar_options(&self) -> RegistrarOptions {
        RegistrarOptions {
            fail_fast: self.fail_fast,
            encoder_failure: self.encoder_failure,
        }
    }
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/clientkit.log"; empty disables the file sink
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/clientkit.log".to_string(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            home_dir: None,
            logging: Some(default_logging_config()),
            clients: ClientsConfig::default(),
            properties: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        if !path.is_file() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        // Optional sections stay None unless YAML/ENV provide them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let figment = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(path))
            // Example: APP__CLIENTS__FAIL_FAST=true maps to clients.fail_fast
            .merge(Env::prefixed("APP__").split("__"));

        figment
            .extract()
            .with_context(|| format!("Failed to extract config from {}", path.display()))
    }

    /// Load configuration from file or create with default values.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Ok(Self::default()),
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if !args.locations.is_empty() {
            self.clients.base_locations = args.locations.clone();
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    /// Base directory for relative paths.
    pub fn base_dir(&self) -> PathBuf {
        self.home_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Environment the registrar resolves against.
    ///
    /// The `clients` section wins over `properties`, which wins over process
    /// environment variables.
    pub fn environment(&self) -> LayeredEnvironment {
        let mut configured: MapEnvironment = self
            .properties
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        if !self.clients.base_locations.is_empty() {
            configured.insert(BASE_LOCATIONS_KEY, self.clients.base_locations.join(","));
        }
        if let Some(level) = &self.clients.log_level {
            configured.insert(LOG_LEVEL_KEY, level.clone());
        }

        LayeredEnvironment::new()
            .with_layer(Arc::new(configured))
            .with_layer(Arc::new(ProcessEnvironment))
    }
}

/// Command line arguments structure.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub print_config: bool,
    pub verbose: u8,
    /// Replaces `clients.base_locations` when non-empty.
    pub locations: Vec<String>,
}
