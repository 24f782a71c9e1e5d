//! Application configuration management.
//!
//! Settings are layered with figment, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `config.toml` in the platform config directory)
//! 3. `HASHMATCH_*` environment variables (e.g. `HASHMATCH_WORKERS=4`)
//!
//! CLI flags are applied on top by the caller.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::OutputFormat;
use crate::scanner::DEFAULT_BUFFER_SIZE;

/// Environment variable prefix for configuration overrides.
pub const ENV_PREFIX: &str = "HASHMATCH_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Requested worker count, 0 for automatic sizing.
    pub workers: usize,
    /// Digest algorithm selector.
    pub algorithm: String,
    /// Read buffer size in bytes.
    pub buffer_size: usize,
    /// Default output format.
    pub output: OutputFormat,
    /// Draw a progress bar for text output.
    pub progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 0,
            algorithm: "blake3".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            output: OutputFormat::Text,
            progress: true,
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// A layer contained an invalid value.
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),
}

impl Config {
    /// Load configuration, falling back to defaults on any error.
    ///
    /// Meant for the implicit platform path; use [`Config::load_from`] when
    /// the caller named a file and wants failures reported.
    pub fn load(path: Option<&Path>) -> Self {
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                log::debug!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Load configuration from `path` (or the default location) plus the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicit file is missing or any layer
    /// holds a value of the wrong type.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(p) if !p.exists() => return Err(ConfigError::NotFound(p.to_path_buf())),
            Some(p) => Some(p.to_path_buf()),
            None => Self::default_path(),
        };

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(ref file) = file {
            log::debug!("Reading configuration from {}", file.display());
            figment = figment.merge(Toml::file(file));
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        figment.extract().map_err(|e| ConfigError::Invalid(Box::new(e)))
    }

    /// Default platform-specific configuration path, if one can be determined.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "hashmatch", "hashmatch")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}
