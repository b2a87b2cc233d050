//! Configuration loading and folder resolution
//!
//! Resolution priority for every path setting:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. OS-dependent compiled default (fallback)
//!
//! A missing TOML file is never fatal: the caller gets defaults and a warning.
//! A TOML file that exists but cannot be parsed is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable overriding the root folder
pub const ENV_ROOT_FOLDER: &str = "GAMEREC_ROOT_FOLDER";

/// Environment variable overriding the model directory
pub const ENV_MODEL_DIR: &str = "GAMEREC_MODEL_DIR";

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset (e.g. "info", "gamerec_clean=debug")
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Contents of `config.toml`
///
/// Service-specific sections are kept as raw tables and parsed by the crate
/// that owns them (see `gamerec_clean::config::CleanerSettings`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Working folder holding datasets and the default model directory
    pub root_folder: Option<PathBuf>,
    /// Directory holding `model_<target>.json` artifacts
    pub model_dir: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// `[cleaner]` section
    #[serde(default)]
    pub cleaner: toml::Table,
}

/// OS-dependent defaults used when nothing else is configured
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub root_folder: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        let root_folder = dirs::data_local_dir()
            .map(|d| d.join("gamerec"))
            .unwrap_or_else(|| PathBuf::from("./gamerec_data"));

        Self {
            root_folder,
            log_level: default_log_level(),
        }
    }
}

/// Locate the default config file for the platform, if one exists
///
/// Linux: `~/.config/gamerec/config.toml`, then `/etc/gamerec/config.toml`.
/// Elsewhere: the platform config dir only.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("gamerec").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/gamerec/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load the TOML configuration
///
/// An explicit path must exist and parse. Without one, the platform default
/// location is tried; if nothing is found the defaults are returned.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) => path,
            None => {
                warn!("No config file found, using compiled defaults");
                return Ok(TomlConfig::default());
            }
        },
    };

    debug!(path = %path.display(), "Loading TOML config");
    let content = std::fs::read_to_string(&path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Root folder resolution following the priority order in the module docs
pub struct RootFolderResolver<'a> {
    cli_override: Option<PathBuf>,
    toml_config: Option<&'a TomlConfig>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new() -> Self {
        Self {
            cli_override: None,
            toml_config: None,
        }
    }

    pub fn with_cli_override(mut self, path: Option<PathBuf>) -> Self {
        self.cli_override = path;
        self
    }

    pub fn with_toml(mut self, config: &'a TomlConfig) -> Self {
        self.toml_config = Some(config);
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_override {
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ENV_ROOT_FOLDER) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = self.toml_config.and_then(|c| c.root_folder.clone()) {
            return path;
        }

        // Priority 4: OS-dependent compiled default
        CompiledDefaults::for_current_platform().root_folder
    }
}

impl Default for RootFolderResolver<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve the model directory: CLI → ENV → TOML → `<root>/models`
pub fn resolve_model_dir(
    cli_arg: Option<&Path>,
    toml_config: &TomlConfig,
    root_folder: &Path,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ENV_MODEL_DIR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml_config.model_dir {
        return path.clone();
    }

    root_folder.join("models")
}
