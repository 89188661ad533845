//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "LCX_ROOT_FOLDER";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "lcx.db";

/// Contents of `config.toml`
///
/// Every field has a default so a partial (or missing) file still yields a
/// usable configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the database
    pub root_folder: Option<PathBuf>,
    /// Address the HTTP server binds to
    pub bind_address: String,
    /// Default tracing filter when RUST_LOG is unset
    pub log_level: String,
    /// Export list settings
    pub export: ExportConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            bind_address: "127.0.0.1:5780".to_string(),
            log_level: "info".to_string(),
            export: ExportConfig::default(),
        }
    }
}

/// `[export]` table of `config.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// CSV field delimiter (only the first byte is used)
    pub delimiter: String,
    /// CSV field enclosure (only the first byte is used)
    pub enclosure: String,
    /// Group used for permission checks when the request carries none
    pub default_group_id: i64,
    /// Row cap used when the database has no `NomostListNum` entry; -1 is unlimited
    pub list_row_limit: i64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            delimiter: ",".to_string(),
            enclosure: "\"".to_string(),
            default_group_id: 1,
            list_row_limit: -1,
        }
    }
}

impl ExportConfig {
    /// Delimiter byte, falling back to `,` for an empty setting
    pub fn delimiter_byte(&self) -> u8 {
        first_byte(&self.delimiter, b',')
    }

    /// Enclosure byte, falling back to `"` for an empty setting
    pub fn enclosure_byte(&self) -> u8 {
        first_byte(&self.enclosure, b'"')
    }

    /// Row cap as an optional count (`None` = unlimited)
    pub fn row_limit(&self) -> Option<usize> {
        row_limit_from(self.list_row_limit)
    }
}

/// Convert the stored signed limit into an optional row count
///
/// Negative values mean "no limit", matching the system configuration
/// convention of `-1`.
pub fn row_limit_from(value: i64) -> Option<usize> {
    usize::try_from(value).ok()
}

fn first_byte(value: &str, fallback: u8) -> u8 {
    value.as_bytes().first().copied().unwrap_or(fallback)
}

impl TomlConfig {
    /// Parse configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Load configuration, using defaults when no file exists
    ///
    /// A missing file is not an error: a warning is logged and compiled
    /// defaults are used. A file that exists but fails to parse is an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_config_path() {
                Some(path) => path,
                None => {
                    warn!("Could not determine config directory, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        if !path.exists() {
            warn!("Config file not found: {} (using defaults)", path.display());
            return Ok(Self::default());
        }

        Self::load(&path)
    }
}

/// Default location of `config.toml` for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lcx").join("config.toml"))
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variable
/// 3. TOML config file
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lcx"))
        .unwrap_or_else(|| PathBuf::from("./lcx_data"))
}

/// Database path inside a root folder
pub fn database_path(root_folder: &Path) -> PathBuf {
    root_folder.join(DATABASE_FILE_NAME)
}
