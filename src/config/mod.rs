// blob_backup/src/config/mod.rs
use crate::errors::{BackupError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration file read on every run, relative to the working directory.
pub const CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_OUTPUT_DIR: &str = "backups";
pub const DEFAULT_LOG_FILE: &str = "backup.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

// Structs for deserializing config.yaml / config.json
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfig {
    pub backup_dir: Option<PathBuf>,
    pub connection_string: Option<String>,
    pub container_name: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub archive_format: Option<ArchiveFormat>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz", alias = "tgz")]
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ArchiveFormat::Zip => "zip",
            ArchiveFormat::TarGz => "tar.gz",
        }
    }
}

// Application's internal configuration struct
#[derive(Clone)]
pub struct BackupConfig {
    pub backup_dir: PathBuf,
    pub connection_string: String,
    pub container_name: String,
    pub output_dir: PathBuf,
    pub archive_format: ArchiveFormat,
}

// The connection string carries account keys; keep it out of logs.
impl fmt::Debug for BackupConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackupConfig")
            .field("backup_dir", &self.backup_dir)
            .field("connection_string", &"<redacted>")
            .field("container_name", &self.container_name)
            .field("output_dir", &self.output_dir)
            .field("archive_format", &self.archive_format)
            .finish()
    }
}

impl BackupConfig {
    /// Reads and validates the configuration file. `.json` files are parsed as JSON,
    /// anything else as YAML.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            BackupError::Config(format!(
                "Failed to read config file at {}: {}",
                config_path.display(),
                e
            ))
        })?;

        let is_json = config_path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let raw_config: RawConfig = if is_json {
            serde_json::from_str(&config_content).map_err(|e| {
                BackupError::Config(format!(
                    "Failed to parse JSON from config file at {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        } else {
            serde_yaml::from_str(&config_content).map_err(|e| {
                BackupError::Config(format!(
                    "Failed to parse YAML from config file at {}: {}",
                    config_path.display(),
                    e
                ))
            })?
        };

        Self::from_raw(raw_config)
    }

    pub fn from_raw(raw_config: RawConfig) -> Result<Self> {
        let backup_dir = raw_config
            .backup_dir
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| required("backup_dir"))?;
        let connection_string = raw_config
            .connection_string
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| required("connection_string"))?;
        let container_name = raw_config
            .container_name
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| required("container_name"))?;

        Ok(BackupConfig {
            backup_dir,
            connection_string,
            container_name,
            output_dir: raw_config
                .output_dir
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            archive_format: raw_config.archive_format.unwrap_or_default(),
        })
    }
}

fn required(key: &str) -> BackupError {
    BackupError::Config(format!("{} must be set in the configuration file", key))
}

/// Where log lines go and how verbose they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub path: PathBuf,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            path: PathBuf::from(DEFAULT_LOG_FILE),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl LogConfig {
    /// Defaults overridden by `BACKUP_LOG_FILE` and `BACKUP_LOG_LEVEL`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = LogConfig::default();
        LogConfig {
            path: lookup("BACKUP_LOG_FILE")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            level: lookup("BACKUP_LOG_LEVEL")
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.level),
        }
    }
}
