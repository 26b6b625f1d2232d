//! Application configuration: the optional TOML file and its merge with CLI
//! flags.
//!
//! Precedence is CLI flag, then config file, then built-in default.
//! Credentials are never read from the file.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use partsync_core::{
    AuthConfig, DEFAULT_BASE_URL, DEFAULT_BATCH_TARGET, DEFAULT_LOOKAHEAD, DEFAULT_MAX_RETRIES,
    DEFAULT_RETENTION_DAYS, DEFAULT_WORKERS, DatabaseOptions, MAX_LOOKAHEAD, VendorConfig,
};
use serde::Deserialize;

use crate::cli::Args;

/// Database file used when neither `--db` nor `database` is set.
pub const DEFAULT_DATABASE: &str = "partsync.db";

/// TOML-backed file configuration. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// SQLite database file.
    pub database: Option<PathBuf>,
    /// Vendor API base URL.
    pub base_url: Option<String>,
    /// Sync look-ahead depth (1..=16).
    pub lookahead: Option<usize>,
    /// Normalization workers (1..=100).
    pub workers: Option<usize>,
    /// Target parts per normalization batch.
    pub batch_target: Option<i64>,
    /// Eviction retention window in days.
    pub retention_days: Option<i64>,
    /// Attempts per page fetch.
    pub max_retries: Option<u32>,
    pub connect_timeout_secs: Option<u64>,
    pub read_timeout_secs: Option<u64>,
    /// Database pool max connections (1..=20).
    pub db_max_connections: Option<u32>,
    /// Database busy timeout in milliseconds.
    pub db_busy_timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Validates config values against runtime and CLI constraints.
    pub fn validate(&self) -> Result<()> {
        validate_range("lookahead", self.lookahead, 1, MAX_LOOKAHEAD)?;
        validate_range("workers", self.workers, 1, 100)?;
        validate_range("batch_target", self.batch_target, 1, 100_000)?;
        validate_range("retention_days", self.retention_days, 1, 3650)?;
        validate_range("max_retries", self.max_retries, 1, 10)?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1, 3600)?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1, 3600)?;
        validate_range("db_max_connections", self.db_max_connections, 1, 20)?;
        validate_range("db_busy_timeout_ms", self.db_busy_timeout_ms, 0, 120_000)?;

        if let Some(base_url) = &self.base_url
            && base_url.trim().is_empty()
        {
            bail!("Invalid config value for `base_url`: must not be empty");
        }
        Ok(())
    }
}

fn validate_range<T>(field: &str, value: Option<T>, min: T, max: T) -> Result<()>
where
    T: PartialOrd + std::fmt::Display + Copy,
{
    let Some(value) = value else {
        return Ok(());
    };
    if value < min || value > max {
        bail!("Invalid config value for `{field}`: {value}. Expected range: {min}..={max}");
    }
    Ok(())
}

/// Loaded config metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedConfig {
    /// Path the config was read from, if any.
    pub path: Option<PathBuf>,
    pub config: FileConfig,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/partsync/config.toml`
/// 2. `$HOME/.config/partsync/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    default_config_path_from(
        env_var_non_empty_os("XDG_CONFIG_HOME"),
        env_var_non_empty_os("HOME"),
    )
}

fn default_config_path_from(xdg_config_home: Option<OsString>, home: Option<OsString>) -> Option<PathBuf> {
    if let Some(xdg_config_home) = xdg_config_home {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("partsync")
                .join("config.toml"),
        );
    }
    Some(
        PathBuf::from(home?)
            .join(".config")
            .join("partsync")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist; the default path is used only if present.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig> {
    if let Some(path) = explicit {
        return Ok(LoadedConfig {
            path: Some(path.to_path_buf()),
            config: load_file_config(path)?,
        });
    }

    match resolve_default_config_path() {
        Some(path) if path.exists() => {
            let config = load_file_config(&path)?;
            Ok(LoadedConfig {
                path: Some(path),
                config,
            })
        }
        _ => Ok(LoadedConfig::default()),
    }
}

fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let config: FileConfig = toml::from_str(raw)?;
    config.validate()?;
    Ok(config)
}

/// Fully resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: PathBuf,
    pub database_options: DatabaseOptions,
    pub vendor: VendorConfig,
    pub auth: AuthConfig,
    pub lookahead: usize,
    pub workers: usize,
    pub batch_target: i64,
    pub retention_days: i64,
    pub max_retries: u32,
}

impl Settings {
    /// Merges CLI flags over `file` over built-in defaults.
    #[must_use]
    pub fn resolve(args: &Args, file: &FileConfig) -> Self {
        let vendor_defaults = VendorConfig::default();
        let database_defaults = DatabaseOptions::default();

        let vendor = VendorConfig {
            base_url: args
                .base_url
                .clone()
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            connect_timeout: file
                .connect_timeout_secs
                .map_or(vendor_defaults.connect_timeout, Duration::from_secs),
            read_timeout: file
                .read_timeout_secs
                .map_or(vendor_defaults.read_timeout, Duration::from_secs),
        };

        Self {
            database: args
                .db
                .clone()
                .or_else(|| file.database.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE)),
            database_options: DatabaseOptions {
                max_connections: file
                    .db_max_connections
                    .unwrap_or(database_defaults.max_connections),
                busy_timeout_ms: file
                    .db_busy_timeout_ms
                    .unwrap_or(database_defaults.busy_timeout_ms),
            },
            vendor,
            auth: AuthConfig::new(args.app_key.clone(), args.app_secret.clone()),
            lookahead: args
                .lookahead
                .map(usize::from)
                .or(file.lookahead)
                .unwrap_or(DEFAULT_LOOKAHEAD),
            workers: args
                .workers
                .map(usize::from)
                .or(file.workers)
                .unwrap_or(DEFAULT_WORKERS),
            batch_target: args
                .batch_target
                .map(i64::from)
                .or(file.batch_target)
                .unwrap_or(DEFAULT_BATCH_TARGET),
            retention_days: args
                .retention_days
                .map(i64::from)
                .or(file.retention_days)
                .unwrap_or(DEFAULT_RETENTION_DAYS),
            max_retries: args
                .max_retries
                .map(u32::from)
                .or(file.max_retries)
                .unwrap_or(DEFAULT_MAX_RETRIES),
        }
    }
}
