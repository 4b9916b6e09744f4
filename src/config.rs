//! Configuration management for hawatch
//!
//! Supports:
//! - TOML config file at XDG locations
//! - Environment variable overrides
//! - Command-line argument overrides

use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use config::{Config, Environment, File, FileFormat};
use env_logger::fmt::WriteStyle;
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::cli::{GlobalOpts, OutputFormat};

const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// Runtime context containing resolved configuration
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    pub global: GlobalOpts,
    pub config: AppConfig,
    config_path: PathBuf,
}

impl RuntimeContext {
    pub fn new(global: &GlobalOpts) -> Result<Self> {
        let config_path = resolve_config_path(global.config.as_ref())?;
        let config = load_config(&config_path)?;

        Ok(Self {
            global: global.clone(),
            config,
            config_path,
        })
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn init_logging(&self) -> Result<()> {
        if self.global.quiet {
            log::set_max_level(LevelFilter::Off);
            return Ok(());
        }

        let mut builder = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(&self.config.logging.level),
        );

        if let Some(level) = self.cli_log_level() {
            builder.filter_level(level);
        }

        let force_color = env::var_os("FORCE_COLOR").is_some();
        let disable_color = self.global.no_color
            || env::var_os("NO_COLOR").is_some()
            || (!force_color && !std::io::stderr().is_terminal());

        if disable_color {
            builder.write_style(WriteStyle::Never);
        } else if force_color {
            builder.write_style(WriteStyle::Always);
        } else {
            builder.write_style(WriteStyle::Auto);
        }

        builder.try_init().or_else(|err| {
            if self.global.verbose > 0 {
                eprintln!("logger already initialized: {err}");
            }
            Ok(())
        })
    }

    /// Level requested on the command line, if any. Without one the
    /// configured `logging.level` applies.
    fn cli_log_level(&self) -> Option<LevelFilter> {
        if self.global.trace {
            Some(LevelFilter::Trace)
        } else if self.global.debug {
            Some(LevelFilter::Debug)
        } else {
            match self.global.verbose {
                0 => None,
                1 => Some(LevelFilter::Info),
                2 => Some(LevelFilter::Debug),
                _ => Some(LevelFilter::Trace),
            }
        }
    }

    /// Get the effective companion WebSocket URL
    pub fn peer_url(&self) -> &str {
        self.global
            .peer
            .as_deref()
            .unwrap_or(&self.config.peer.url)
    }

    /// Get the effective settings file path
    pub fn settings_path(&self) -> Result<PathBuf> {
        if let Some(path) = self.global.settings.as_ref() {
            return expand_path(path);
        }
        if let Some(path) = self.config.settings.path.as_ref() {
            return expand_path(Path::new(path));
        }
        Ok(default_data_dir()?.join("settings.json"))
    }

    /// Get the effective output format
    pub fn output_format(&self) -> OutputFormat {
        if self.global.json {
            return OutputFormat::Json;
        }
        self.global
            .output_format
            .unwrap_or(match self.config.output.format.as_str() {
                "json" => OutputFormat::Json,
                "yaml" => OutputFormat::Yaml,
                _ => OutputFormat::Auto,
            })
    }
}

/// Application configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub peer: PeerConfig,
    pub settings: SettingsConfig,
    pub deadbolt: DeadboltConfig,
    /// Display label overrides, keyed by state or status key
    pub labels: HashMap<String, String>,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerConfig {
    pub url: String,
    pub reconnect: bool,
    pub reconnect_delay: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for PeerConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8765".to_string(),
            reconnect: true,
            reconnect_delay: 5,
            max_reconnect_attempts: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    pub path: Option<String>,
}

/// Simulated deadbolt on a smart lock: after an unlock the bolt throws
/// again on its own, so the panel shows `locking` once the interval passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeadboltConfig {
    pub enabled: bool,
    pub entity: String,
    /// Time to open the lock plus the time to close it again
    pub interval: String,
    /// Cancel a pending transition when a newer change for the same lock arrives
    pub cancel_stale: bool,
}

impl Default for DeadboltConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            entity: "lock.doorlock".to_string(),
            interval: "8s".to_string(),
            cancel_stale: false,
        }
    }
}

impl DeadboltConfig {
    pub fn interval(&self) -> Result<Duration> {
        humantime::parse_duration(&self.interval)
            .with_context(|| format!("parsing deadbolt interval '{}'", self.interval))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub format: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

fn resolve_config_path(override_path: Option<&PathBuf>) -> Result<PathBuf> {
    if let Some(path) = override_path {
        let expanded = expand_path(path)?;
        if expanded.is_dir() {
            return Ok(expanded.join("config.toml"));
        }
        return Ok(expanded);
    }

    Ok(default_config_dir()?.join("config.toml"))
}

fn load_config(config_path: &Path) -> Result<AppConfig> {
    // Create default config if it doesn't exist
    if !config_path.exists() {
        write_default_config(config_path)?;
    }

    let config = Config::builder()
        .set_default("peer.url", "ws://127.0.0.1:8765")?
        .set_default("peer.reconnect", true)?
        .set_default("peer.reconnect_delay", 5_i64)?
        .set_default("peer.max_reconnect_attempts", 0_i64)?
        .set_default("deadbolt.enabled", true)?
        .set_default("deadbolt.entity", "lock.doorlock")?
        .set_default("deadbolt.interval", "8s")?
        .set_default("deadbolt.cancel_stale", false)?
        .set_default("output.format", "auto")?
        .set_default("logging.level", "warn")?
        .add_source(
            File::from(config_path)
                .format(FileFormat::Toml)
                .required(false),
        )
        // HAWATCH__SECTION__KEY overrides
        .add_source(
            Environment::with_prefix("HAWATCH")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;
    app_config.deadbolt.interval()?;

    Ok(app_config)
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config")?;

    let content = format!(
        "# hawatch configuration\n\
        # File: {}\n\
        #\n\
        # Environment variables:\n\
        #   HAWATCH_PEER     - Companion WebSocket URL\n\
        #   HAWATCH_SETTINGS - Persisted settings file\n\
        #   HAWATCH__*       - Override any config value (e.g., HAWATCH__LOGGING__LEVEL=debug)\n\
        \n\
        {toml}",
        path.display()
    );

    fs::write(path, content).with_context(|| format!("writing config to {}", path.display()))
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    if let Some(text) = path.to_str() {
        let expanded = shellexpand::full(text).context("expanding path")?;
        Ok(PathBuf::from(expanded.to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}

fn default_config_dir() -> Result<PathBuf> {
    // Check XDG_CONFIG_HOME first
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    // Use platform-specific config directory
    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    // Fallback to ~/.config
    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn default_data_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_DATA_HOME").filter(|v| !v.is_empty()) {
        return Ok(PathBuf::from(dir).join(APP_NAME));
    }

    if let Some(mut dir) = dirs::data_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".local").join("share").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine data directory"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.peer.url, "ws://127.0.0.1:8765");
        assert!(config.peer.reconnect);
        assert!(config.deadbolt.enabled);
        assert_eq!(config.deadbolt.entity, "lock.doorlock");
        assert!(!config.deadbolt.cancel_stale);
        assert_eq!(config.output.format, "auto");
    }

    #[test]
    fn test_deadbolt_interval() {
        let config = DeadboltConfig::default();
        assert_eq!(config.interval().unwrap(), Duration::from_millis(8000));

        let bad = DeadboltConfig {
            interval: "soon".to_string(),
            ..DeadboltConfig::default()
        };
        assert!(bad.interval().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[peer]"));
        assert!(toml.contains("[deadbolt]"));
        assert!(toml.contains("[output]"));
        assert!(toml.contains("[logging]"));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[deadbolt]\nenabled = false\ninterval = \"2s\"\n\n[labels]\nlocking = \"Bolting\"\n",
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.deadbolt.enabled);
        assert_eq!(config.deadbolt.interval().unwrap(), Duration::from_secs(2));
        assert_eq!(config.deadbolt.entity, "lock.doorlock");
        assert_eq!(config.labels.get("locking").map(String::as_str), Some("Bolting"));
    }

    #[test]
    fn test_load_config_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.peer.reconnect_delay, 5);
    }
}
