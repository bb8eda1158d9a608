//! Configuration management.
//!
//! Loads settings from `$TWEAKWISE_CONFIG` or `<config dir>/tweakwise/config.toml`,
//! falling back to defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment override for the config file location
pub const CONFIG_ENV: &str = "TWEAKWISE_CONFIG";

/// Engine timeouts and concurrency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Per-probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Per-mutation timeout in seconds
    #[serde(default = "default_mutate_timeout")]
    pub mutate_timeout_secs: u64,

    /// Upper bound on probes running at once
    #[serde(default = "default_max_concurrent_probes")]
    pub max_concurrent_probes: usize,
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_mutate_timeout() -> u64 {
    60 // service stop can take a while
}

fn default_max_concurrent_probes() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            mutate_timeout_secs: default_mutate_timeout(),
            max_concurrent_probes: default_max_concurrent_probes(),
        }
    }
}

impl EngineConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn mutate_timeout(&self) -> Duration {
        Duration::from_secs(self.mutate_timeout_secs)
    }
}

/// Programs used to talk to the OS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellConfig {
    /// Interpreter for command tweaks
    #[serde(default = "default_shell_program")]
    pub program: String,

    /// Arguments placed before the command text
    #[serde(default = "default_shell_args")]
    pub args: Vec<String>,

    #[serde(default = "default_reg_program")]
    pub reg_program: String,

    #[serde(default = "default_sc_program")]
    pub sc_program: String,
}

fn default_shell_program() -> String {
    "powershell.exe".to_string()
}

fn default_shell_args() -> Vec<String> {
    vec![
        "-NoProfile".to_string(),
        "-NonInteractive".to_string(),
        "-Command".to_string(),
    ]
}

fn default_reg_program() -> String {
    "reg.exe".to_string()
}

fn default_sc_program() -> String {
    "sc.exe".to_string()
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            program: default_shell_program(),
            args: default_shell_args(),
            reg_program: default_reg_program(),
            sc_program: default_sc_program(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_color")]
    pub color: bool,

    /// Include tweaks whose key or service is missing in listings
    #[serde(default)]
    pub show_unavailable: bool,
}

fn default_color() -> bool {
    true
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            color: default_color(),
            show_unavailable: false,
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub display: DisplayConfig,
}

impl Config {
    /// Default config file location, if the platform has a config directory
    pub fn default_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("tweakwise").join("config.toml"))
    }

    /// Load config from the default location, or return defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load_from_path(&path).unwrap_or_else(|e| {
                warn!("Invalid config at {}, using defaults: {}", path.display(), e);
                Config::default()
            }),
            _ => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    }

    /// Load config from a specific path
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the default config to `path`, creating parent directories
    pub fn save_default(path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine.probe_timeout_secs, 10);
        assert_eq!(config.engine.mutate_timeout(), Duration::from_secs(60));
        assert_eq!(config.shell.program, "powershell.exe");
        assert_eq!(config.shell.args.last().map(String::as_str), Some("-Command"));
        assert!(config.display.color);
        assert!(!config.display.show_unavailable);
    }

    #[test]
    fn test_parse_partial_toml() {
        let toml_str = r#"
[engine]
probe_timeout_secs = 3

[shell]
program = "pwsh"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.probe_timeout_secs, 3);
        // Missing fields fall back to defaults
        assert_eq!(config.engine.max_concurrent_probes, 8);
        assert_eq!(config.shell.program, "pwsh");
        assert_eq!(config.shell.sc_program, "sc.exe");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        Config::save_default(&path).unwrap();
        let loaded = Config::load_from_path(&path).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[engine]\nprobe_timeout_secs = \"soon\"\n").unwrap();

        assert!(matches!(
            Config::load_from_path(&path),
            Err(ConfigError::Parse(_))
        ));
    }
}
