//! Configuration management for the wrapper.
//!
//! Settings are read from a TOML file, created with defaults on first run,
//! then overridden from the command line and validated before anything
//! is loaded.

use crate::cli::CliArgs;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub dispatcher: DispatcherSettings,
    pub modules: ModuleSettings,
    pub logging: LoggingSettings,
}

/// Dispatcher settings. Sockets belong to the transport that embeds the
/// dispatcher, so no addresses are configured here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherSettings {
    /// Seconds between dispatcher statistics reports (0 to disable)
    #[serde(default = "default_stats_interval")]
    pub stats_interval_secs: u64,
}

fn default_stats_interval() -> u64 {
    60
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            stats_interval_secs: default_stats_interval(),
        }
    }
}

/// Where extension modules come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Shared libraries in `directory`, reloadable after a rebuild
    #[default]
    Dynamic,
    /// Modules compiled into this binary
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSettings {
    /// Directory searched for shared libraries
    pub directory: String,
    #[serde(default)]
    pub source: SourceKind,
    /// Command module; no commands are loaded when unset
    #[serde(default)]
    pub commands: Option<String>,
    /// Handler module; no handlers are loaded when unset
    #[serde(default)]
    pub handlers: Option<String>,
}

impl Default for ModuleSettings {
    fn default() -> Self {
        Self {
            directory: "modules".to_string(),
            source: SourceKind::Dynamic,
            commands: Some("plugin_example".to_string()),
            handlers: Some("plugin_example".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, writes the default configuration to it and
    /// returns that.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            let content = toml::to_string_pretty(&config)?;
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(config)
        }
    }

    /// Applies command-line overrides on top of the file settings.
    pub fn apply_overrides(&mut self, args: &CliArgs) {
        if let Some(dir) = &args.module_dir {
            self.modules.directory = dir.to_string_lossy().to_string();
        }
        if let Some(commands) = &args.commands {
            self.modules.commands = Some(commands.clone());
        }
        if let Some(handlers) = &args.handlers {
            self.modules.handlers = Some(handlers.clone());
        }
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
    }

    /// Checks module settings and the log level.
    pub fn validate(&self) -> Result<(), String> {
        if self.modules.source == SourceKind::Dynamic && self.modules.directory.is_empty() {
            return Err("Module directory cannot be empty".to_string());
        }
        for (kind, module) in [
            ("command", &self.modules.commands),
            ("handler", &self.modules.handlers),
        ] {
            if module.as_deref().is_some_and(|m| m.trim().is_empty()) {
                return Err(format!("The {kind} module name cannot be empty"));
            }
        }

        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                self.logging.level
            ));
        }
        Ok(())
    }
}
