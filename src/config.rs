use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// Service connection settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Dashboard behavior
    #[serde(default)]
    pub ui: UiConfig,
}

/// Where the checks-out service lives and how to present ourselves to it
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Base URL of the service, e.g. "https://checks-out.example.com"
    #[serde(default)]
    pub url: String,

    /// CSRF token sent as X-CSRF-TOKEN
    pub csrf_token: Option<String>,

    /// Raw Cookie header value of an existing browser session
    pub session_cookie: Option<String>,

    /// Path the session is sent to after the account is deleted
    #[serde(default = "default_logout_path")]
    pub logout_path: String,

    /// Documentation link shown in the dashboard header
    pub docs_url: Option<String>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String, // "info"

    /// Log format
    #[serde(default = "default_log_format")]
    pub format: String, // "compact" or "full"

    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,
}

/// Dashboard behavior
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UiConfig {
    /// Organization selected at startup (defaults to the signed-in user)
    pub default_org: Option<String>,

    /// Ask before enabling a repository or organization
    #[serde(default = "default_true")]
    pub confirm_activation: bool,

    /// Terminal redraw interval in milliseconds
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_logout_path() -> String {
    "/logout".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "compact".to_string()
}
fn default_tick_rate_ms() -> u64 {
    100
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000".to_string(),
            csrf_token: None,
            session_cookie: None,
            logout_path: default_logout_path(),
            docs_url: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            color: default_true(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_org: None,
            confirm_activation: default_true(),
            tick_rate_ms: default_tick_rate_ms(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create a default config
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let mut config = Self::default();

            if let Some(parent) = config_path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
            }

            config.save(&config_path)?;

            tracing::info!("Created default configuration at: {:?}", config_path);
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        config.expand_values()?;
        config.apply_env_overrides();

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("checksout-console").join("config.yml"))
    }

    /// Expand environment variables in configuration values
    pub fn expand_values(&mut self) -> Result<()> {
        self.server.url = shellexpand::full(&self.server.url)
            .context("Failed to expand server.url")?
            .into_owned();

        if let Some(cookie) = &self.server.session_cookie {
            self.server.session_cookie = Some(
                shellexpand::env(cookie)
                    .context("Failed to expand server.session_cookie")?
                    .into_owned(),
            );
        }

        if let Some(token) = &self.server.csrf_token {
            self.server.csrf_token = Some(
                shellexpand::env(token)
                    .context("Failed to expand server.csrf_token")?
                    .into_owned(),
            );
        }

        Ok(())
    }

    /// Let CHECKSOUT_URL, CHECKSOUT_SESSION and CHECKSOUT_CSRF win over the file
    pub fn apply_env_overrides(&mut self) {
        if let Some(url) = non_empty_env("CHECKSOUT_URL") {
            self.server.url = url;
        }
        if let Some(cookie) = non_empty_env("CHECKSOUT_SESSION") {
            self.server.session_cookie = Some(cookie);
        }
        if let Some(token) = non_empty_env("CHECKSOUT_CSRF") {
            self.server.csrf_token = Some(token);
        }
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
