use crate::error::{CoreError, Result};
use crate::lookup::DEFAULT_MAX_RESULTS;
use crate::widget::WidgetOptions;
use const_format::concatcp;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

const LOG_TARGET: &str = "melodytube::config";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MelodyTubeConfig {
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    /// Backend-specific tables, parsed by the backend crates
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub backend: LookupBackend,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

const fn default_max_results() -> usize {
    DEFAULT_MAX_RESULTS
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            backend: LookupBackend::default(),
            max_results: default_max_results(),
        }
    }
}

/// Which lookup backend a deployment uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LookupBackend {
    /// Scrape the public results page
    #[default]
    Scrape,
    /// Hosted JSON search API
    Api,
    /// Static in-memory catalog, no network
    Catalog,
}

impl LookupBackend {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Api => "api",
            Self::Catalog => "catalog",
        }
    }
}

impl fmt::Display for LookupBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LookupBackend {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scrape" => Ok(Self::Scrape),
            "api" => Ok(Self::Api),
            "catalog" => Ok(Self::Catalog),
            other => Err(CoreError::ConfigInvalid {
                message: format!("unknown lookup backend {other:?} (expected scrape, api or catalog)"),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// 0 disables the ready timeout
    #[serde(default = "default_ready_timeout")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
    #[serde(default = "default_skip_seconds")]
    pub skip_seconds: u64,
    #[serde(default)]
    pub widget: WidgetOptions,
}

/// Default widget polling interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
/// Default wait for the widget's ready signal
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_INITIAL_VOLUME: u8 = 80;
/// Default skip forward / backward step
pub const DEFAULT_SKIP_SECONDS: u64 = 10;

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_ready_timeout() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}

const fn default_initial_volume() -> u8 {
    DEFAULT_INITIAL_VOLUME
}

const fn default_skip_seconds() -> u64 {
    DEFAULT_SKIP_SECONDS
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            ready_timeout_ms: default_ready_timeout(),
            initial_volume: default_initial_volume(),
            skip_seconds: default_skip_seconds(),
            widget: WidgetOptions::default(),
        }
    }
}

/// Free-form `[providers.<name>]` tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProvidersConfig(toml::Table);

impl ProvidersConfig {
    /// Deserialize the table for `name`, if present.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] if the table does not match `T`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        self.0
            .get(name)
            .map(|value| {
                value.clone().try_into().map_err(|e: toml::de::Error| CoreError::ConfigInvalid {
                    message: format!("providers.{name}: {e}"),
                })
            })
            .transpose()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write logs to a file in the cache directory
    #[serde(default)]
    pub file: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: false,
        }
    }
}

impl MelodyTubeConfig {
    /// Get the configuration directory path (~/.config/melodytube/)
    #[must_use]
    pub fn config_dir() -> PathBuf {
        crate::paths::config_dir()
    }

    /// Get the config file path (~/.config/melodytube/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default location, writing the template on first run.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, written, parsed or validated.
    pub fn load_or_create(provider_templates: Option<&[&str]>) -> Result<Self> {
        Self::load_or_create_at(&Self::config_path(), provider_templates)
    }

    /// Load config from `path`, writing the template there if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, written, parsed or validated.
    pub fn load_or_create_at(path: &Path, provider_templates: Option<&[&str]>) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let template = build_config_template(provider_templates);
            fs::write(path, &template)?;
            info!(target: LOG_TARGET, "Created config template at {}", path.display());
            return Self::parse(&template);
        }

        Self::load_from(path)
    }

    /// Load config from an existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse and validate config content.
    ///
    /// # Errors
    ///
    /// Returns an error on TOML syntax errors or invalid values.
    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigInvalid`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.lookup.max_results == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "lookup.max_results must be at least 1".into(),
            });
        }
        if self.player.poll_interval_ms == 0 {
            return Err(CoreError::ConfigInvalid {
                message: "player.poll_interval_ms must be greater than 0".into(),
            });
        }
        if self.player.initial_volume > 100 {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "player.initial_volume must be between 0 and 100, got {}",
                    self.player.initial_volume
                ),
            });
        }
        Ok(())
    }
}

/// Build the full config template from the base template and backend templates
#[must_use]
pub fn build_config_template(provider_templates: Option<&[&str]>) -> String {
    let mut template = BASE_CONFIG_TEMPLATE.to_string();
    for provider in provider_templates.unwrap_or_default() {
        template.push('\n');
        template.push_str(provider);
    }
    template
}

const BASE_CONFIG_TEMPLATE: &str = concatcp!(
    r#"# MelodyTube Configuration
# ~/.config/melodytube/config.toml

[lookup]
# Lookup backend: "scrape", "api" or "catalog"
backend = "scrape"
max_results = "#,
    DEFAULT_MAX_RESULTS,
    r#"

[player]
# How often the widget is polled for position and duration
poll_interval_ms = "#,
    DEFAULT_POLL_INTERVAL_MS,
    r#"
# Give up on a widget that never becomes ready (0 = wait forever)
ready_timeout_ms = "#,
    DEFAULT_READY_TIMEOUT_MS,
    "\ninitial_volume = ",
    DEFAULT_INITIAL_VOLUME,
    r#"
# Seconds jumped by skip forward / skip backward
skip_seconds = "#,
    DEFAULT_SKIP_SECONDS,
    r#"

[player.widget]
autoplay = true
show_controls = false
keyboard_enabled = false
fullscreen_disabled = true
annotations = "hide"  # "show", "hide"
modest_branding = true
inline_playback = true
suppress_related = true

[logging]
level = "info"
# Also write logs to the cache directory
file = false
"#
);
