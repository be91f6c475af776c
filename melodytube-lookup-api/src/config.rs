//! Configuration for the hosted search API backend.
//!
//! The API key never lives in the config file. It is read from
//! [`API_KEY_ENV`]; without it, `base_url` should point at a proxy that adds
//! the key server-side.

use const_format::concatcp;
use melodytube_core::{CoreError, ProvidersConfig};
use serde::{Deserialize, Serialize};

/// Provider name used in config file
pub const PROVIDER_NAME: &str = "api";

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "MELODYTUBE_API_KEY";

/// Public search API root
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Default timeout for HTTP requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// API-specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiProviderConfig {
    /// API root, or a proxy exposing the same `/search` and `/videos` endpoints
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

const fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for ApiProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ApiProviderConfig {
    /// Extract API config from the dynamic providers config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be parsed.
    pub fn from_providers(providers: &ProvidersConfig) -> Result<Option<Self>, CoreError> {
        providers.get(PROVIDER_NAME)
    }

    /// Validate that required fields are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is empty or not an http(s) URL.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.base_url.trim().is_empty() {
            return Err(CoreError::ConfigMissingField {
                field: "providers.api.base_url".into(),
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "providers.api.base_url must start with http:// or https://, got {:?}",
                    self.base_url
                ),
            });
        }
        Ok(())
    }
}

/// Read the API key from the environment, ignoring blank values.
#[must_use]
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
}

/// Config template for the API backend
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"[providers.api]
# Used when lookup.backend = "api"
# The key is read from the "#,
    API_KEY_ENV,
    r#" environment variable.
# Without a key, point base_url at a proxy that adds it.
base_url = ""#,
    DEFAULT_BASE_URL,
    "\"\ntimeout_secs = ",
    DEFAULT_TIMEOUT_SECS,
    "\nmax_retries = ",
    DEFAULT_MAX_RETRIES,
    "\n"
);
