//! Configuration for the results-page scrape backend.

use const_format::concatcp;
use melodytube_core::{CoreError, ProvidersConfig};
use serde::{Deserialize, Serialize};

/// Provider name used in config file
pub const PROVIDER_NAME: &str = "scrape";

/// Host serving the public results page
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// Default timeout for HTTP requests (10 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Scrape-specific configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeProviderConfig {
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

impl Default for ScrapeProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl ScrapeProviderConfig {
    /// Extract scrape config from the dynamic providers config.
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
                field: "providers.scrape.base_url".into(),
            });
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(CoreError::ConfigInvalid {
                message: format!(
                    "providers.scrape.base_url must start with http:// or https://, got {:?}",
                    self.base_url
                ),
            });
        }
        Ok(())
    }
}

/// Config template for the scrape backend
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"[providers.scrape]
# Host serving the public results page
base_url = ""#,
    DEFAULT_BASE_URL,
    "\"\ntimeout_secs = ",
    DEFAULT_TIMEOUT_SECS,
    "\nmax_retries = ",
    DEFAULT_MAX_RETRIES,
    "\n"
);
