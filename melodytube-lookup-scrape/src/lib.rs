pub mod config;

pub use config::{ScrapeProviderConfig, CONFIG_TEMPLATE as SCRAPE_CONFIG_TEMPLATE};

use async_trait::async_trait;
use const_format::concatcp;
use melodytube_core::{CoreError, TrackDescriptor, TrackLookup, VideoId, VIDEO_ID_LEN};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodytube::lookup::scrape";

const USER_AGENT: &str = concatcp!("MelodyTube/", env!("CARGO_PKG_VERSION"));

/// Marker preceding every identifier linked from the results page
const WATCH_MARKER: &str = "/watch?v=";

/// Collect up to `limit` identifiers linked from `markup`, first seen first.
#[must_use]
pub fn extract_video_ids(markup: &str, limit: usize) -> Vec<VideoId> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for (start, _) in markup.match_indices(WATCH_MARKER) {
        if ids.len() >= limit {
            break;
        }
        let begin = start + WATCH_MARKER.len();
        let Some(token) = markup.get(begin..begin + VIDEO_ID_LEN) else {
            continue;
        };
        if !VideoId::is_well_formed(token) || !seen.insert(token) {
            continue;
        }
        if let Ok(id) = VideoId::parse(token) {
            ids.push(id);
        }
    }

    ids
}

/// Lookup backend that scrapes the public results page.
///
/// Titles are not extracted from the markup; results carry placeholder
/// titles and derived thumbnails.
pub struct ScrapeLookup {
    client: ClientWithMiddleware,
    base_url: String,
}

impl ScrapeLookup {
    /// Create a scrape backend with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new() -> Result<Self, CoreError> {
        Self::with_config(&ScrapeProviderConfig::default())
    }

    /// Create a scrape backend from its provider config.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be created.
    pub fn with_config(config: &ScrapeProviderConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(5))
            .user_agent(USER_AGENT)
            .build()?;

        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn results_url(&self, query: &str) -> String {
        format!(
            "{}/results?search_query={}",
            self.base_url,
            urlencoding::encode(query)
        )
    }
}

#[async_trait]
impl TrackLookup for ScrapeLookup {
    fn name(&self) -> &'static str {
        "scrape"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackDescriptor>, CoreError> {
        let url = self.results_url(query);
        info!(target: LOG_TARGET, "Results page GET: {}", url);

        let response = self.client.get(&url).send().await?;
        debug!(target: LOG_TARGET, "Results page status: {}", response.status());

        if !response.status().is_success() {
            warn!(target: LOG_TARGET, "Results page returned status: {}", response.status());
            return Err(CoreError::LookupFailed {
                backend: self.name().to_string(),
                reason: format!("results page returned status: {}", response.status()),
            });
        }

        let markup = response.text().await?;
        let ids = extract_video_ids(&markup, limit);
        info!(
            target: LOG_TARGET,
            "Found {} identifier(s) in {} bytes of markup",
            ids.len(),
            markup.len()
        );

        Ok(ids.into_iter().map(TrackDescriptor::unresolved).collect())
    }

    async fn details(&self, id: &VideoId) -> Result<Option<TrackDescriptor>, CoreError> {
        debug!(target: LOG_TARGET, "Scrape backend does not resolve details for {}", id);
        Ok(None)
    }
}
