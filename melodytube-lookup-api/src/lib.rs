pub mod config;

pub use config::{api_key_from_env, ApiProviderConfig, API_KEY_ENV, CONFIG_TEMPLATE as API_CONFIG_TEMPLATE};

use async_trait::async_trait;
use const_format::concatcp;
use melodytube_core::{CoreError, TrackDescriptor, TrackLookup, VideoId};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodytube::lookup::api";

const USER_AGENT: &str = concatcp!("MelodyTube/", env!("CARGO_PKG_VERSION"));

/// Lookup backend over the hosted JSON search API.
pub struct ApiLookup {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: Option<String>,
}

impl ApiLookup {
    /// Create an API backend, reading the key from [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be created.
    pub fn with_config(config: &ApiProviderConfig) -> Result<Self, CoreError> {
        Self::with_api_key(config, api_key_from_env())
    }

    /// Create an API backend with an explicit key; `None` relies on a proxy.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid or the HTTP client cannot be created.
    pub fn with_api_key(config: &ApiProviderConfig, api_key: Option<String>) -> Result<Self, CoreError> {
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

        if api_key.is_none() {
            info!(
                target: LOG_TARGET,
                "{} not set, expecting {} to add the key",
                API_KEY_ENV,
                config.base_url
            );
        }

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Whether requests carry a key
    #[must_use]
    pub const fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Issue a GET and decode the JSON body, turning error statuses into
    /// [`CoreError::LookupFailed`]. `url` is logged, so the key is appended here.
    async fn get_json<T: DeserializeOwned>(&self, mut url: String) -> Result<T, CoreError> {
        info!(target: LOG_TARGET, "API GET: {}", url);
        if let Some(key) = &self.api_key {
            let _ = write!(url, "&key={}", urlencoding::encode(key));
        }

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        debug!(target: LOG_TARGET, "API response status: {}", status);

        if !status.is_success() {
            let detail = response
                .json::<ApiErrorResponse>()
                .await
                .ok()
                .map(|body| body.error.message)
                .unwrap_or_default();
            warn!(target: LOG_TARGET, "API returned status {}: {}", status, detail);
            return Err(CoreError::LookupFailed {
                backend: self.name().to_string(),
                reason: if detail.is_empty() {
                    format!("API returned status: {status}")
                } else {
                    format!("API returned status: {status} ({detail})")
                },
            });
        }

        Ok(response.json().await?)
    }
}

/// Response from the `/search` endpoint
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Snippet,
}

/// Search hits can be channels or playlists; only videos carry `videoId`
#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

/// Response from the `/videos` endpoint
#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    #[serde(rename = "default")]
    standard: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

/// Build a descriptor from an API item, skipping malformed identifiers.
fn to_descriptor(raw_id: &str, snippet: Snippet) -> Option<TrackDescriptor> {
    let Ok(id) = VideoId::parse(raw_id) else {
        debug!(target: LOG_TARGET, "Skipping item with malformed id {:?}", raw_id);
        return None;
    };

    let Snippet { title, thumbnails } = snippet;
    let thumbnail_url = thumbnails
        .medium
        .or(thumbnails.high)
        .or(thumbnails.standard)
        .map_or_else(|| id.thumbnail_url(), |thumbnail| thumbnail.url);

    Some(TrackDescriptor::new(id, decode_entities(&title), thumbnail_url))
}

/// Undo the HTML escaping the API applies to titles.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

#[async_trait]
impl TrackLookup for ApiLookup {
    fn name(&self) -> &'static str {
        "api"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackDescriptor>, CoreError> {
        let url = format!(
            "{}/search?part=snippet&maxResults={}&q={}&type=video",
            self.base_url,
            limit,
            urlencoding::encode(query)
        );

        let response: SearchResponse = self.get_json(url).await?;
        let results: Vec<_> = response
            .items
            .into_iter()
            .filter_map(|item| {
                let raw_id = item.id.video_id?;
                to_descriptor(&raw_id, item.snippet)
            })
            .take(limit)
            .collect();

        info!(target: LOG_TARGET, "API returned {} video(s)", results.len());
        Ok(results)
    }

    async fn details(&self, id: &VideoId) -> Result<Option<TrackDescriptor>, CoreError> {
        let url = format!(
            "{}/videos?part=snippet&id={}",
            self.base_url,
            urlencoding::encode(id.as_str())
        );

        let response: VideosResponse = self.get_json(url).await?;
        let descriptor = response
            .items
            .into_iter()
            .find_map(|item| to_descriptor(&item.id, item.snippet));

        if descriptor.is_none() {
            debug!(target: LOG_TARGET, "API has no video {}", id);
        }
        Ok(descriptor)
    }
}
