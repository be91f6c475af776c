//! Track lookup: backend trait and the degrading lookup service.

use crate::catalog;
use crate::error::CoreError;
use crate::link::extract_video_id;
use crate::track::{TrackDescriptor, VideoId};
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodytube::lookup";

/// Default number of results returned by a search
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Trait for lookup backends.
///
/// Backends report upstream problems as errors; [`LookupService`] decides how
/// to degrade.
#[async_trait]
pub trait TrackLookup: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &'static str;

    /// Search for up to `limit` tracks matching `query`, in backend order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackDescriptor>, CoreError>;

    /// Resolve a single identifier. `Ok(None)` means the backend cannot resolve it.
    async fn details(&self, id: &VideoId) -> Result<Option<TrackDescriptor>, CoreError>;
}

/// Why a lookup answered with fallback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The query was blank
    EmptyQuery,
    /// The backend answered but had nothing usable
    NoMatches,
    /// The backend failed
    Upstream(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyQuery => f.write_str("empty query"),
            Self::NoMatches => f.write_str("no matches"),
            Self::Upstream(reason) => write!(f, "upstream failure: {reason}"),
        }
    }
}

/// Result of a lookup that never fails outright
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome<T> {
    /// The backend produced the value
    Found(T),
    /// Fallback data was substituted
    Fallback { value: T, reason: FallbackReason },
}

impl<T> LookupOutcome<T> {
    /// Borrow the value regardless of where it came from
    #[must_use]
    pub const fn value(&self) -> &T {
        match self {
            Self::Found(value) | Self::Fallback { value, .. } => value,
        }
    }

    /// Take the value regardless of where it came from
    #[must_use]
    pub fn into_value(self) -> T {
        match self {
            Self::Found(value) | Self::Fallback { value, .. } => value,
        }
    }

    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    #[must_use]
    pub const fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Found(_) => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }

    /// Upstream failure message, if the fallback was caused by one
    #[must_use]
    pub fn failure(&self) -> Option<&str> {
        match self.fallback_reason() {
            Some(FallbackReason::Upstream(reason)) => Some(reason),
            _ => None,
        }
    }
}

/// Lookup service wrapping one configured backend.
pub struct LookupService {
    backend: Box<dyn TrackLookup>,
    max_results: usize,
}

impl LookupService {
    /// Create a service returning at most [`DEFAULT_MAX_RESULTS`] results
    #[must_use]
    pub fn new(backend: Box<dyn TrackLookup>) -> Self {
        Self {
            backend,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set the result limit (at least one)
    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    /// Get the backend name
    #[must_use]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Extract a track identifier from a pasted link
    #[must_use]
    pub fn extract_identifier(link: &str) -> Option<VideoId> {
        extract_video_id(link)
    }

    /// Search for tracks, degrading to the fallback catalog.
    pub async fn search(&self, query: &str) -> LookupOutcome<Vec<TrackDescriptor>> {
        let query = query.trim();
        if query.is_empty() {
            debug!(target: LOG_TARGET, "Empty query, returning fallback catalog");
            return LookupOutcome::Fallback {
                value: catalog::fallback_catalog(),
                reason: FallbackReason::EmptyQuery,
            };
        }

        info!(
            target: LOG_TARGET,
            "Searching {} for {:?} (limit: {})",
            self.backend.name(),
            query,
            self.max_results
        );

        match self.backend.search(query, self.max_results).await {
            Ok(mut results) if !results.is_empty() => {
                results.truncate(self.max_results);
                info!(target: LOG_TARGET, "Backend {} returned {} result(s)", self.backend.name(), results.len());
                LookupOutcome::Found(results)
            }
            Ok(_) => {
                info!(target: LOG_TARGET, "Backend {} had no matches for {:?}", self.backend.name(), query);
                LookupOutcome::Fallback {
                    value: catalog::fallback_catalog(),
                    reason: FallbackReason::NoMatches,
                }
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Backend {} search failed: {}", self.backend.name(), e);
                LookupOutcome::Fallback {
                    value: catalog::fallback_catalog(),
                    reason: FallbackReason::Upstream(e.to_string()),
                }
            }
        }
    }

    /// Describe one identifier, synthesizing a placeholder when it cannot be resolved.
    pub async fn details(&self, id: &VideoId) -> LookupOutcome<TrackDescriptor> {
        if let Some(known) = catalog::find(id) {
            debug!(target: LOG_TARGET, "Identifier {} found in catalog", id);
            return LookupOutcome::Found(known);
        }

        match self.backend.details(id).await {
            Ok(Some(descriptor)) => LookupOutcome::Found(descriptor),
            Ok(None) => {
                debug!(target: LOG_TARGET, "Backend {} cannot resolve {}, synthesizing", self.backend.name(), id);
                LookupOutcome::Fallback {
                    value: TrackDescriptor::synthesized(id.clone()),
                    reason: FallbackReason::NoMatches,
                }
            }
            Err(e) => {
                warn!(target: LOG_TARGET, "Backend {} details failed for {}: {}", self.backend.name(), id, e);
                LookupOutcome::Fallback {
                    value: TrackDescriptor::synthesized(id.clone()),
                    reason: FallbackReason::Upstream(e.to_string()),
                }
            }
        }
    }

    /// Resolve a pasted link into a descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyInput`] for a blank link and
    /// [`CoreError::InvalidLink`] when no identifier can be extracted. No
    /// backend call is made in either case.
    pub async fn resolve_link(&self, link: &str) -> Result<LookupOutcome<TrackDescriptor>, CoreError> {
        if link.trim().is_empty() {
            return Err(CoreError::EmptyInput);
        }
        let id = extract_video_id(link).ok_or_else(|| CoreError::InvalidLink {
            link: link.trim().to_string(),
        })?;
        Ok(self.details(&id).await)
    }
}
