//! The fixed fallback catalog and the in-memory catalog backend.

use crate::error::CoreError;
use crate::lookup::TrackLookup;
use crate::track::{TrackDescriptor, VideoId};
use async_trait::async_trait;

/// Catalog entries as (identifier, title), in declaration order.
const FALLBACK_ENTRIES: [(&str, &str); 5] = [
    ("dQw4w9WgXcQ", "Rick Astley - Never Gonna Give You Up"),
    ("kJQP7kiw5Fk", "Luis Fonsi - Despacito ft. Daddy Yankee"),
    ("JGwWNGJdvx8", "Ed Sheeran - Shape of You"),
    ("YQHsXMglC9A", "Adele - Hello"),
    ("9bZkp7q19f0", "PSY - Gangnam Style"),
];

/// The five well-known tracks every backend falls back to.
#[must_use]
pub fn fallback_catalog() -> Vec<TrackDescriptor> {
    FALLBACK_ENTRIES
        .iter()
        .map(|(id, title)| entry(id, title))
        .collect()
}

/// Look up a catalog entry by identifier.
#[must_use]
pub fn find(id: &VideoId) -> Option<TrackDescriptor> {
    FALLBACK_ENTRIES
        .iter()
        .find(|(entry_id, _)| *entry_id == id.as_str())
        .map(|(entry_id, title)| entry(entry_id, title))
}

fn entry(id: &str, title: &str) -> TrackDescriptor {
    let id = VideoId::from_trusted(id);
    let thumbnail_url = id.thumbnail_url();
    TrackDescriptor::new(id, title, thumbnail_url)
}

/// Backend that filters the static catalog without any network access.
#[derive(Debug, Clone)]
pub struct CatalogLookup {
    entries: Vec<TrackDescriptor>,
}

impl CatalogLookup {
    /// Backend over the fallback catalog
    #[must_use]
    pub fn new() -> Self {
        Self::with_entries(fallback_catalog())
    }

    /// Backend over a custom catalog
    #[must_use]
    pub const fn with_entries(entries: Vec<TrackDescriptor>) -> Self {
        Self { entries }
    }
}

impl Default for CatalogLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackLookup for CatalogLookup {
    fn name(&self) -> &'static str {
        "catalog"
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TrackDescriptor>, CoreError> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .entries
            .iter()
            .filter(|d| d.title.to_lowercase().contains(&needle))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn details(&self, id: &VideoId) -> Result<Option<TrackDescriptor>, CoreError> {
        Ok(self.entries.iter().find(|d| &d.id == id).cloned())
    }
}
