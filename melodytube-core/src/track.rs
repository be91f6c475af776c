//! Track identifiers and descriptors.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a widget track identifier
pub const VIDEO_ID_LEN: usize = 11;

/// Base URL for derived thumbnails
const THUMBNAIL_BASE_URL: &str = "https://img.youtube.com/vi";

/// An 11-character track identifier in the widget's addressing scheme.
///
/// Only ASCII alphanumerics, `-` and `_` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoId(String);

impl VideoId {
    /// Parse an identifier, rejecting anything that is not exactly 11 id characters.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyInput`] for blank input and
    /// [`CoreError::InvalidTrackId`] for malformed identifiers.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyInput);
        }
        if Self::is_well_formed(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(CoreError::InvalidTrackId {
                id: trimmed.to_string(),
            })
        }
    }

    /// Wrap an identifier already known to be well formed.
    pub(crate) fn from_trusted(raw: &str) -> Self {
        debug_assert!(Self::is_well_formed(raw));
        Self(raw.to_string())
    }

    /// Check whether `candidate` has the shape of an identifier.
    #[must_use]
    pub fn is_well_formed(candidate: &str) -> bool {
        candidate.len() == VIDEO_ID_LEN && candidate.bytes().all(is_id_byte)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Thumbnail URL derived from the identifier alone.
    #[must_use]
    pub fn thumbnail_url(&self) -> String {
        format!("{THUMBNAIL_BASE_URL}/{}/mqdefault.jpg", self.0)
    }
}

/// Characters allowed inside an identifier.
pub(crate) const fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_'
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for VideoId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VideoId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<VideoId> for String {
    fn from(id: VideoId) -> Self {
        id.0
    }
}

/// One discoverable track: identifier, display title and thumbnail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    pub id: VideoId,
    pub title: String,
    pub thumbnail_url: String,
}

impl TrackDescriptor {
    pub fn new(id: VideoId, title: impl Into<String>, thumbnail_url: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            thumbnail_url: thumbnail_url.into(),
        }
    }

    /// Descriptor for a search hit whose title was not resolved.
    #[must_use]
    pub fn unresolved(id: VideoId) -> Self {
        let title = format!("Video {id}");
        let thumbnail_url = id.thumbnail_url();
        Self::new(id, title, thumbnail_url)
    }

    /// Best-effort descriptor built from the identifier alone.
    #[must_use]
    pub fn synthesized(id: VideoId) -> Self {
        let title = format!("Video {}...", &id.as_str()[..6]);
        let thumbnail_url = id.thumbnail_url();
        Self::new(id, title, thumbnail_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_id() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        assert_eq!(id.as_str(), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let id = VideoId::parse("  kJQP7kiw5Fk\n").unwrap();
        assert_eq!(id.as_str(), "kJQP7kiw5Fk");
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(VideoId::parse("   "), Err(CoreError::EmptyInput)));
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            VideoId::parse("short"),
            Err(CoreError::InvalidTrackId { .. })
        ));
        assert!(VideoId::parse("dQw4w9WgXcQQ").is_err());
    }

    #[test]
    fn test_parse_bad_characters() {
        assert!(VideoId::parse("dQw4w9WgXc!").is_err());
        assert!(VideoId::parse("dQw4 9WgXcQ").is_err());
    }

    #[test]
    fn test_thumbnail_url() {
        let id = VideoId::parse("9bZkp7q19f0").unwrap();
        assert_eq!(
            id.thumbnail_url(),
            "https://img.youtube.com/vi/9bZkp7q19f0/mqdefault.jpg"
        );
    }

    #[test]
    fn test_synthesized_descriptor() {
        let id = VideoId::parse("abcdefghijk").unwrap();
        let descriptor = TrackDescriptor::synthesized(id.clone());
        assert_eq!(descriptor.id, id);
        assert_eq!(descriptor.title, "Video abcdef...");
        assert_eq!(
            descriptor.thumbnail_url,
            "https://img.youtube.com/vi/abcdefghijk/mqdefault.jpg"
        );
    }

    #[test]
    fn test_unresolved_descriptor_title() {
        let id = VideoId::parse("abcdefghijk").unwrap();
        assert_eq!(TrackDescriptor::unresolved(id).title, "Video abcdefghijk");
    }

    #[test]
    fn test_deserialize_rejects_malformed_id() {
        let result: Result<TrackDescriptor, _> =
            toml::from_str("id = \"nope\"\ntitle = \"t\"\nthumbnail_url = \"u\"\n");
        assert!(result.is_err());
    }
}
