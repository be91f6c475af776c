//! Track identifier extraction from pasted links.
//!
//! Recognized shapes:
//!
//! - short links: `https://youtu.be/<id>`
//! - watch pages: `https://www.youtube.com/watch?v=<id>`
//! - embeds: `https://www.youtube.com/embed/<id>`
//! - legacy forms: `/v/<id>`, `/u/<n>/<id>` and `&v=<id>` parameters
//!
//! The rightmost marker in the link wins. The token after it runs up to the
//! first `#`, `&` or `?` and must be exactly one well-formed identifier.

use crate::track::VideoId;

const SHORT_LINK: &[u8] = b"youtu.be/";
const LEGACY_V_PATH: &[u8] = b"v/";
const EMBED_PATH: &[u8] = b"embed/";
const WATCH_QUERY: &[u8] = b"watch?v=";
const V_PARAM: &[u8] = b"&v=";

/// Extract the track identifier from a link, if it carries exactly one.
#[must_use]
pub fn extract_video_id(link: &str) -> Option<VideoId> {
    let line = link.trim().lines().next()?;
    let bytes = line.as_bytes();

    let start = (0..bytes.len())
        .rev()
        .find_map(|i| marker_len_at(&bytes[i..]).map(|len| i + len))?;

    let rest = &line[start..];
    let token = rest
        .find(['#', '&', '?'])
        .map_or(rest, |end| &rest[..end]);

    if VideoId::is_well_formed(token) {
        VideoId::parse(token).ok()
    } else {
        None
    }
}

/// Length of the marker starting at the head of `rest`, if any.
fn marker_len_at(rest: &[u8]) -> Option<usize> {
    [SHORT_LINK, LEGACY_V_PATH]
        .into_iter()
        .find(|marker| rest.starts_with(marker))
        .map(<[u8]>::len)
        .or_else(|| legacy_user_path_len(rest))
        .or_else(|| {
            [EMBED_PATH, WATCH_QUERY, V_PARAM]
                .into_iter()
                .find(|marker| rest.starts_with(marker))
                .map(<[u8]>::len)
        })
}

/// `u/<word char>/`, the legacy channel playlist form.
fn legacy_user_path_len(rest: &[u8]) -> Option<usize> {
    match rest {
        [b'u', b'/', c, b'/', ..] if c.is_ascii_alphanumeric() || *c == b'_' => Some(4),
        _ => None,
    }
}
