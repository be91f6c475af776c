//! The embedded widget contract.
//!
//! The widget is an external collaborator: a factory creates it bound to a
//! placement handle, and it reports readiness and transport state changes
//! through a [`WidgetEventSink`] owned by whoever created it.

use crate::error::CoreError;
use crate::track::VideoId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use url::Url;

/// Base URL used when rendering embed URLs
pub const EMBED_BASE_URL: &str = "https://www.youtube.com/embed/";

/// Caller-supplied placement for the widget (element id, window handle, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether video annotations are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationPolicy {
    Show,
    #[default]
    Hide,
}

impl AnnotationPolicy {
    /// Player parameter value for this policy
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Show => 1,
            Self::Hide => 3,
        }
    }
}

/// Options passed to the widget at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetOptions {
    #[serde(default = "default_true")]
    pub autoplay: bool,
    #[serde(default)]
    pub show_controls: bool,
    #[serde(default)]
    pub keyboard_enabled: bool,
    #[serde(default = "default_true")]
    pub fullscreen_disabled: bool,
    #[serde(default)]
    pub annotations: AnnotationPolicy,
    #[serde(default = "default_true")]
    pub modest_branding: bool,
    #[serde(default = "default_true")]
    pub inline_playback: bool,
    #[serde(default = "default_true")]
    pub suppress_related: bool,
}

const fn default_true() -> bool {
    true
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            autoplay: true,
            show_controls: false,
            keyboard_enabled: false,
            fullscreen_disabled: true,
            annotations: AnnotationPolicy::Hide,
            modest_branding: true,
            inline_playback: true,
            suppress_related: true,
        }
    }
}

impl WidgetOptions {
    /// Options rendered as widget player parameters
    #[must_use]
    pub fn player_vars(&self) -> Vec<(&'static str, u8)> {
        vec![
            ("autoplay", u8::from(self.autoplay)),
            ("controls", u8::from(self.show_controls)),
            ("disablekb", u8::from(!self.keyboard_enabled)),
            ("fs", u8::from(!self.fullscreen_disabled)),
            ("iv_load_policy", self.annotations.code()),
            ("modestbranding", u8::from(self.modest_branding)),
            ("playsinline", u8::from(self.inline_playback)),
            ("rel", u8::from(!self.suppress_related)),
        ]
    }

    /// Embed URL for `id` carrying these options
    ///
    /// # Errors
    ///
    /// Returns an error if the embed URL cannot be built.
    pub fn embed_url(&self, id: &VideoId) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(EMBED_BASE_URL)?.join(id.as_str())?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in self.player_vars() {
                query.append_pair(name, &value.to_string());
            }
        }
        Ok(url)
    }
}

/// Transport state reported by the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    /// A code this crate does not know about
    Unknown(i32),
}

impl PlayerState {
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -1 => Self::Unstarted,
            0 => Self::Ended,
            1 => Self::Playing,
            2 => Self::Paused,
            3 => Self::Buffering,
            5 => Self::Cued,
            other => Self::Unknown(other),
        }
    }

    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Unstarted => -1,
            Self::Ended => 0,
            Self::Playing => 1,
            Self::Paused => 2,
            Self::Buffering => 3,
            Self::Cued => 5,
            Self::Unknown(code) => code,
        }
    }

    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Raw event emitted by a widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetEvent {
    Ready,
    StateChange(i32),
}

/// Event slots handed to a widget at creation.
///
/// Each sink belongs to exactly one widget instance; events sent after the
/// owner has discarded that instance are dropped.
#[derive(Debug, Clone)]
pub struct WidgetEventSink {
    tx: mpsc::UnboundedSender<WidgetEvent>,
}

impl WidgetEventSink {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<WidgetEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Signal that the widget finished initializing.
    ///
    /// Returns `false` if nobody is listening anymore.
    pub fn ready(&self) -> bool {
        self.tx.send(WidgetEvent::Ready).is_ok()
    }

    /// Report a transport state change by raw widget code.
    ///
    /// Returns `false` if nobody is listening anymore.
    pub fn state_changed(&self, code: i32) -> bool {
        self.tx.send(WidgetEvent::StateChange(code)).is_ok()
    }
}

/// Control surface of one live widget instance.
///
/// Offsets are in seconds as the widget reports them; `NaN` is allowed for
/// values that are not known yet.
pub trait Widget: Send + Sync {
    fn play(&self);
    fn pause(&self);
    fn seek_to(&self, seconds: f64);
    fn set_volume(&self, percent: u8);
    fn mute(&self);
    fn unmute(&self);
    fn load_by_id(&self, id: &VideoId);
    fn current_time(&self) -> f64;
    fn duration(&self) -> f64;
    /// Release the embedded resource
    fn destroy(&self);
}

/// Creates widget instances.
pub trait WidgetFactory: Send + Sync {
    /// Request a widget bound to `container`, initially showing `id`.
    ///
    /// Creation is asynchronous: the widget signals completion through
    /// `events` at some later time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::WidgetCreation`] if the request cannot be issued.
    fn create(
        &self,
        container: &ContainerHandle,
        id: &VideoId,
        options: &WidgetOptions,
        events: WidgetEventSink,
    ) -> Result<Arc<dyn Widget>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_player_vars() {
        let vars = WidgetOptions::default().player_vars();
        assert_eq!(
            vars,
            vec![
                ("autoplay", 1),
                ("controls", 0),
                ("disablekb", 1),
                ("fs", 0),
                ("iv_load_policy", 3),
                ("modestbranding", 1),
                ("playsinline", 1),
                ("rel", 0),
            ]
        );
    }

    #[test]
    fn test_embed_url() {
        let id = VideoId::parse("dQw4w9WgXcQ").unwrap();
        let options = WidgetOptions {
            autoplay: false,
            annotations: AnnotationPolicy::Show,
            ..WidgetOptions::default()
        };
        let url = options.embed_url(&id).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=0&controls=0&disablekb=1&fs=0&iv_load_policy=1&modestbranding=1&playsinline=1&rel=0"
        );
    }

    #[test]
    fn test_options_deserialize_defaults() {
        let options: WidgetOptions = toml::from_str("show_controls = true").unwrap();
        assert!(options.show_controls);
        assert!(options.autoplay);
        assert_eq!(options.annotations, AnnotationPolicy::Hide);
    }

    #[test]
    fn test_player_state_codes() {
        for code in [-1, 0, 1, 2, 3, 5] {
            assert_eq!(PlayerState::from_code(code).code(), code);
        }
        assert_eq!(PlayerState::from_code(1), PlayerState::Playing);
        assert_eq!(PlayerState::from_code(42), PlayerState::Unknown(42));
        assert!(PlayerState::Playing.is_playing());
        assert!(!PlayerState::Buffering.is_playing());
    }

    #[test]
    fn test_sink_reports_closed_channel() {
        let (sink, rx) = WidgetEventSink::channel();
        assert!(sink.ready());
        drop(rx);
        assert!(!sink.state_changed(1));
    }
}
