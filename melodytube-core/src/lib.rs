pub mod catalog;
pub mod config;
pub mod error;
pub mod link;
pub mod lookup;
pub mod paths;
pub mod playback;
pub mod request;
pub mod session;
pub mod time;
pub mod track;
pub mod widget;

#[cfg(test)]
mod testing;

pub use catalog::{fallback_catalog, CatalogLookup};
pub use config::{
    build_config_template, LoggingConfig, LookupBackend, LookupConfig, MelodyTubeConfig,
    PlayerConfig, ProvidersConfig,
};

/// Re-export toml error type for config parsing error handling
pub use toml::de::Error as TomlParseError;
pub use error::{CoreError, Result};
pub use link::extract_video_id;
pub use lookup::{FallbackReason, LookupOutcome, LookupService, TrackLookup, DEFAULT_MAX_RESULTS};
pub use paths::{config_dir, config_path, log_file_path, CONFIG_DIR_NAME, CONFIG_FILE_NAME, LOG_FILE_NAME};
pub use playback::{FacadeSettings, PlaybackEvent, PlaybackFacade, PlaybackPosition, Volume};
pub use request::{RequestToken, RequestTracker};
pub use session::{PlayerSession, SessionSnapshot};
pub use time::{format_clock, DurationExt};
pub use track::{TrackDescriptor, VideoId, VIDEO_ID_LEN};
pub use widget::{
    AnnotationPolicy, ContainerHandle, PlayerState, Widget, WidgetEvent, WidgetEventSink,
    WidgetFactory, WidgetOptions, EMBED_BASE_URL,
};
