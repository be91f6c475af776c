//! Headless player session.
//!
//! Holds what a UI shows (current track, transport flag, progress, search
//! results, volume) and routes user intents to the lookup service and the
//! playback facade.

use crate::error::{CoreError, Result};
use crate::lookup::{FallbackReason, LookupOutcome, LookupService};
use crate::playback::{PlaybackEvent, PlaybackFacade, Volume};
use crate::request::RequestTracker;
use crate::time::DurationExt;
use crate::track::TrackDescriptor;
use crate::widget::ContainerHandle;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodytube::session";

/// Point-in-time copy of the session state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub current: Option<TrackDescriptor>,
    pub is_playing: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub results: Vec<TrackDescriptor>,
    /// Set when the displayed results are fallback data
    pub degraded: Option<FallbackReason>,
    pub volume: Volume,
    pub muted: bool,
}

impl SessionSnapshot {
    fn new(volume: Volume) -> Self {
        Self {
            current: None,
            is_playing: false,
            position: Duration::ZERO,
            duration: None,
            results: Vec::new(),
            degraded: None,
            volume,
            muted: false,
        }
    }
}

pub struct PlayerSession {
    lookup: LookupService,
    facade: PlaybackFacade,
    container: ContainerHandle,
    searches: RequestTracker,
    skip_interval: Duration,
    state: RwLock<SessionSnapshot>,
}

impl PlayerSession {
    #[must_use]
    pub fn new(
        lookup: LookupService,
        facade: PlaybackFacade,
        container: ContainerHandle,
        skip_interval: Duration,
    ) -> Self {
        let volume = facade.settings().initial_volume;
        Self {
            lookup,
            facade,
            container,
            searches: RequestTracker::new(),
            skip_interval,
            state: RwLock::new(SessionSnapshot::new(volume)),
        }
    }

    #[must_use]
    pub const fn facade(&self) -> &PlaybackFacade {
        &self.facade
    }

    #[must_use]
    pub const fn lookup(&self) -> &LookupService {
        &self.lookup
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.state.read().await.clone()
    }

    /// Resolve a pasted link and load the track it names.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyInput`] or [`CoreError::InvalidLink`] before
    /// any lookup or widget call, or a facade error if loading fails.
    pub async fn load_from_link(&self, link: &str) -> Result<LookupOutcome<TrackDescriptor>> {
        let outcome = self.lookup.resolve_link(link).await?;
        self.play_track(outcome.value().clone()).await?;
        Ok(outcome)
    }

    /// Run a search and publish its results.
    ///
    /// Returns `None` when a newer search started while this one was in
    /// flight; its results are discarded.
    pub async fn search(&self, query: &str) -> Option<LookupOutcome<Vec<TrackDescriptor>>> {
        let token = self.searches.issue();
        let outcome = self.lookup.search(query).await;

        if !self.searches.is_latest(token) {
            debug!(
                target: LOG_TARGET,
                "Discarding stale results for {:?} (request {})",
                query,
                token.sequence()
            );
            return None;
        }

        let mut state = self.state.write().await;
        state.results = outcome.value().clone();
        state.degraded = outcome.fallback_reason().cloned();
        drop(state);

        if let Some(reason) = outcome.fallback_reason() {
            info!(target: LOG_TARGET, "Showing fallback catalog ({})", reason);
        }
        Some(outcome)
    }

    /// Load the search result at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSuchResult`] if `index` is out of range.
    pub async fn play_result(&self, index: usize) -> Result<()> {
        let descriptor = self
            .state
            .read()
            .await
            .results
            .get(index)
            .cloned()
            .ok_or(CoreError::NoSuchResult { index })?;
        self.play_track(descriptor).await
    }

    /// Load `descriptor`, creating the widget on first use.
    ///
    /// # Errors
    ///
    /// Returns a facade error if the widget cannot be created.
    pub async fn play_track(&self, descriptor: TrackDescriptor) -> Result<()> {
        if self.facade.current_track().await.is_some() {
            self.facade.load_track(descriptor.id.as_str()).await?;
        } else {
            self.facade
                .initialize(self.container.clone(), descriptor.id.as_str())
                .await?;
        }

        info!(target: LOG_TARGET, "Now playing {:?} ({})", descriptor.title, descriptor.id);
        let mut state = self.state.write().await;
        state.current = Some(descriptor);
        state.is_playing = false;
        state.position = Duration::ZERO;
        state.duration = None;
        Ok(())
    }

    /// Pause when playing, play otherwise. Returns whether the widget took the command.
    pub async fn toggle_play_pause(&self) -> bool {
        if self.state.read().await.is_playing {
            self.facade.pause().await
        } else {
            self.facade.play().await
        }
    }

    /// Seek forward by the skip interval, stopping at the end of the track.
    pub async fn skip_forward(&self) -> bool {
        let position = self.state.read().await.position;
        self.seek(position.saturating_add(self.skip_interval)).await
    }

    /// Seek backward by the skip interval, stopping at the start.
    pub async fn skip_backward(&self) -> bool {
        let position = self.state.read().await.position;
        self.seek(position.saturating_sub(self.skip_interval)).await
    }

    /// Seek to `position`, clamped to the known duration.
    pub async fn seek(&self, position: Duration) -> bool {
        let target = {
            let state = self.state.read().await;
            state.duration.map_or(position, |duration| position.min(duration))
        };

        let applied = self.facade.seek_to(target).await;
        if applied {
            debug!(target: LOG_TARGET, "Seeked to {}", target.to_clock());
            self.state.write().await.position = target;
        }
        applied
    }

    /// Set the volume in percent. Zero is shown as muted.
    pub async fn set_volume(&self, percent: u8) {
        let volume = Volume::new(percent);
        let was_muted = self.state.read().await.muted;

        self.facade.set_volume(volume).await;
        if volume.is_silent() {
            self.facade.mute().await;
        } else if was_muted {
            self.facade.unmute().await;
        }

        let mut state = self.state.write().await;
        state.volume = volume;
        state.muted = volume.is_silent();
    }

    pub async fn toggle_mute(&self) {
        let muted = !self.state.read().await.muted;
        if muted {
            self.facade.mute().await;
        } else {
            self.facade.unmute().await;
        }
        self.state.write().await.muted = muted;
    }

    /// Fold one facade event into the session state.
    pub async fn apply_event(&self, event: &PlaybackEvent) {
        let mut state = self.state.write().await;
        match event {
            PlaybackEvent::StateChanged { state: player_state } => {
                state.is_playing = player_state.is_playing();
            }
            PlaybackEvent::Position(sample) => {
                state.position = sample.position;
                state.duration = sample.duration;
            }
            PlaybackEvent::InitTimedOut { track_id, .. } => {
                warn!(target: LOG_TARGET, "Player never became ready for {}", track_id);
                state.is_playing = false;
            }
            PlaybackEvent::TornDown { .. } => state.is_playing = false,
            PlaybackEvent::Ready { .. } | PlaybackEvent::TrackLoaded { .. } => {}
        }
    }

    /// Apply facade events until `cancel` fires.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut rx = self.facade.subscribe();

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!(target: LOG_TARGET, "Session event loop cancelled");
                    break;
                }
                event = rx.recv() => match event {
                    Ok(event) => self.apply_event(&event).await,
                    Err(RecvError::Closed) => {
                        info!(target: LOG_TARGET, "Playback event channel closed");
                        break;
                    }
                    Err(RecvError::Lagged(n)) => {
                        info!(target: LOG_TARGET, "Missed {} playback events", n);
                    }
                },
            }
        }
    }

    /// Release the widget and clear the transport flag.
    pub async fn teardown(&self) {
        self.facade.teardown().await;
        self.state.write().await.is_playing = false;
    }
}
