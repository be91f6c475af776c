//! Playback facade over one embedded widget.
//!
//! The facade owns at most one live widget. Commands issued before the widget
//! reports ready are dropped; volume and mute preferences are remembered and
//! applied once it does. Position is polled on a fixed interval because the
//! widget has no position-changed event.

use crate::config::PlayerConfig;
use crate::error::{CoreError, Result};
use crate::time::{duration_from_secs, DurationExt};
use crate::track::VideoId;
use crate::widget::{
    ContainerHandle, PlayerState, Widget, WidgetEvent, WidgetEventSink, WidgetFactory,
    WidgetOptions,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LOG_TARGET: &str = "melodytube::playback";

/// Volume level in percent, always within `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Volume(u8);

impl Volume {
    pub const MAX: Self = Self(100);
    pub const SILENT: Self = Self(0);

    /// Create a volume, clamping to 100
    #[must_use]
    pub const fn new(percent: u8) -> Self {
        if percent > 100 {
            Self::MAX
        } else {
            Self(percent)
        }
    }

    #[must_use]
    pub const fn percent(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn is_silent(self) -> bool {
        self.0 == 0
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self(80)
    }
}

/// One position sample read from the widget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackPosition {
    /// Current offset into the track
    pub position: Duration,
    /// Total length, `None` until the widget knows it
    pub duration: Option<Duration>,
}

impl PlaybackPosition {
    fn sample(widget: &dyn Widget) -> Self {
        Self {
            position: duration_from_secs(widget.current_time()).unwrap_or_default(),
            duration: duration_from_secs(widget.duration()).filter(|d| !d.is_zero()),
        }
    }
}

/// Events emitted by the facade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The widget finished initializing; commands are effective from now on
    Ready { track_id: VideoId },
    /// The widget changed transport state
    StateChanged { state: PlayerState },
    /// Periodic position sample
    Position(PlaybackPosition),
    /// A track was loaded, in place or by recreating the widget
    TrackLoaded { track_id: VideoId },
    /// The widget never became ready and was torn down
    InitTimedOut { track_id: VideoId, waited: Duration },
    /// The widget was released
    TornDown { track_id: VideoId },
}

/// Facade tuning, usually derived from [`PlayerConfig`]
#[derive(Debug, Clone)]
pub struct FacadeSettings {
    pub poll_interval: Duration,
    /// `None` waits for the ready signal forever
    pub ready_timeout: Option<Duration>,
    pub initial_volume: Volume,
    pub options: WidgetOptions,
}

impl Default for FacadeSettings {
    fn default() -> Self {
        Self::from(&PlayerConfig::default())
    }
}

impl From<&PlayerConfig> for FacadeSettings {
    fn from(config: &PlayerConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
            ready_timeout: (config.ready_timeout_ms > 0)
                .then(|| Duration::from_millis(config.ready_timeout_ms)),
            initial_volume: Volume::new(config.initial_volume),
            options: config.widget.clone(),
        }
    }
}

/// One live widget and the tasks serving it
struct WidgetSession {
    widget: Arc<dyn Widget>,
    track_id: VideoId,
    generation: u64,
    ready: bool,
    cancel: CancellationToken,
}

impl WidgetSession {
    fn shutdown(self) -> VideoId {
        self.cancel.cancel();
        self.widget.destroy();
        self.track_id
    }
}

struct FacadeInner {
    container: Option<ContainerHandle>,
    /// Options for widgets created from now on
    options: WidgetOptions,
    session: Option<WidgetSession>,
    next_generation: u64,
    volume: Volume,
    muted: bool,
    last_state: Option<PlayerState>,
}

impl FacadeInner {
    fn ready_widget(&self) -> Option<&Arc<dyn Widget>> {
        self.session
            .as_ref()
            .filter(|session| session.ready)
            .map(|session| &session.widget)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|session| session.generation == generation)
    }

    fn teardown(&mut self) -> Option<VideoId> {
        self.last_state = None;
        self.session.take().map(WidgetSession::shutdown)
    }
}

/// State shared between the facade and its background tasks
#[derive(Clone)]
struct Shared {
    inner: Arc<RwLock<FacadeInner>>,
    event_tx: broadcast::Sender<PlaybackEvent>,
}

impl Shared {
    fn emit(&self, event: PlaybackEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn on_ready(&self, generation: u64, poll_interval: Duration) {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;

        let Some(session) = inner.session.as_mut().filter(|s| s.generation == generation) else {
            debug!(target: LOG_TARGET, "Ignoring ready from discarded widget (generation {})", generation);
            return;
        };
        if session.ready {
            debug!(target: LOG_TARGET, "Ignoring repeated ready (generation {})", generation);
            return;
        }

        session.ready = true;
        session.widget.set_volume(inner.volume.percent());
        if inner.muted {
            session.widget.mute();
        }

        let widget = session.widget.clone();
        let track_id = session.track_id.clone();
        let cancel = session.cancel.clone();
        drop(guard);

        info!(target: LOG_TARGET, "Widget ready for {} (generation {})", track_id, generation);
        self.emit(PlaybackEvent::Ready { track_id });

        tokio::spawn(run_position_poller(
            widget,
            self.event_tx.clone(),
            poll_interval,
            cancel,
        ));
    }

    async fn on_state_change(&self, generation: u64, code: i32) {
        let mut inner = self.inner.write().await;
        if !inner.is_current(generation) {
            debug!(target: LOG_TARGET, "Ignoring state {} from discarded widget", code);
            return;
        }

        let state = PlayerState::from_code(code);
        inner.last_state = Some(state);
        drop(inner);

        debug!(target: LOG_TARGET, "Widget state changed: {:?}", state);
        self.emit(PlaybackEvent::StateChanged { state });
    }

    /// Release the widget of `generation` if the facade went away without
    /// getting the chance to do it.
    async fn release_orphaned(&self, generation: u64) {
        let mut inner = self.inner.write().await;
        if !inner.is_current(generation) {
            return;
        }
        if let Some(track_id) = inner.teardown() {
            debug!(target: LOG_TARGET, "Released widget for {} after facade drop", track_id);
        }
    }

    async fn expire_if_not_ready(&self, generation: u64, waited: Duration) {
        let mut inner = self.inner.write().await;
        let pending = inner
            .session
            .as_ref()
            .is_some_and(|s| s.generation == generation && !s.ready);
        if !pending {
            return;
        }

        let track_id = inner.teardown();
        drop(inner);

        if let Some(track_id) = track_id {
            warn!(
                target: LOG_TARGET,
                "Widget for {} not ready after {}ms, tearing it down",
                track_id,
                waited.as_millis_u64()
            );
            self.emit(PlaybackEvent::InitTimedOut { track_id, waited });
        }
    }
}

/// Forward widget events into the facade until the session ends
async fn run_event_pump(
    shared: Shared,
    mut rx: mpsc::UnboundedReceiver<WidgetEvent>,
    generation: u64,
    poll_interval: Duration,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            event = rx.recv() => {
                match event {
                    Some(WidgetEvent::Ready) => shared.on_ready(generation, poll_interval).await,
                    Some(WidgetEvent::StateChange(code)) => shared.on_state_change(generation, code).await,
                    None => {
                        debug!(target: LOG_TARGET, "Widget event channel closed (generation {})", generation);
                        cancel.cancelled().await;
                        break;
                    }
                }
            }
        }
    }

    // Teardown retires the generation before cancelling, so this only
    // releases widgets left behind by a dropped facade.
    shared.release_orphaned(generation).await;
}

async fn run_ready_watchdog(
    shared: Shared,
    generation: u64,
    timeout: Duration,
    cancel: CancellationToken,
) {
    tokio::select! {
        () = cancel.cancelled() => {}
        () = tokio::time::sleep(timeout) => shared.expire_if_not_ready(generation, timeout).await,
    }
}

async fn run_position_poller(
    widget: Arc<dyn Widget>,
    event_tx: broadcast::Sender<PlaybackEvent>,
    interval: Duration,
    cancel: CancellationToken,
) {
    debug!(target: LOG_TARGET, "Starting position poller (interval: {}ms)", interval.as_millis_u64());

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                debug!(target: LOG_TARGET, "Position poller stopped");
                break;
            }
            () = tokio::time::sleep(interval) => {
                let position = PlaybackPosition::sample(widget.as_ref());
                let _ = event_tx.send(PlaybackEvent::Position(position));
            }
        }
    }
}

/// Uniform command interface over an asynchronously initialized widget.
pub struct PlaybackFacade {
    factory: Arc<dyn WidgetFactory>,
    settings: FacadeSettings,
    shared: Shared,
    /// Parent of every session token; cancelled when the facade is dropped
    shutdown: CancellationToken,
}

impl PlaybackFacade {
    #[must_use]
    pub fn new(factory: Arc<dyn WidgetFactory>, settings: FacadeSettings) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let inner = FacadeInner {
            container: None,
            options: settings.options.clone(),
            session: None,
            next_generation: 0,
            volume: settings.initial_volume,
            muted: false,
            last_state: None,
        };

        Self {
            factory,
            settings,
            shared: Shared {
                inner: Arc::new(RwLock::new(inner)),
                event_tx,
            },
            shutdown: CancellationToken::new(),
        }
    }

    /// Subscribe to facade events
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.shared.event_tx.subscribe()
    }

    #[must_use]
    pub const fn settings(&self) -> &FacadeSettings {
        &self.settings
    }

    /// Request a widget in `container` showing `track_id`, using the
    /// options from [`FacadeSettings`].
    ///
    /// Returns once the request is issued; [`PlaybackEvent::Ready`] follows
    /// when the widget is usable. An existing widget is torn down first.
    ///
    /// # Errors
    ///
    /// Returns an input error for a blank or malformed `track_id`, or
    /// [`CoreError::WidgetCreation`] if the factory refuses the request.
    pub async fn initialize(&self, container: ContainerHandle, track_id: &str) -> Result<()> {
        self.initialize_with(container, track_id, &self.settings.options)
            .await
    }

    /// Like [`Self::initialize`], with explicit widget options. The options
    /// also apply to widgets later recreated by [`Self::load_track`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::initialize`].
    pub async fn initialize_with(
        &self,
        container: ContainerHandle,
        track_id: &str,
        options: &WidgetOptions,
    ) -> Result<()> {
        let id = VideoId::parse(track_id)?;
        let mut inner = self.shared.inner.write().await;
        inner.container = Some(container);
        inner.options = options.clone();
        self.start_session(&mut inner, id)
    }

    fn start_session(&self, inner: &mut FacadeInner, id: VideoId) -> Result<()> {
        let container = inner
            .container
            .clone()
            .ok_or(CoreError::PlayerNotInitialized)?;

        if let Some(previous) = inner.teardown() {
            debug!(target: LOG_TARGET, "Discarding widget for {}", previous);
        }

        inner.next_generation += 1;
        let generation = inner.next_generation;

        let (sink, rx) = WidgetEventSink::channel();
        let widget = self
            .factory
            .create(&container, &id, &inner.options, sink)?;
        let cancel = self.shutdown.child_token();

        info!(
            target: LOG_TARGET,
            "Requested widget for {} in {} (generation {})",
            id,
            container.as_str(),
            generation
        );

        tokio::spawn(run_event_pump(
            self.shared.clone(),
            rx,
            generation,
            self.settings.poll_interval,
            cancel.clone(),
        ));
        if let Some(timeout) = self.settings.ready_timeout {
            tokio::spawn(run_ready_watchdog(
                self.shared.clone(),
                generation,
                timeout,
                cancel.clone(),
            ));
        }

        inner.session = Some(WidgetSession {
            widget,
            track_id: id,
            generation,
            ready: false,
            cancel,
        });
        Ok(())
    }

    /// Load a track, in place when the widget is ready, otherwise by
    /// (re)creating the widget in the container given to [`Self::initialize`].
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::EmptyInput`] or [`CoreError::InvalidTrackId`] for
    /// bad input, [`CoreError::PlayerNotInitialized`] if no container was ever
    /// given, or a widget creation error.
    pub async fn load_track(&self, track_id: &str) -> Result<()> {
        let id = VideoId::parse(track_id)?;
        let mut guard = self.shared.inner.write().await;
        let inner = &mut *guard;

        let in_place = inner.session.as_ref().is_some_and(|s| s.ready);
        if in_place {
            if let Some(session) = inner.session.as_mut() {
                session.widget.load_by_id(&id);
                session.track_id = id.clone();
            }
            inner.last_state = None;
            info!(target: LOG_TARGET, "Loaded {} into the existing widget", id);
        } else {
            self.start_session(inner, id.clone())?;
        }
        drop(guard);

        self.shared.emit(PlaybackEvent::TrackLoaded { track_id: id });
        Ok(())
    }

    /// Start playback. Returns whether the command reached the widget.
    pub async fn play(&self) -> bool {
        self.with_ready_widget("play", |widget| widget.play()).await
    }

    /// Pause playback. Returns whether the command reached the widget.
    pub async fn pause(&self) -> bool {
        self.with_ready_widget("pause", |widget| widget.pause()).await
    }

    /// Jump to `position`. Callers clamp to the known duration.
    pub async fn seek_to(&self, position: Duration) -> bool {
        self.with_ready_widget("seek", |widget| widget.seek_to(position.as_secs_f64()))
            .await
    }

    /// Remember `volume` and apply it if the widget is ready.
    pub async fn set_volume(&self, volume: Volume) -> bool {
        let mut inner = self.shared.inner.write().await;
        inner.volume = volume;
        inner.ready_widget().map_or(false, |widget| {
            widget.set_volume(volume.percent());
            true
        })
    }

    pub async fn mute(&self) -> bool {
        let mut inner = self.shared.inner.write().await;
        inner.muted = true;
        inner.ready_widget().map_or(false, |widget| {
            widget.mute();
            true
        })
    }

    /// Unmute and restore the most recently set volume.
    pub async fn unmute(&self) -> bool {
        let mut inner = self.shared.inner.write().await;
        inner.muted = false;
        let volume = inner.volume;
        inner.ready_widget().map_or(false, |widget| {
            widget.unmute();
            widget.set_volume(volume.percent());
            true
        })
    }

    /// Read position and duration from the widget, if it is ready.
    pub async fn poll_position(&self) -> Option<PlaybackPosition> {
        let inner = self.shared.inner.read().await;
        inner
            .ready_widget()
            .map(|widget| PlaybackPosition::sample(widget.as_ref()))
    }

    /// Release the widget. Safe to call repeatedly or before initialization.
    ///
    /// Returns whether a widget was released.
    pub async fn teardown(&self) -> bool {
        let released = self.shared.inner.write().await.teardown();
        match released {
            Some(track_id) => {
                info!(target: LOG_TARGET, "Tore down widget for {}", track_id);
                self.shared.emit(PlaybackEvent::TornDown { track_id });
                true
            }
            None => false,
        }
    }

    /// Last state reported by the widget
    pub async fn state(&self) -> Option<PlayerState> {
        self.shared.inner.read().await.last_state
    }

    /// Whether the widget last reported that it is playing
    pub async fn is_playing(&self) -> bool {
        self.state().await.is_some_and(PlayerState::is_playing)
    }

    pub async fn is_ready(&self) -> bool {
        self.shared.inner.read().await.ready_widget().is_some()
    }

    /// Track currently assigned to the widget
    pub async fn current_track(&self) -> Option<VideoId> {
        self.shared
            .inner
            .read()
            .await
            .session
            .as_ref()
            .map(|session| session.track_id.clone())
    }

    pub async fn volume(&self) -> Volume {
        self.shared.inner.read().await.volume
    }

    pub async fn is_muted(&self) -> bool {
        self.shared.inner.read().await.muted
    }

    async fn with_ready_widget(&self, command: &str, f: impl FnOnce(&dyn Widget)) -> bool {
        let inner = self.shared.inner.read().await;
        if let Some(widget) = inner.ready_widget() {
            f(widget.as_ref());
            true
        } else {
            debug!(target: LOG_TARGET, "Ignoring {}: widget not ready", command);
            false
        }
    }
}

impl Drop for PlaybackFacade {
    fn drop(&mut self) {
        self.shutdown.cancel();
        match self.shared.inner.try_write() {
            Ok(mut inner) => {
                if let Some(track_id) = inner.teardown() {
                    debug!(target: LOG_TARGET, "Released widget for {} on drop", track_id);
                }
            }
            // The session's event pump releases the widget once the lock frees up
            Err(_) => debug!(target: LOG_TARGET, "Facade dropped while busy; deferring release"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{next_event, Call, RecordingFactory};

    const FIRST: &str = "dQw4w9WgXcQ";
    const SECOND: &str = "kJQP7kiw5Fk";

    fn facade(factory: &Arc<RecordingFactory>) -> PlaybackFacade {
        PlaybackFacade::new(factory.clone(), FacadeSettings::default())
    }

    async fn ready_facade(factory: &Arc<RecordingFactory>) -> PlaybackFacade {
        let facade = facade(factory);
        let mut rx = facade.subscribe();
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();
        factory.sink(0).ready();
        next_event(&mut rx, |e| matches!(e, PlaybackEvent::Ready { .. })).await;
        facade
    }

    #[test]
    fn test_volume_clamps() {
        assert_eq!(Volume::new(150), Volume::MAX);
        assert_eq!(Volume::new(42).percent(), 42);
        assert!(Volume::SILENT.is_silent());
        assert_eq!(Volume::default().percent(), 80);
    }

    #[test]
    fn test_settings_from_config() {
        let config = PlayerConfig {
            ready_timeout_ms: 0,
            poll_interval_ms: 250,
            initial_volume: 30,
            ..PlayerConfig::default()
        };
        let settings = FacadeSettings::from(&config);
        assert_eq!(settings.ready_timeout, None);
        assert_eq!(settings.poll_interval, Duration::from_millis(250));
        assert_eq!(settings.initial_volume, Volume::new(30));
    }

    #[tokio::test]
    async fn test_commands_without_widget_are_noops() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);

        assert!(!facade.play().await);
        assert!(!facade.pause().await);
        assert!(!facade.seek_to(Duration::from_secs(5)).await);
        assert!(!facade.mute().await);
        assert!(facade.poll_position().await.is_none());
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_commands_before_ready_are_noops() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();

        assert!(!facade.play().await);
        assert!(!facade.seek_to(Duration::from_secs(5)).await);
        assert!(!facade.is_ready().await);
        assert_eq!(factory.created(), 1);
        assert!(factory.widget(0).calls().is_empty());
        assert_eq!(factory.container(0), "player");
    }

    #[tokio::test]
    async fn test_ready_applies_stored_volume_and_enables_commands() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();
        assert!(!facade.set_volume(Volume::new(55)).await);

        let mut rx = facade.subscribe();
        factory.sink(0).ready();
        let event = next_event(&mut rx, |e| matches!(e, PlaybackEvent::Ready { .. })).await;
        assert_eq!(
            event,
            PlaybackEvent::Ready {
                track_id: VideoId::parse(FIRST).unwrap()
            }
        );

        assert!(facade.play().await);
        assert!(facade.seek_to(Duration::from_millis(1500)).await);
        assert_eq!(
            factory.widget(0).calls(),
            vec![Call::SetVolume(55), Call::Play, Call::SeekTo(1.5)]
        );
    }

    #[tokio::test]
    async fn test_repeated_ready_is_ignored() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;
        let mut rx = facade.subscribe();

        factory.sink(0).ready();
        factory.sink(0).state_changed(1);
        let event = next_event(&mut rx, |e| !matches!(e, PlaybackEvent::Position(_))).await;
        assert_eq!(event, PlaybackEvent::StateChanged { state: PlayerState::Playing });
        assert_eq!(factory.widget(0).calls(), vec![Call::SetVolume(80)]);
    }

    #[tokio::test]
    async fn test_unmute_restores_last_volume() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;

        assert!(facade.set_volume(Volume::new(35)).await);
        assert!(facade.mute().await);
        assert!(facade.is_muted().await);
        assert!(facade.unmute().await);

        assert_eq!(
            factory.widget(0).calls(),
            vec![
                Call::SetVolume(80),
                Call::SetVolume(35),
                Call::Mute,
                Call::Unmute,
                Call::SetVolume(35),
            ]
        );
        assert_eq!(facade.volume().await, Volume::new(35));
    }

    #[tokio::test]
    async fn test_mute_before_ready_is_applied_on_ready() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();
        assert!(!facade.mute().await);

        let mut rx = facade.subscribe();
        factory.sink(0).ready();
        next_event(&mut rx, |e| matches!(e, PlaybackEvent::Ready { .. })).await;
        assert_eq!(factory.widget(0).calls(), vec![Call::SetVolume(80), Call::Mute]);
    }

    #[tokio::test]
    async fn test_is_playing_follows_widget_state() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;
        let mut rx = facade.subscribe();

        assert!(facade.play().await);
        assert!(!facade.is_playing().await);

        // Autoplay blocked: the widget reports paused despite the play command
        factory.sink(0).state_changed(2);
        next_event(&mut rx, |e| matches!(e, PlaybackEvent::StateChanged { .. })).await;
        assert!(!facade.is_playing().await);
        assert_eq!(facade.state().await, Some(PlayerState::Paused));

        factory.sink(0).state_changed(1);
        next_event(&mut rx, |e| matches!(e, PlaybackEvent::StateChanged { .. })).await;
        assert!(facade.is_playing().await);
    }

    #[tokio::test]
    async fn test_load_track_validates_input() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);

        assert!(matches!(facade.load_track("").await, Err(CoreError::EmptyInput)));
        assert!(matches!(
            facade.load_track("nope").await,
            Err(CoreError::InvalidTrackId { .. })
        ));
        assert!(matches!(
            facade.load_track(SECOND).await,
            Err(CoreError::PlayerNotInitialized)
        ));
        assert_eq!(factory.created(), 0);
    }

    #[tokio::test]
    async fn test_load_track_in_place_when_ready() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;
        let mut rx = facade.subscribe();

        facade.load_track(SECOND).await.unwrap();

        assert_eq!(factory.created(), 1);
        assert_eq!(
            factory.widget(0).calls().last(),
            Some(&Call::LoadById(SECOND.to_string()))
        );
        assert_eq!(facade.current_track().await.unwrap().as_str(), SECOND);
        assert!(facade.is_ready().await);
        let event = next_event(&mut rx, |e| matches!(e, PlaybackEvent::TrackLoaded { .. })).await;
        assert_eq!(
            event,
            PlaybackEvent::TrackLoaded {
                track_id: VideoId::parse(SECOND).unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_load_track_before_ready_recreates_widget() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();

        facade.load_track(SECOND).await.unwrap();

        assert_eq!(factory.created(), 2);
        assert_eq!(factory.widget(0).calls(), vec![Call::Destroy]);
        assert_eq!(factory.track(1), SECOND);

        // Only the replacement widget can make the facade ready
        let mut rx = facade.subscribe();
        factory.sink(0).ready();
        factory.sink(1).ready();
        let event = next_event(&mut rx, |e| matches!(e, PlaybackEvent::Ready { .. })).await;
        assert_eq!(
            event,
            PlaybackEvent::Ready {
                track_id: VideoId::parse(SECOND).unwrap()
            }
        );
    }

    #[tokio::test]
    async fn test_teardown_is_idempotent() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        assert!(!facade.teardown().await);
        assert!(!facade.teardown().await);

        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();
        assert!(facade.teardown().await);
        assert!(!facade.teardown().await);
        assert_eq!(factory.widget(0).calls(), vec![Call::Destroy]);
        assert!(facade.current_track().await.is_none());
    }

    #[tokio::test]
    async fn test_drop_destroys_widget() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;
        drop(facade);
        assert_eq!(factory.widget(0).calls().last(), Some(&Call::Destroy));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_while_ready_handler_holds_lock_releases_widget() {
        let factory = Arc::new(RecordingFactory::with_volume_delay(Duration::from_millis(300)));
        let settings = FacadeSettings {
            poll_interval: Duration::from_millis(20),
            ..FacadeSettings::default()
        };
        let facade = PlaybackFacade::new(factory.clone(), settings);
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();

        // Drop while the ready handler is stuck applying the volume
        factory.sink(0).ready();
        tokio::time::sleep(Duration::from_millis(50)).await;
        drop(facade);
        tokio::time::sleep(Duration::from_millis(600)).await;

        let widget = factory.widget(0);
        assert_eq!(widget.calls(), vec![Call::SetVolume(80), Call::Destroy]);

        let samples = widget.samples();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(widget.samples(), samples);
    }

    #[tokio::test]
    async fn test_initialize_with_options_applies_to_recreated_widgets() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        let options = WidgetOptions {
            autoplay: false,
            show_controls: true,
            ..WidgetOptions::default()
        };

        facade
            .initialize_with(ContainerHandle::new("player"), FIRST, &options)
            .await
            .unwrap();
        facade.load_track(SECOND).await.unwrap();

        assert_eq!(factory.created(), 2);
        assert_eq!(factory.options(0), options);
        assert_eq!(factory.options(1), options);
    }

    #[tokio::test]
    async fn test_initialize_uses_configured_options() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = facade(&factory);
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();
        assert_eq!(factory.options(0), WidgetOptions::default());
    }

    #[tokio::test]
    async fn test_factory_failure_is_reported() {
        let factory = Arc::new(RecordingFactory::failing());
        let facade = facade(&factory);

        let result = facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await;
        assert!(matches!(result, Err(CoreError::WidgetCreation { .. })));
        assert!(facade.current_track().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_position_is_polled_after_ready() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;
        let mut rx = facade.subscribe();

        factory.widget(0).set_times(f64::NAN, f64::NAN);
        let PlaybackEvent::Position(early) =
            next_event(&mut rx, |e| matches!(e, PlaybackEvent::Position(_))).await
        else {
            unreachable!()
        };
        assert_eq!(early.position, Duration::ZERO);
        assert_eq!(early.duration, None);

        factory.widget(0).set_times(12.5, 200.0);
        let PlaybackEvent::Position(sample) =
            next_event(&mut rx, |e| matches!(e, PlaybackEvent::Position(_))).await
        else {
            unreachable!()
        };
        assert_eq!(sample.position, Duration::from_millis(12_500));
        assert_eq!(sample.duration, Some(Duration::from_secs(200)));

        assert_eq!(facade.poll_position().await, Some(sample));
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_stops_after_teardown() {
        let factory = Arc::new(RecordingFactory::default());
        let facade = ready_facade(&factory).await;
        let mut rx = facade.subscribe();

        facade.teardown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let mut positions = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, PlaybackEvent::Position(_)) {
                positions += 1;
            }
        }
        assert_eq!(positions, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_timeout_tears_down_widget() {
        let factory = Arc::new(RecordingFactory::default());
        let settings = FacadeSettings {
            ready_timeout: Some(Duration::from_secs(5)),
            ..FacadeSettings::default()
        };
        let facade = PlaybackFacade::new(factory.clone(), settings);
        let mut rx = facade.subscribe();
        facade
            .initialize(ContainerHandle::new("player"), FIRST)
            .await
            .unwrap();

        let event = next_event(&mut rx, |e| matches!(e, PlaybackEvent::InitTimedOut { .. })).await;
        assert_eq!(
            event,
            PlaybackEvent::InitTimedOut {
                track_id: VideoId::parse(FIRST).unwrap(),
                waited: Duration::from_secs(5),
            }
        );
        assert_eq!(factory.widget(0).calls(), vec![Call::Destroy]);
        assert!(facade.current_track().await.is_none());
        assert!(!facade.play().await);
    }
}
