//! Recording widget doubles shared by the playback and session tests.

use crate::error::CoreError;
use crate::playback::PlaybackEvent;
use crate::track::VideoId;
use crate::widget::{ContainerHandle, Widget, WidgetEventSink, WidgetFactory, WidgetOptions};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Play,
    Pause,
    SeekTo(f64),
    SetVolume(u8),
    Mute,
    Unmute,
    LoadById(String),
    Destroy,
}

pub(crate) struct RecordingWidget {
    calls: Mutex<Vec<Call>>,
    times: Mutex<(f64, f64)>,
    samples: AtomicUsize,
    volume_delay: Duration,
}

impl RecordingWidget {
    fn new(volume_delay: Duration) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            times: Mutex::new((f64::NAN, f64::NAN)),
            samples: AtomicUsize::new(0),
            volume_delay,
        }
    }

    /// Number of position reads so far
    pub(crate) fn samples(&self) -> usize {
        self.samples.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn set_times(&self, current: f64, duration: f64) {
        *self.times.lock().unwrap() = (current, duration);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Widget for RecordingWidget {
    fn play(&self) {
        self.record(Call::Play);
    }

    fn pause(&self) {
        self.record(Call::Pause);
    }

    fn seek_to(&self, seconds: f64) {
        self.record(Call::SeekTo(seconds));
    }

    fn set_volume(&self, percent: u8) {
        // Blocks like a widget call that is slow to return
        if !self.volume_delay.is_zero() {
            std::thread::sleep(self.volume_delay);
        }
        self.record(Call::SetVolume(percent));
    }

    fn mute(&self) {
        self.record(Call::Mute);
    }

    fn unmute(&self) {
        self.record(Call::Unmute);
    }

    fn load_by_id(&self, id: &VideoId) {
        self.record(Call::LoadById(id.to_string()));
    }

    fn current_time(&self) -> f64 {
        self.samples.fetch_add(1, Ordering::SeqCst);
        self.times.lock().unwrap().0
    }

    fn duration(&self) -> f64 {
        self.times.lock().unwrap().1
    }

    fn destroy(&self) {
        self.record(Call::Destroy);
    }
}

struct Created {
    widget: Arc<RecordingWidget>,
    sink: WidgetEventSink,
    container: String,
    track: String,
    options: WidgetOptions,
}

/// Factory that keeps every widget and sink it hands out
#[derive(Default)]
pub(crate) struct RecordingFactory {
    created: Mutex<Vec<Created>>,
    fail: bool,
    volume_delay: Duration,
}

impl RecordingFactory {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Factory whose widgets block for `delay` in every `set_volume`
    pub(crate) fn with_volume_delay(delay: Duration) -> Self {
        Self {
            volume_delay: delay,
            ..Self::default()
        }
    }

    pub(crate) fn created(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub(crate) fn widget(&self, index: usize) -> Arc<RecordingWidget> {
        self.created.lock().unwrap()[index].widget.clone()
    }

    pub(crate) fn sink(&self, index: usize) -> WidgetEventSink {
        self.created.lock().unwrap()[index].sink.clone()
    }

    pub(crate) fn container(&self, index: usize) -> String {
        self.created.lock().unwrap()[index].container.clone()
    }

    pub(crate) fn track(&self, index: usize) -> String {
        self.created.lock().unwrap()[index].track.clone()
    }

    pub(crate) fn options(&self, index: usize) -> WidgetOptions {
        self.created.lock().unwrap()[index].options.clone()
    }
}

impl WidgetFactory for RecordingFactory {
    fn create(
        &self,
        container: &ContainerHandle,
        id: &VideoId,
        options: &WidgetOptions,
        events: WidgetEventSink,
    ) -> Result<Arc<dyn Widget>, CoreError> {
        if self.fail {
            return Err(CoreError::WidgetCreation {
                reason: "embed script unavailable".into(),
            });
        }

        let widget = Arc::new(RecordingWidget::new(self.volume_delay));
        self.created.lock().unwrap().push(Created {
            widget: widget.clone(),
            sink: events,
            container: container.as_str().to_string(),
            track: id.to_string(),
            options: options.clone(),
        });
        Ok(widget)
    }
}

/// Wait for the next event matching `predicate`, skipping the rest
pub(crate) async fn next_event(
    rx: &mut broadcast::Receiver<PlaybackEvent>,
    predicate: impl Fn(&PlaybackEvent) -> bool,
) -> PlaybackEvent {
    tokio::time::timeout(Duration::from_secs(60), async {
        loop {
            let event = rx.recv().await.unwrap();
            if predicate(&event) {
                return event;
            }
        }
    })
    .await
    .unwrap()
}
