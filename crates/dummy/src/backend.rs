// Dummy engine: opens instantly (or after a configured delay), plays nothing

use crate::config::DummyConfig;
use crate::metadata::DummyMetadata;
use mediaplay_core::error::{EngineError, OpenError, OpenFailure};
use mediaplay_core::features::{
    AudioLevelKey, MediaMetadataKey, PlaybackSpeedKey, StatefulAspectRatio, StatefulAudioLevel,
    StatefulPlaybackSpeed, VideoAspectRatioKey,
};
use mediaplay_core::task::sleep_unless_cancelled;
use mediaplay_core::track::{SubtitleTrack, TrackGroup};
use mediaplay_core::{
    Backend, CancellationToken, EngineEvents, FeatureRegistry, MediaData, MediaProperties,
    MonoTasker, OpenedMedia, StateCell, TaskHandle,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Engine handle for one opened payload
#[derive(Debug)]
pub struct DummySession {
    pub id: u64,
    pub uri: String,
}

/// Counters and engine-side state shared with release actions
#[derive(Default)]
struct Engine {
    opened: AtomicUsize,
    released: AtomicUsize,
    next_session: AtomicU64,
    position: AtomicU64,
    playing: AtomicBool,
    closed: AtomicBool,
}

pub struct DummyBackend {
    config: DummyConfig,
    engine: Arc<Engine>,
    events: Mutex<Option<EngineEvents>>,
    speed: Arc<StatefulPlaybackSpeed>,
    audio: Arc<StatefulAudioLevel>,
    metadata: Arc<DummyMetadata>,
    aspect_ratio: Arc<StatefulAspectRatio>,
    active_subtitle: StateCell<Option<SubtitleTrack>>,
    subtitle_switcher: MonoTasker,
}

impl DummyBackend {
    pub fn new(config: DummyConfig) -> Self {
        let speed = StatefulPlaybackSpeed::new(|speed| {
            log::debug!("[dummy] playback speed set to {}", speed);
        });
        let audio = StatefulAudioLevel::new(config.max_volume, |volume, mute| {
            log::debug!("[dummy] volume {} (mute: {})", volume, mute);
        });
        let metadata = DummyMetadata::new(config.duration_millis);

        Self {
            config,
            engine: Arc::new(Engine::default()),
            events: Mutex::new(None),
            speed: Arc::new(speed),
            audio: Arc::new(audio),
            metadata: Arc::new(metadata),
            aspect_ratio: Arc::new(StatefulAspectRatio::new()),
            active_subtitle: StateCell::new(None),
            subtitle_switcher: MonoTasker::new("dummy-subtitles"),
        }
    }

    pub fn config(&self) -> &DummyConfig {
        &self.config
    }

    /// Payloads opened successfully so far
    pub fn opened_count(&self) -> usize {
        self.engine.opened.load(Ordering::SeqCst)
    }

    /// Opened payloads released so far
    pub fn released_count(&self) -> usize {
        self.engine.released.load(Ordering::SeqCst)
    }

    pub fn is_playing(&self) -> bool {
        self.engine.playing.load(Ordering::SeqCst)
    }

    pub fn is_engine_closed(&self) -> bool {
        self.engine.closed.load(Ordering::SeqCst)
    }

    /// Subtitle track the engine currently renders
    pub fn active_subtitle(&self) -> Option<SubtitleTrack> {
        self.active_subtitle.get()
    }

    /// Select a subtitle track and switch the engine over to it.
    ///
    /// Switches are single-flight: a newer selection cancels one still in
    /// progress. Resolves to `false` if `track` is not a candidate or the
    /// switch was superseded.
    pub fn select_subtitle(&self, track: Option<SubtitleTrack>) -> TaskHandle<bool> {
        let group = self.metadata.subtitles.clone();
        let active = self.active_subtitle.clone();
        let delay = self.config.subtitle_switch_delay;

        self.subtitle_switcher.launch(move |token| {
            if !group.select(track.clone()) {
                log::warn!("[dummy] subtitle {:?} is not a candidate", track);
                return false;
            }
            if !sleep_unless_cancelled(token, delay) {
                return false;
            }
            active.set(track);
            true
        })
    }

    pub fn simulate_error(&self, message: &str) {
        if let Some(events) = self.events() {
            events.report_error(EngineError::Decoder(message.to_string()));
        }
    }

    pub fn simulate_end_of_stream(&self) {
        self.engine.playing.store(false, Ordering::SeqCst);
        if let Some(duration) = self.config.duration_millis {
            self.engine.position.store(duration, Ordering::SeqCst);
        }
        if let Some(events) = self.events() {
            events.report_finished();
        }
    }

    pub fn simulate_buffering(&self, buffering: bool) {
        if let Some(events) = self.events() {
            events.report_buffering(buffering);
        }
    }

    pub fn simulate_progress(&self, position_ms: u64) {
        self.engine.position.store(position_ms, Ordering::SeqCst);
        if let Some(events) = self.events() {
            events.report_position(position_ms);
        }
    }

    fn events(&self) -> Option<EngineEvents> {
        let events = self.events.lock().clone();
        if events.is_none() {
            log::warn!("[dummy] engine event dropped, backend not attached to a player");
        }
        events
    }
}

impl Backend for DummyBackend {
    type Payload = MediaData;
    type Resource = DummySession;

    fn attach(&self, events: EngineEvents) {
        *self.events.lock() = Some(events);
    }

    fn features(&self) -> FeatureRegistry {
        FeatureRegistry::builder()
            .add::<PlaybackSpeedKey>(self.speed.clone())
            .add::<AudioLevelKey>(self.audio.clone())
            .add::<MediaMetadataKey>(self.metadata.clone())
            .add::<VideoAspectRatioKey>(self.aspect_ratio.clone())
            .build()
    }

    fn open(
        &self,
        payload: &Arc<MediaData>,
        cancel: &CancellationToken,
    ) -> Result<OpenedMedia<DummySession>, OpenError> {
        let uri = payload.uri().to_string();
        if self.config.fails(&uri) {
            return Err(OpenError::failed(
                OpenFailure::NoMatchingFile,
                format!("no media found at {}", uri),
            ));
        }
        if let MediaData::SeekableInput(input) = payload.as_ref() {
            // Read the source length the way a real engine would
            input.file_length()?;
        }

        // Nothing is reported for a request cancelled while opening
        if !sleep_unless_cancelled(cancel, self.config.open_delay) {
            payload.close();
            return Err(OpenError::Cancelled);
        }

        self.engine.opened.fetch_add(1, Ordering::SeqCst);
        self.engine.position.store(0, Ordering::SeqCst);
        self.metadata.load(payload.extra_files());
        if let Some(events) = self.events.lock().as_ref() {
            events.report_properties(MediaProperties {
                title: Some(uri.clone()),
                duration_millis: self.config.duration_millis,
            });
        }

        let id = self.engine.next_session.fetch_add(1, Ordering::SeqCst);
        log::debug!("[dummy] opened session {} for {}", id, uri);

        let engine = self.engine.clone();
        let metadata = self.metadata.clone();
        let media = payload.clone();
        Ok(OpenedMedia::new(DummySession { id, uri }, move || {
            media.close();
            metadata.unload();
            engine.released.fetch_add(1, Ordering::SeqCst);
            log::debug!("[dummy] released session {}", id);
        }))
    }

    fn start(&self, resource: &DummySession) -> Result<(), EngineError> {
        if self.engine.closed.load(Ordering::SeqCst) {
            return Err(EngineError::Playback("engine is closed".to_string()));
        }
        log::debug!("[dummy] playing session {}", resource.id);
        self.engine.playing.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn pause(&self) -> Result<(), EngineError> {
        self.engine.playing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {
        self.engine.playing.store(false, Ordering::SeqCst);
        self.engine.position.store(0, Ordering::SeqCst);
    }

    fn seek_to(&self, position_ms: u64) {
        let position = match self.config.duration_millis {
            Some(duration) => position_ms.min(duration),
            None => position_ms,
        };
        self.engine.position.store(position, Ordering::SeqCst);
    }

    fn close_engine(&self) {
        self.subtitle_switcher.cancel_and_join();
        self.engine.playing.store(false, Ordering::SeqCst);
        self.engine.closed.store(true, Ordering::SeqCst);
        log::info!("[dummy] engine closed");
    }

    fn current_position_millis(&self) -> u64 {
        self.engine.position.load(Ordering::SeqCst)
    }
}
