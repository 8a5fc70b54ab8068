// Player facade: routes commands to the engine adapter when the state allows it
// Commands issued in the wrong state are ignored; only opening media fails towards
// the caller, everything else is published as ERROR.
// set_media_data and its async variants may be called from any thread, the other
// commands are meant for a single command thread.

use crate::backend::Backend;
use crate::callback::PlayerCallback;
use crate::cell::{StateCell, Subscription};
use crate::config::PlayerConfig;
use crate::error::{EngineError, OpenError};
use crate::events::{EngineEvents, PlayerSignals};
use crate::features::FeatureRegistry;
use crate::media::MediaProperties;
use crate::resource::OpenedMedia;
use crate::state::{Command, PlaybackState};
use crate::swap::{MediaSwapCoordinator, SwapOutcome, SwapTarget};
use crate::task::{CancellationToken, MonoTasker, TaskHandle};
use std::sync::Arc;

type LoadResult = Result<SwapOutcome, OpenError>;

pub struct Player<B: Backend> {
    name: String,
    backend: Arc<B>,
    signals: Arc<PlayerSignals>,
    media: StateCell<Option<Arc<B::Payload>>>,
    swap: Arc<MediaSwapCoordinator<B::Payload, B::Resource>>,
    loader: MonoTasker,
    features: FeatureRegistry,
}

impl<B: Backend> Player<B> {
    pub fn new(backend: B, config: PlayerConfig) -> Self {
        let signals = Arc::new(PlayerSignals::new(&config));
        let backend = Arc::new(backend);
        backend.attach(EngineEvents::new(signals.clone()));
        let features = backend.features();

        let swap = Arc::new(MediaSwapCoordinator::new());
        let loader = MonoTasker::with_parent(format!("{}-loader", config.name), swap.root_token())
            .with_poll_interval(config.chain_poll_interval);

        log::info!("[player:{}] created, features: {:?}", config.name, features);
        Self {
            name: config.name,
            backend,
            signals,
            media: StateCell::new(None),
            swap,
            loader,
            features,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The engine adapter, for engine-specific calls not covered here
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Sink the adapter can also obtain after construction
    pub fn engine_events(&self) -> EngineEvents {
        EngineEvents::new(self.signals.clone())
    }

    pub fn features(&self) -> &FeatureRegistry {
        &self.features
    }

    // -------------------------------------------------------------------------
    // Media
    // -------------------------------------------------------------------------

    /// Open `data` and make it the current media, blocking until it is ready.
    ///
    /// Identical payloads (same `Arc`) are ignored, as is any call on a
    /// destroyed player. A pending asynchronous load is cancelled first.
    /// Open failures are published as ERROR and returned.
    pub fn set_media_data(&self, data: impl Into<Arc<B::Payload>>) -> LoadResult {
        let payload = data.into();
        if self.current_playback_state().is_terminal() {
            return Ok(SwapOutcome::Unchanged);
        }
        self.loader.cancel();
        let token = self.swap.root_token().child_token();
        self.swap.swap(payload, &token, &self.swap_target())
    }

    /// Load `data` on the background loader, superseding any load in flight.
    ///
    /// Only the most recent request can end up READY; a superseded request
    /// resolves to [`SwapOutcome::Discarded`].
    pub fn set_media_data_async(
        &self,
        data: impl Into<Arc<B::Payload>>,
    ) -> TaskHandle<LoadResult> {
        let payload = data.into();
        let swap = self.swap.clone();
        let target = self.swap_target();
        self.loader
            .launch(move |token| swap.swap(payload, token, &target))
    }

    /// Load `data` once the load in flight (if any) has finished, instead of
    /// superseding it
    pub fn queue_media_data(&self, data: impl Into<Arc<B::Payload>>) -> TaskHandle<LoadResult> {
        let payload = data.into();
        let swap = self.swap.clone();
        let target = self.swap_target();
        self.loader
            .launch_chained(move |token| swap.swap(payload, token, &target))
    }

    /// Whether an asynchronous load is in flight
    pub fn is_loading(&self) -> bool {
        self.loader.is_running()
    }

    pub fn loading_stream(&self) -> Subscription<bool> {
        self.loader.running_stream()
    }

    pub fn media_data(&self) -> Option<Arc<B::Payload>> {
        self.media.get()
    }

    pub fn media_data_stream(&self) -> Subscription<Option<Arc<B::Payload>>> {
        self.media.subscribe()
    }

    // -------------------------------------------------------------------------
    // Playback commands
    // -------------------------------------------------------------------------

    pub fn resume(&self) {
        if !Command::Resume.is_legal_from(self.current_playback_state()) {
            return;
        }
        match self.swap.with_current(|r| self.backend.start(r.resource())) {
            None => log::debug!("[player:{}] resume ignored, no media installed", self.name),
            Some(Ok(())) => {
                self.signals.transition(|s| {
                    Command::Resume
                        .is_legal_from(s)
                        .then_some(PlaybackState::Playing)
                });
            }
            Some(Err(e)) => self.engine_failed(e),
        }
    }

    pub fn pause(&self) {
        if !Command::Pause.is_legal_from(self.current_playback_state()) {
            return;
        }
        match self.backend.pause() {
            Ok(()) => {
                self.signals.transition(|s| {
                    Command::Pause
                        .is_legal_from(s)
                        .then_some(PlaybackState::Paused)
                });
            }
            Err(e) => self.engine_failed(e),
        }
    }

    pub fn toggle_pause(&self) {
        if self.current_playback_state().is_playing() {
            self.pause();
        } else {
            self.resume();
        }
    }

    /// Stop the engine, release the current media and move to FINISHED
    pub fn stop_playback(&self) {
        if !Command::StopPlayback.is_legal_from(self.current_playback_state()) {
            return;
        }
        self.loader.cancel();

        let cleared = self.swap.clear(|| {
            if !Command::StopPlayback.is_legal_from(self.current_playback_state()) {
                return false;
            }
            self.backend.stop();
            true
        });
        if !cleared {
            return;
        }

        self.media.set(None);
        self.signals.position.set(0);
        self.signals.properties.set(None);
        self.signals.transition(|s| {
            Command::StopPlayback
                .is_legal_from(s)
                .then_some(PlaybackState::Finished)
        });
    }

    pub fn seek_to(&self, position_ms: u64) {
        if !Command::Seek.is_legal_from(self.current_playback_state()) {
            return;
        }
        self.backend.seek_to(position_ms);
        // The engine may clamp the target to the media bounds
        self.signals
            .publish_position(self.backend.current_position_millis());
    }

    /// Seek relative to the current position; the target is clamped at 0
    pub fn skip(&self, delta_ms: i64) {
        let current = self.current_position_millis() as i64;
        let target = current.saturating_add(delta_ms).max(0) as u64;
        self.seek_to(target);
    }

    /// Release everything and move to DESTROYED. Only the first call has an
    /// effect; later and concurrent calls return immediately.
    pub fn close(&self) {
        if !self.swap.close() {
            return;
        }
        log::info!("[player:{}] closing", self.name);
        self.loader.cancel();
        self.backend.close_engine();
        // Cleared under the state lock so a racing install cannot republish media
        self.signals.transition_with(
            |_| Some(PlaybackState::Destroyed),
            || {
                self.media.set(None);
                self.signals.position.set(0);
                self.signals.properties.set(None);
            },
        );
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    pub fn current_playback_state(&self) -> PlaybackState {
        self.signals.current()
    }

    pub fn playback_state_stream(&self) -> Subscription<PlaybackState> {
        self.signals.state.subscribe()
    }

    /// 0 while no media is set
    pub fn current_position_millis(&self) -> u64 {
        if self.media.get().is_none() {
            return 0;
        }
        self.backend.current_position_millis()
    }

    pub fn position_stream(&self) -> Subscription<u64> {
        self.signals.position.subscribe()
    }

    pub fn media_properties(&self) -> Option<MediaProperties> {
        self.signals.properties.get()
    }

    pub fn media_properties_stream(&self) -> Subscription<Option<MediaProperties>> {
        self.signals.properties.subscribe()
    }

    /// Position over duration in `0.0..=1.0`; 0 while the duration is unknown
    pub fn playback_progress(&self) -> f32 {
        let duration = match self.media_properties().and_then(|p| p.duration_millis) {
            Some(duration) if duration > 0 => duration,
            _ => return 0.0,
        };
        (self.current_position_millis() as f64 / duration as f64).clamp(0.0, 1.0) as f32
    }

    pub fn add_callback(&self, callback: Arc<dyn PlayerCallback>) {
        self.signals.add_callback(callback);
    }

    fn engine_failed(&self, error: EngineError) {
        log::error!("[player:{}] engine command failed: {}", self.name, error);
        self.signals.publish_error(error.to_string());
    }

    fn swap_target(&self) -> PlayerSwapTarget<B> {
        PlayerSwapTarget {
            backend: self.backend.clone(),
            signals: self.signals.clone(),
            media: self.media.clone(),
        }
    }
}

impl<B: Backend> Drop for Player<B> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Glue between the swap coordinator and the engine plus published state
struct PlayerSwapTarget<B: Backend> {
    backend: Arc<B>,
    signals: Arc<PlayerSignals>,
    media: StateCell<Option<Arc<B::Payload>>>,
}

impl<B: Backend> SwapTarget<B::Payload, B::Resource> for PlayerSwapTarget<B> {
    fn is_engine_running(&self) -> bool {
        self.signals.current().is_playback_running()
    }

    fn stop_engine(&self) {
        self.backend.stop();
    }

    fn on_cleared(&self) {
        self.media.set(None);
        self.signals.position.set(0);
        self.signals.properties.set(None);
    }

    fn open(
        &self,
        payload: &Arc<B::Payload>,
        cancel: &CancellationToken,
    ) -> Result<OpenedMedia<B::Resource>, OpenError> {
        self.backend.open(payload, cancel)
    }

    fn on_open_failed(&self, error: &OpenError) {
        self.signals.publish_error(error.to_string());
    }

    fn on_installed(&self, payload: &Arc<B::Payload>, cancel: &CancellationToken) {
        // Media becomes visible together with READY, never after DESTROYED
        // and never for a load that was superseded meanwhile
        self.signals.transition_with(
            |_| (!cancel.is_cancelled()).then_some(PlaybackState::Ready),
            || self.media.set(Some(payload.clone())),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::{CallbackEvent, RecordingCallback};
    use crate::error::OpenFailure;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Scripted {
        released: Arc<AtomicUsize>,
        stops: AtomicUsize,
        closes: AtomicUsize,
        position: AtomicU64,
        fail_start: bool,
    }

    impl Backend for Scripted {
        type Payload = String;
        type Resource = String;

        fn open(
            &self,
            payload: &Arc<String>,
            _cancel: &CancellationToken,
        ) -> Result<OpenedMedia<String>, OpenError> {
            if payload.as_str() == "missing" {
                return Err(OpenError::failed(OpenFailure::NoMatchingFile, "missing"));
            }
            let released = self.released.clone();
            Ok(OpenedMedia::new(payload.to_string(), move || {
                released.fetch_add(1, Ordering::SeqCst);
            }))
        }

        fn start(&self, _resource: &String) -> Result<(), EngineError> {
            if self.fail_start {
                return Err(EngineError::Device("no output".to_string()));
            }
            Ok(())
        }

        fn pause(&self) -> Result<(), EngineError> {
            Ok(())
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.position.store(0, Ordering::SeqCst);
        }

        fn seek_to(&self, position_ms: u64) {
            self.position.store(position_ms, Ordering::SeqCst);
        }

        fn close_engine(&self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }

        fn current_position_millis(&self) -> u64 {
            self.position.load(Ordering::SeqCst)
        }
    }

    fn player() -> Player<Scripted> {
        Player::new(
            Scripted::default(),
            PlayerConfig::new("test").with_callback_throttle_ms(0),
        )
    }

    #[test]
    fn test_commands_ignored_before_media() {
        let player = player();
        player.resume();
        player.pause();
        player.stop_playback();
        player.seek_to(1_000);
        assert_eq!(player.current_playback_state(), PlaybackState::Created);
        assert_eq!(player.current_position_millis(), 0);
    }

    #[test]
    fn test_basic_lifecycle() {
        let player = player();
        assert_eq!(
            player.set_media_data("a".to_string()),
            Ok(SwapOutcome::Installed)
        );
        assert_eq!(player.current_playback_state(), PlaybackState::Ready);
        assert_eq!(player.media_data().as_deref(), Some(&"a".to_string()));

        player.resume();
        assert_eq!(player.current_playback_state(), PlaybackState::Playing);
        player.toggle_pause();
        assert_eq!(player.current_playback_state(), PlaybackState::Paused);

        player.seek_to(5_000);
        player.skip(-7_000);
        assert_eq!(player.current_position_millis(), 0);

        player.stop_playback();
        assert_eq!(player.current_playback_state(), PlaybackState::Finished);
        assert_eq!(player.backend().stops.load(Ordering::SeqCst), 1);
        assert_eq!(player.backend().released.load(Ordering::SeqCst), 1);
        assert_eq!(player.media_data(), None);
    }

    #[test]
    fn test_open_failure_is_returned_and_published() {
        let player = player();
        let recorder = Arc::new(RecordingCallback::new());
        player.add_callback(recorder.clone());

        let result = player.set_media_data("missing".to_string());
        assert!(matches!(result, Err(OpenError::Failed { .. })));
        assert_eq!(player.current_playback_state(), PlaybackState::Error);
        assert!(recorder
            .events()
            .iter()
            .any(|e| matches!(e, CallbackEvent::Error { .. })));

        // Recoverable
        assert_eq!(
            player.set_media_data("b".to_string()),
            Ok(SwapOutcome::Installed)
        );
        assert_eq!(player.current_playback_state(), PlaybackState::Ready);
    }

    #[test]
    fn test_same_arc_is_ignored() {
        let player = player();
        let media = Arc::new("a".to_string());
        player.set_media_data(media.clone()).unwrap();
        assert_eq!(player.set_media_data(media), Ok(SwapOutcome::Unchanged));
        assert_eq!(player.backend().released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_engine_failure_on_resume_is_published() {
        let player = Player::new(
            Scripted {
                fail_start: true,
                ..Default::default()
            },
            PlayerConfig::new("test"),
        );
        player.set_media_data("a".to_string()).unwrap();
        player.resume();
        assert_eq!(player.current_playback_state(), PlaybackState::Error);
    }

    #[test]
    fn test_close_is_idempotent() {
        let player = player();
        let states = player.playback_state_stream();
        player.set_media_data("a".to_string()).unwrap();
        player.resume();

        player.close();
        player.close();
        player.resume();
        player.stop_playback();

        assert_eq!(player.current_playback_state(), PlaybackState::Destroyed);
        assert_eq!(player.backend().released.load(Ordering::SeqCst), 1);
        assert_eq!(player.backend().closes.load(Ordering::SeqCst), 1);
        assert_eq!(
            player.set_media_data("b".to_string()),
            Ok(SwapOutcome::Unchanged)
        );

        let seen = states.drain();
        assert_eq!(
            seen,
            vec![
                PlaybackState::Created,
                PlaybackState::Ready,
                PlaybackState::Playing,
                PlaybackState::Destroyed,
            ]
        );
    }

    #[test]
    fn test_async_load_reaches_ready() {
        let player = player();
        let handle = player.set_media_data_async("a".to_string());
        assert_eq!(
            handle.join().completed(),
            Some(Ok(SwapOutcome::Installed))
        );
        assert_eq!(player.current_playback_state(), PlaybackState::Ready);
        let loading = player.loading_stream();
        assert_eq!(
            loading.wait_for(Duration::from_secs(1), |running| !*running),
            Some(false)
        );
    }

    #[test]
    fn test_progress_uses_reported_duration() {
        let player = player();
        player.set_media_data("a".to_string()).unwrap();
        assert_eq!(player.playback_progress(), 0.0);

        player.engine_events().report_properties(MediaProperties {
            title: None,
            duration_millis: Some(10_000),
        });
        player.seek_to(2_500);
        assert!((player.playback_progress() - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_cancelled_install_publishes_nothing() {
        let player = player();
        let token = CancellationToken::new();
        token.cancel();

        player
            .swap_target()
            .on_installed(&Arc::new("a".to_string()), &token);
        assert_eq!(player.current_playback_state(), PlaybackState::Created);
        assert_eq!(player.media_data(), None);
    }

    #[test]
    fn test_install_after_close_publishes_nothing() {
        let player = player();
        let target = player.swap_target();
        player.close();

        target.on_installed(&Arc::new("a".to_string()), &CancellationToken::new());
        assert_eq!(player.current_playback_state(), PlaybackState::Destroyed);
        assert_eq!(player.media_data(), None);
    }

    #[test]
    fn test_stop_clears_properties() {
        let player = player();
        player.set_media_data("a".to_string()).unwrap();
        player.engine_events().report_properties(MediaProperties {
            title: Some("a".to_string()),
            duration_millis: Some(10_000),
        });
        player.resume();

        player.stop_playback();
        assert_eq!(player.media_properties(), None);
    }
}
