// Observation hub shared by the facade and the engine adapter

use crate::callback::{CallbackEvent, CallbackManager, PlayerCallback};
use crate::cell::StateCell;
use crate::config::PlayerConfig;
use crate::error::EngineError;
use crate::media::MediaProperties;
use crate::state::PlaybackState;
use std::sync::Arc;

/// Published player values plus the listeners that mirror them
pub(crate) struct PlayerSignals {
    pub(crate) name: String,
    pub(crate) state: StateCell<PlaybackState>,
    pub(crate) position: StateCell<u64>,
    pub(crate) properties: StateCell<Option<MediaProperties>>,
    pub(crate) callbacks: CallbackManager,
}

impl PlayerSignals {
    pub(crate) fn new(config: &PlayerConfig) -> Self {
        Self {
            name: config.name.clone(),
            state: StateCell::new(PlaybackState::Created),
            position: StateCell::new(0),
            properties: StateCell::new(None),
            callbacks: CallbackManager::new(config.callback_throttle_ms),
        }
    }

    pub(crate) fn current(&self) -> PlaybackState {
        self.state.get()
    }

    /// Publish the state chosen by `f`, unless the player is destroyed.
    /// Returns whether `f` accepted a target state.
    pub(crate) fn transition<F>(&self, f: F) -> bool
    where
        F: FnOnce(PlaybackState) -> Option<PlaybackState>,
    {
        self.transition_with(f, || {})
    }

    /// Like [`Self::transition`], running `on_accept` under the state lock
    /// right before the new state becomes visible.
    pub(crate) fn transition_with<F, A>(&self, f: F, on_accept: A) -> bool
    where
        F: FnOnce(PlaybackState) -> Option<PlaybackState>,
        A: FnOnce(),
    {
        let mut accepted = false;
        let changed = self.state.update(|current| {
            if current.is_terminal() {
                return None;
            }
            let next = f(*current)?;
            accepted = true;
            on_accept();
            // Equal states are not republished
            (next != *current).then_some(next)
        });

        if let Some((old_state, new_state)) = changed {
            log::debug!("[player:{}] {} -> {}", self.name, old_state, new_state);
            self.callbacks.dispatch_event(CallbackEvent::StateChanged {
                old_state,
                new_state,
            });
        }
        accepted
    }

    /// Move to ERROR and notify listeners. No-op once destroyed.
    pub(crate) fn publish_error(&self, message: String) {
        if self.transition(|_| Some(PlaybackState::Error)) {
            self.callbacks.dispatch_event(CallbackEvent::Error { message });
        }
    }

    pub(crate) fn publish_position(&self, position_ms: u64) {
        self.position.set(position_ms);
        let duration_ms = self.properties.get().and_then(|p| p.duration_millis);
        self.callbacks.dispatch_event(CallbackEvent::PositionChanged {
            position_ms,
            duration_ms,
        });
    }

    pub(crate) fn add_callback(&self, callback: Arc<dyn PlayerCallback>) {
        self.callbacks.add_callback(callback);
    }
}

/// Handle through which an engine reports what happens in the background:
/// decoder failures, end of stream, stalls, progress.
///
/// Reports bypass the media-swap coordinator and are dropped once the player
/// is destroyed. Nothing reported here is ever returned to a command caller.
#[derive(Clone)]
pub struct EngineEvents {
    signals: Arc<PlayerSignals>,
}

impl EngineEvents {
    pub(crate) fn new(signals: Arc<PlayerSignals>) -> Self {
        Self { signals }
    }

    pub fn state(&self) -> PlaybackState {
        self.signals.current()
    }

    pub fn report_error(&self, error: EngineError) {
        log::error!("[player:{}] engine error: {}", self.signals.name, error);
        self.signals.publish_error(error.to_string());
    }

    /// End of stream
    pub fn report_finished(&self) {
        let finished = self
            .signals
            .transition(|s| (s >= PlaybackState::Ready).then_some(PlaybackState::Finished));
        if finished {
            log::info!("[player:{}] playback completed", self.signals.name);
            self.signals
                .callbacks
                .dispatch_event(CallbackEvent::PlaybackCompleted);
        }
    }

    /// Stall or recovery while playing
    pub fn report_buffering(&self, buffering: bool) {
        let changed = self.signals.transition(|s| match (s, buffering) {
            (PlaybackState::Playing, true) => Some(PlaybackState::Buffering),
            (PlaybackState::Buffering, false) => Some(PlaybackState::Playing),
            _ => None,
        });
        if changed {
            self.signals
                .callbacks
                .dispatch_event(CallbackEvent::BufferingChanged { buffering });
        }
    }

    pub fn report_position(&self, position_ms: u64) {
        if self.signals.current().is_terminal() {
            return;
        }
        self.signals.publish_position(position_ms);
    }

    pub fn report_properties(&self, properties: MediaProperties) {
        if self.signals.current().is_terminal() {
            return;
        }
        self.signals.properties.set(Some(properties));
    }
}
