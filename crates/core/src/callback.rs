// Push-style player listeners
// Position updates can arrive at engine frame rate, so they are throttled per listener

use crate::state::PlaybackState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Player event types
#[derive(Debug, Clone, PartialEq)]
pub enum CallbackEvent {
    /// Player state changed
    StateChanged {
        old_state: PlaybackState,
        new_state: PlaybackState,
    },

    /// Playback position updated
    PositionChanged {
        position_ms: u64,
        duration_ms: Option<u64>,
    },

    /// The engine reached the end of the stream
    PlaybackCompleted,

    /// Open or engine error
    Error { message: String },

    /// Buffering state changed
    BufferingChanged { buffering: bool },
}

/// Player callback trait
/// Implementations should be lightweight and non-blocking; they may be
/// called from engine threads.
pub trait PlayerCallback: Send + Sync {
    fn on_event(&self, event: CallbackEvent);
}

/// Throttled callback wrapper
/// Drops position updates that arrive faster than the configured interval
pub struct ThrottledCallback {
    inner: Arc<dyn PlayerCallback>,
    last_position_update: Mutex<Option<Instant>>,
    position_update_interval: Duration,
}

impl ThrottledCallback {
    pub fn new(callback: Arc<dyn PlayerCallback>, update_interval_ms: u64) -> Self {
        Self {
            inner: callback,
            last_position_update: Mutex::new(None),
            position_update_interval: Duration::from_millis(update_interval_ms),
        }
    }

    pub fn dispatch(&self, event: CallbackEvent) {
        match &event {
            CallbackEvent::PositionChanged { .. } => {
                let mut last_update = self.last_position_update.lock();
                let due = last_update
                    .map(|at| at.elapsed() >= self.position_update_interval)
                    .unwrap_or(true);
                if due {
                    *last_update = Some(Instant::now());
                    drop(last_update);
                    self.inner.on_event(event);
                }
            }
            _ => self.inner.on_event(event),
        }
    }
}

/// Fans events out to every registered listener
pub struct CallbackManager {
    callbacks: Mutex<Vec<Arc<ThrottledCallback>>>,
    throttle_ms: u64,
}

impl CallbackManager {
    pub fn new(throttle_ms: u64) -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
            throttle_ms,
        }
    }

    pub fn add_callback(&self, callback: Arc<dyn PlayerCallback>) {
        let throttled = Arc::new(ThrottledCallback::new(callback, self.throttle_ms));
        self.callbacks.lock().push(throttled);
    }

    pub fn clear_callbacks(&self) {
        self.callbacks.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    pub fn dispatch_event(&self, event: CallbackEvent) {
        // Listeners run without the list lock so they may add or clear callbacks
        let callbacks = self.callbacks.lock().clone();
        for callback in callbacks.iter() {
            callback.dispatch(event.clone());
        }
    }
}

impl Default for CallbackManager {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CALLBACK_THROTTLE_MS)
    }
}

/// Records every event; handy for tests and diagnostics
#[derive(Default)]
pub struct RecordingCallback {
    events: Mutex<Vec<CallbackEvent>>,
}

impl RecordingCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CallbackEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl PlayerCallback for RecordingCallback {
    fn on_event(&self, event: CallbackEvent) {
        self.events.lock().push(event);
    }
}
