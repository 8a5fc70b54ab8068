// Dummy engine configuration

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct DummyConfig {
    /// Simulated time to open a payload
    pub open_delay: Duration,
    /// URIs whose open fails with "no matching file"
    pub failing_uris: Vec<String>,
    pub max_volume: f32,
    /// Duration reported for every payload; `None` behaves like a live stream
    pub duration_millis: Option<u64>,
    /// Simulated time for the engine to switch subtitle tracks
    pub subtitle_switch_delay: Duration,
}

impl DummyConfig {
    pub fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn with_failing_uri(mut self, uri: impl Into<String>) -> Self {
        self.failing_uris.push(uri.into());
        self
    }

    pub fn with_duration_millis(mut self, duration: Option<u64>) -> Self {
        self.duration_millis = duration;
        self
    }

    pub(crate) fn fails(&self, uri: &str) -> bool {
        self.failing_uris.iter().any(|failing| failing == uri)
    }
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            open_delay: Duration::ZERO,
            failing_uris: Vec::new(),
            max_volume: 1.0,
            duration_millis: Some(100_000),
            subtitle_switch_delay: Duration::from_millis(10),
        }
    }
}
