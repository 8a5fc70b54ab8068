// Player configuration

use std::time::Duration;

pub const DEFAULT_PLAYER_NAME: &str = "mediaplay";
pub const DEFAULT_CALLBACK_THROTTLE_MS: u64 = 250;
pub const DEFAULT_CHAIN_POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    /// Tag used in log lines and worker thread names
    pub name: String,
    /// Minimum interval between position callbacks per listener
    pub callback_throttle_ms: u64,
    /// How often a chained load waiting on its predecessor checks for cancellation
    pub chain_poll_interval: Duration,
}

impl PlayerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_callback_throttle_ms(mut self, throttle_ms: u64) -> Self {
        self.callback_throttle_ms = throttle_ms;
        self
    }

    pub fn with_chain_poll_interval(mut self, interval: Duration) -> Self {
        self.chain_poll_interval = interval;
        self
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PLAYER_NAME.to_string(),
            callback_throttle_ms: DEFAULT_CALLBACK_THROTTLE_MS,
            chain_poll_interval: DEFAULT_CHAIN_POLL_INTERVAL,
        }
    }
}
