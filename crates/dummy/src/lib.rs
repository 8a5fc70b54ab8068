// In-process backend that drives the player without decoding anything

pub mod backend;
pub mod config;
pub mod metadata;

pub use backend::{DummyBackend, DummySession};
pub use config::DummyConfig;
pub use metadata::DummyMetadata;

use mediaplay_core::{MediaData, Player, PlayerConfig};

/// Player over the dummy engine
pub type DummyPlayer = Player<DummyBackend>;

/// Convenience constructor for previews and tests
pub fn dummy_player(config: DummyConfig) -> DummyPlayer {
    Player::new(DummyBackend::new(config), PlayerConfig::new("dummy"))
}

/// Payload shorthand: anything the dummy engine can play is a [`MediaData`]
pub fn uri(uri: &str) -> MediaData {
    MediaData::Uri(mediaplay_core::UriMediaData::new(uri))
}
