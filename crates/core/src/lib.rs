// Core types and traits for the mediaplay playback core

pub mod backend;
pub mod callback;
pub mod cell;
pub mod config;
pub mod error;
pub mod events;
pub mod features;
pub mod logging;
pub mod media;
pub mod player;
pub mod resource;
pub mod state;
pub mod swap;
pub mod task;
pub mod track;

// Re-export commonly used types
pub use backend::Backend;
pub use callback::{CallbackEvent, CallbackManager, PlayerCallback};
pub use cell::{StateCell, Subscription};
pub use config::PlayerConfig;
pub use error::{EngineError, OpenError, OpenFailure, PlayerError, Result, UnsupportedFeature};
pub use events::EngineEvents;
pub use features::{FeatureKey, FeatureRegistry};
pub use logging::init_logging;
pub use media::{MediaData, MediaExtraFiles, MediaProperties, UriMediaData};
pub use player::Player;
pub use resource::{MediaResource, OpenedMedia, ResourceSlot};
pub use state::{is_valid_transition, Command, PlaybackState};
pub use swap::{MediaSwapCoordinator, SwapOutcome, SwapTarget};
pub use task::{sleep_unless_cancelled, CancellationToken, MonoTasker, TaskHandle, TaskOutcome};
pub use track::{AudioTrack, Chapter, EmptyTrackGroup, MutableTrackGroup, SubtitleTrack, TrackGroup};
