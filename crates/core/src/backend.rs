// Contract every engine adapter implements

use crate::error::{EngineError, OpenError};
use crate::events::EngineEvents;
use crate::features::FeatureRegistry;
use crate::resource::OpenedMedia;
use crate::task::CancellationToken;
use std::sync::Arc;

/// Engine adapter driven by [`crate::Player`].
///
/// The player calls each step only when the playback state allows it, and it
/// owns all state publication: adapters never set the playback state
/// themselves except through [`EngineEvents`].
pub trait Backend: Send + Sync + 'static {
    /// What callers ask the engine to play
    type Payload: Send + Sync + 'static;

    /// Engine handle for one opened payload
    type Resource: Send + 'static;

    /// Receive the sink for background events. Called once, at construction.
    fn attach(&self, events: EngineEvents) {
        let _ = events;
    }

    /// Optional capabilities; queried once, at construction
    fn features(&self) -> FeatureRegistry {
        FeatureRegistry::empty()
    }

    /// Resolve `payload` into something the engine can play.
    ///
    /// May block for as long as the engine needs. Implementations should
    /// check `cancel` while waiting and free anything partially acquired
    /// before returning [`OpenError::Cancelled`].
    fn open(
        &self,
        payload: &Arc<Self::Payload>,
        cancel: &CancellationToken,
    ) -> Result<OpenedMedia<Self::Resource>, OpenError>;

    /// Start or resume driving `resource`
    fn start(&self, resource: &Self::Resource) -> Result<(), EngineError>;

    fn pause(&self) -> Result<(), EngineError>;

    /// Stop driving the current resource; it is released right after
    fn stop(&self);

    fn seek_to(&self, position_ms: u64);

    /// Tear the engine down for good
    fn close_engine(&self);

    fn current_position_millis(&self) -> u64;
}
