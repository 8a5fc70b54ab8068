// Optional engine capabilities, keyed by type
// The registry is built once at player construction and never changes afterwards

use crate::cell::{StateCell, Subscription};
use crate::error::UnsupportedFeature;
use crate::track::{AudioTrack, Chapter, SubtitleTrack, TrackGroup};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Typed key naming one capability
pub trait FeatureKey: 'static {
    type Feature: ?Sized + Send + Sync + 'static;

    const NAME: &'static str;
}

/// Immutable map from feature key to implementation
#[derive(Clone, Default)]
pub struct FeatureRegistry {
    features: Arc<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
    names: Arc<Vec<&'static str>>,
}

impl FeatureRegistry {
    pub fn builder() -> FeatureRegistryBuilder {
        FeatureRegistryBuilder::default()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get<K: FeatureKey>(&self) -> Option<Arc<K::Feature>> {
        self.features
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.downcast_ref::<Arc<K::Feature>>())
            .cloned()
    }

    pub fn get_or_fail<K: FeatureKey>(&self) -> Result<Arc<K::Feature>, UnsupportedFeature> {
        self.get::<K>()
            .ok_or(UnsupportedFeature { feature: K::NAME })
    }

    pub fn supports<K: FeatureKey>(&self) -> bool {
        self.features.contains_key(&TypeId::of::<K>())
    }

    /// Names of the registered features, in registration order
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl fmt::Debug for FeatureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names.iter()).finish()
    }
}

#[derive(Default)]
pub struct FeatureRegistryBuilder {
    features: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl FeatureRegistryBuilder {
    /// Register `feature` under `K`, replacing an earlier registration
    pub fn add<K: FeatureKey>(mut self, feature: Arc<K::Feature>) -> Self {
        if self
            .features
            .insert(TypeId::of::<K>(), Box::new(feature))
            .is_none()
        {
            self.names.push(K::NAME);
        }
        self
    }

    pub fn build(self) -> FeatureRegistry {
        FeatureRegistry {
            features: Arc::new(self.features),
            names: Arc::new(self.names),
        }
    }
}

// -----------------------------------------------------------------------------
// Playback speed
// -----------------------------------------------------------------------------

pub trait PlaybackSpeed: Send + Sync {
    /// Current speed, `1.0` is the original
    fn value(&self) -> f32;

    /// Stays in effect across media changes
    fn set(&self, speed: f32);

    fn subscribe(&self) -> Subscription<f32>;
}

pub struct PlaybackSpeedKey;

impl FeatureKey for PlaybackSpeedKey {
    type Feature = dyn PlaybackSpeed;
    const NAME: &'static str = "PlaybackSpeed";
}

/// Speed backed by a state cell; `on_change` forwards to the engine
pub struct StatefulPlaybackSpeed {
    value: StateCell<f32>,
    on_change: Box<dyn Fn(f32) + Send + Sync>,
}

impl StatefulPlaybackSpeed {
    pub fn new(on_change: impl Fn(f32) + Send + Sync + 'static) -> Self {
        Self {
            value: StateCell::new(1.0),
            on_change: Box::new(on_change),
        }
    }
}

impl PlaybackSpeed for StatefulPlaybackSpeed {
    fn value(&self) -> f32 {
        self.value.get()
    }

    fn set(&self, speed: f32) {
        if !(speed > 0.0) {
            log::warn!("[features] ignoring non-positive playback speed {}", speed);
            return;
        }
        (self.on_change)(speed);
        self.value.set(speed);
    }

    fn subscribe(&self) -> Subscription<f32> {
        self.value.subscribe()
    }
}

// -----------------------------------------------------------------------------
// Audio level
// -----------------------------------------------------------------------------

pub const DEFAULT_VOLUME_STEP: f32 = 0.05;

pub trait AudioLevelController: Send + Sync {
    /// In `0.0..=max_volume()`; `1.0` is the original level
    fn volume(&self) -> f32;

    /// Typically `1.0`, or `2.0` for engines that amplify
    fn max_volume(&self) -> f32;

    fn is_mute(&self) -> bool;

    fn set_mute(&self, mute: bool);

    /// Coerced into `0.0..=max_volume()`
    fn set_volume(&self, volume: f32);

    fn volume_up(&self, step: f32) {
        self.set_volume(self.volume() + step);
    }

    fn volume_down(&self, step: f32) {
        self.set_volume(self.volume() - step);
    }

    fn subscribe_volume(&self) -> Subscription<f32>;

    fn subscribe_mute(&self) -> Subscription<bool>;
}

pub struct AudioLevelKey;

impl FeatureKey for AudioLevelKey {
    type Feature = dyn AudioLevelController;
    const NAME: &'static str = "AudioLevelController";
}

pub struct StatefulAudioLevel {
    volume: StateCell<f32>,
    mute: StateCell<bool>,
    max_volume: f32,
    on_change: Box<dyn Fn(f32, bool) + Send + Sync>,
}

impl StatefulAudioLevel {
    /// `on_change` receives the effective volume and mute flag
    pub fn new(max_volume: f32, on_change: impl Fn(f32, bool) + Send + Sync + 'static) -> Self {
        Self {
            volume: StateCell::new(1.0f32.min(max_volume)),
            mute: StateCell::new(false),
            max_volume,
            on_change: Box::new(on_change),
        }
    }
}

impl AudioLevelController for StatefulAudioLevel {
    fn volume(&self) -> f32 {
        self.volume.get()
    }

    fn max_volume(&self) -> f32 {
        self.max_volume
    }

    fn is_mute(&self) -> bool {
        self.mute.get()
    }

    fn set_mute(&self, mute: bool) {
        (self.on_change)(self.volume.get(), mute);
        self.mute.set(mute);
    }

    fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, self.max_volume)
        };
        (self.on_change)(volume, self.mute.get());
        self.volume.set(volume);
    }

    fn subscribe_volume(&self) -> Subscription<f32> {
        self.volume.subscribe()
    }

    fn subscribe_mute(&self) -> Subscription<bool> {
        self.mute.subscribe()
    }
}

// -----------------------------------------------------------------------------
// Media metadata
// -----------------------------------------------------------------------------

pub trait MediaMetadata: Send + Sync {
    /// `None` when the engine cannot switch audio tracks
    fn audio_tracks(&self) -> Option<Arc<dyn TrackGroup<AudioTrack>>>;

    /// `None` when the engine has no subtitle support
    fn subtitle_tracks(&self) -> Option<Arc<dyn TrackGroup<SubtitleTrack>>>;

    fn chapters(&self) -> Option<Vec<Chapter>>;
}

pub struct MediaMetadataKey;

impl FeatureKey for MediaMetadataKey {
    type Feature = dyn MediaMetadata;
    const NAME: &'static str = "MediaMetadata";
}

// -----------------------------------------------------------------------------
// Screenshots
// -----------------------------------------------------------------------------

pub trait Screenshots: Send + Sync {
    /// Save the current frame to `destination`
    fn take_screenshot(&self, destination: &Path) -> std::io::Result<()>;
}

pub struct ScreenshotsKey;

impl FeatureKey for ScreenshotsKey {
    type Feature = dyn Screenshots;
    const NAME: &'static str = "Screenshots";
}

// -----------------------------------------------------------------------------
// Aspect ratio
// -----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AspectRatioMode {
    /// Scale to fit, keeping the ratio (may letterbox)
    #[default]
    Fit,
    /// Fill the container, ignoring the ratio
    Stretch,
    /// Fill the container, keeping the ratio (may crop)
    Crop,
}

pub trait VideoAspectRatio: Send + Sync {
    fn mode(&self) -> AspectRatioMode;

    fn set_mode(&self, mode: AspectRatioMode);

    fn subscribe(&self) -> Subscription<AspectRatioMode>;
}

pub struct VideoAspectRatioKey;

impl FeatureKey for VideoAspectRatioKey {
    type Feature = dyn VideoAspectRatio;
    const NAME: &'static str = "VideoAspectRatio";
}

#[derive(Default)]
pub struct StatefulAspectRatio {
    mode: StateCell<AspectRatioMode>,
}

impl StatefulAspectRatio {
    pub fn new() -> Self {
        Self {
            mode: StateCell::new(AspectRatioMode::Fit),
        }
    }
}

impl VideoAspectRatio for StatefulAspectRatio {
    fn mode(&self) -> AspectRatioMode {
        self.mode.get()
    }

    fn set_mode(&self, mode: AspectRatioMode) {
        self.mode.set(mode);
    }

    fn subscribe(&self) -> Subscription<AspectRatioMode> {
        self.mode.subscribe()
    }
}

// -----------------------------------------------------------------------------
// Buffering
// -----------------------------------------------------------------------------

pub trait Buffering: Send + Sync {
    fn is_buffering(&self) -> bool;

    /// `0..=100`
    fn buffered_percentage(&self) -> u8;

    fn subscribe_buffering(&self) -> Subscription<bool>;
}

pub struct BufferingKey;

impl FeatureKey for BufferingKey {
    type Feature = dyn Buffering;
    const NAME: &'static str = "Buffering";
}
