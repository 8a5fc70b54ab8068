// Error taxonomy for the playback core

use std::fmt;

/// Why a backend refused to open a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    /// Nothing matching the payload description could be found
    NoMatchingFile,

    /// The payload is fine, but this engine cannot play it
    UnsupportedSource,

    /// The engine that would serve the payload has been shut down
    EngineDisabled,
}

impl fmt::Display for OpenFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OpenFailure::NoMatchingFile => write!(f, "no matching file"),
            OpenFailure::UnsupportedSource => write!(f, "unsupported source"),
            OpenFailure::EngineDisabled => write!(f, "engine disabled"),
        }
    }
}

/// Failure of the backend "open" step.
///
/// This is the only error ever returned from a player command.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OpenError {
    #[error("failed to open media ({reason}): {message}")]
    Failed { reason: OpenFailure, message: String },

    #[error("IO error while opening media: {0}")]
    Io(String),

    /// The open observed cancellation and gave up
    #[error("open cancelled")]
    Cancelled,
}

impl OpenError {
    pub fn failed(reason: OpenFailure, message: impl Into<String>) -> Self {
        OpenError::Failed {
            reason,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, OpenError::Cancelled)
    }
}

impl From<std::io::Error> for OpenError {
    fn from(err: std::io::Error) -> Self {
        OpenError::Io(err.to_string())
    }
}

/// Background failure raised by the engine while playing.
/// Only ever observed through the state stream and callbacks.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("decoder error: {0}")]
    Decoder(String),

    #[error("playback error: {0}")]
    Playback(String),

    #[error("device error: {0}")]
    Device(String),
}

/// Lookup miss on [`crate::features::FeatureRegistry::get_or_fail`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("feature {feature} is not supported")]
pub struct UnsupportedFeature {
    pub feature: &'static str,
}

/// Umbrella error for callers that handle every failure kind in one place
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayerError {
    #[error(transparent)]
    Open(#[from] OpenError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    UnsupportedFeature(#[from] UnsupportedFeature),
}

/// Result type alias for player operations
pub type Result<T> = std::result::Result<T, PlayerError>;
