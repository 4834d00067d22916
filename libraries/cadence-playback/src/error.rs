//! Error types for playback orchestration

use crate::collaborators::EngineError;
use thiserror::Error;

/// Playback errors
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// A transition was requested that the caller contract forbids
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// The audio engine failed; playback of the current track has stopped
    #[error("Audio engine failure: {0}")]
    EngineFailure(#[from] EngineError),

    /// Playback speed must be a finite positive multiplier
    #[error("Invalid playback speed: {0}")]
    InvalidSpeed(f32),

    /// The session has been torn down
    #[error("Playback session is shut down")]
    SessionClosed,
}

impl PlaybackError {
    pub(crate) fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
