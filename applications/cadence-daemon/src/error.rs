/// Daemon error types
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DaemonError>;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("Invalid track: {0}")]
    Track(String),

    #[error("Playback error: {0}")]
    Playback(#[from] cadence_playback::PlaybackError),

    #[error("Library error: {0}")]
    Library(#[from] cadence_core::CadenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<cadence_storage::StorageError> for DaemonError {
    fn from(err: cadence_storage::StorageError) -> Self {
        // StorageError -> CadenceError -> DaemonError
        DaemonError::Library(err.into())
    }
}
