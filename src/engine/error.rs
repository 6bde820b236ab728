use thiserror::Error;

use crate::storage::error::StorageError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The caller asked for a mood the taxonomy does not define.
    #[error("unknown mood profile '{0}'")]
    InvalidMoodProfile(String),

    #[error(transparent)]
    Store(#[from] StorageError),
}
