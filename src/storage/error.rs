use thiserror::Error;

use crate::domain::id::TrackId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("track {0} not found")]
    TrackNotFound(TrackId),

    #[error("track {id} is malformed: {reason}")]
    MalformedTrack { id: String, reason: String },

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
