use crate::{domain::playlist::Playlist, storage::error::StorageError};

/// Called with every playlist the engine hands out.
pub trait HistoryHook {
    fn record(&self, user_id: &str, mood_id: &str, playlist: &Playlist) -> Result<(), StorageError>;
}

/// Keeps no history.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHistory;

impl HistoryHook for NoopHistory {
    fn record(&self, _user_id: &str, _mood_id: &str, _playlist: &Playlist) -> Result<(), StorageError> {
        Ok(())
    }
}
