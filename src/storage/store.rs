//! The query capability the recommendation engine consumes.

use std::{
    collections::BTreeSet,
    sync::{Arc, Mutex},
};

use anyhow::anyhow;

use crate::{domain::track::Track, storage::error::StorageError};

pub trait TrackStore {
    /// Returns up to `limit` active tracks whose mood ids share at least one
    /// tag with `tags`. The order of the returned tracks is unspecified.
    fn query_active_tracks_by_mood_tags(
        &self,
        tags: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<Track>, StorageError>;
}

impl<S: TrackStore + ?Sized> TrackStore for Arc<S> {
    fn query_active_tracks_by_mood_tags(
        &self,
        tags: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<Track>, StorageError> {
        (**self).query_active_tracks_by_mood_tags(tags, limit)
    }
}

impl<S: TrackStore> TrackStore for Mutex<S> {
    fn query_active_tracks_by_mood_tags(
        &self,
        tags: &BTreeSet<String>,
        limit: usize,
    ) -> Result<Vec<Track>, StorageError> {
        let store = self.lock().map_err(|e| {
            StorageError::Internal(anyhow!("Could not access track store under lock: {e}"))
        })?;
        store.query_active_tracks_by_mood_tags(tags, limit)
    }
}
