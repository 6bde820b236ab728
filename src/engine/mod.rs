//! Mood playlist recommendation engine.
//!
//! `generate` resolves the mood in the taxonomy, pulls a bounded candidate
//! pool from the injected [`TrackStore`], scores every candidate, ranks them
//! (score descending, track id ascending on ties) and keeps the best
//! `playlist_limit` tracks.
//!
//! The engine only reads: its taxonomy is immutable and the store is behind a
//! shared reference, so one engine can serve concurrent requests.

pub mod error;
pub mod history;
pub mod scoring;

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    config::EngineConfig,
    domain::playlist::{Playlist, ScoredTrack},
    engine::{
        error::EngineError,
        history::{HistoryHook, NoopHistory},
        scoring::{Scorer, WeightedScorer},
    },
    storage::store::TrackStore,
    taxonomy::Taxonomy,
};

pub struct RecommendationEngine<S> {
    store: S,
    taxonomy: Arc<Taxonomy>,
    config: EngineConfig,
    scorer: Box<dyn Scorer + Send + Sync>,
    history: Box<dyn HistoryHook + Send + Sync>,
}

impl<S: TrackStore> RecommendationEngine<S> {
    /// Engine with the weighted scorer built from `config` and no history.
    pub fn new(store: S, taxonomy: Arc<Taxonomy>, config: EngineConfig) -> Self {
        Self {
            store,
            taxonomy,
            scorer: Box::new(WeightedScorer::from(&config)),
            history: Box::new(NoopHistory),
            config,
        }
    }

    pub fn with_scorer(mut self, scorer: impl Scorer + Send + Sync + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn with_history(mut self, history: impl HistoryHook + Send + Sync + 'static) -> Self {
        self.history = Box::new(history);
        self
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    /// Builds the playlist for `mood_id`.
    ///
    /// `user_id` is not used for ranking yet; it is passed on to the history
    /// hook.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidMoodProfile`] when the taxonomy has no such
    ///   mood. The store is not queried in that case.
    /// - [`EngineError::Store`] when retrieval or the history hook fails.
    pub fn generate(&self, user_id: &str, mood_id: &str) -> Result<Playlist, EngineError> {
        let Some(profile) = self.taxonomy.get(mood_id) else {
            warn!("Playlist requested for unknown mood '{mood_id}'");
            return Err(EngineError::InvalidMoodProfile(mood_id.to_string()));
        };

        let candidates = self
            .store
            .query_active_tracks_by_mood_tags(&profile.required_moods, self.config.candidate_limit)
            .map_err(|e| {
                error!("Candidate retrieval for mood '{mood_id}' failed: {e}");
                e
            })?;
        debug!(
            "Retrieved {} candidates for mood '{mood_id}'",
            candidates.len()
        );

        let playlist = if candidates.is_empty() {
            info!("No active tracks for mood '{mood_id}'");
            Playlist::new()
        } else {
            let scored = candidates
                .into_iter()
                .map(|track| {
                    let score = self.scorer.score(profile, &track);
                    ScoredTrack { track, score }
                })
                .collect::<Vec<_>>();
            rank(scored, self.config.playlist_limit)
        };

        self.history
            .record(user_id, mood_id, &playlist)
            .map_err(|e| {
                error!("Saving playlist history for user '{user_id}' failed: {e}");
                e
            })?;

        info!(
            "Generated {} track playlist for mood '{mood_id}'",
            playlist.len()
        );
        Ok(playlist)
    }
}

/// Sorts by score descending, breaking exact ties by track id ascending,
/// and keeps the first `limit` entries.
pub fn rank(mut scored: Vec<ScoredTrack>, limit: usize) -> Playlist {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.track.id.cmp(&b.track.id))
    });
    scored.truncate(limit);
    scored
}
