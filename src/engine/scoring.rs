//! Candidate scoring.
//!
//! A score is the sum of two parts:
//!
//! ```text
//! score(track) = match_bonus * [all present profile features in range]
//!              + popularity_weight * play_count
//! ```
//!
//! Features the track has no value for are skipped, so missing data never
//! costs a track its bonus. One present, out-of-range feature withholds the
//! whole bonus.

use crate::{
    config::EngineConfig,
    domain::{mood::MoodProfile, track::Track},
};

/// Scores one candidate against the requested mood.
///
/// Implementations must return a finite, non-negative score and must not
/// decrease it when the play count grows.
pub trait Scorer {
    fn score(&self, profile: &MoodProfile, track: &Track) -> f64;
}

/// Flat match bonus plus a linear popularity boost.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedScorer {
    pub match_bonus: f64,
    pub popularity_weight: f64,
}

impl WeightedScorer {
    pub fn new(match_bonus: f64, popularity_weight: f64) -> Self {
        Self {
            match_bonus,
            popularity_weight,
        }
    }

    pub fn match_bonus(&self, profile: &MoodProfile, track: &Track) -> f64 {
        if features_match(profile, track) {
            self.match_bonus
        } else {
            0.0
        }
    }

    pub fn popularity_boost(&self, track: &Track) -> f64 {
        track.play_count() as f64 * self.popularity_weight
    }
}

impl Default for WeightedScorer {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for WeightedScorer {
    fn from(config: &EngineConfig) -> Self {
        Self::new(config.match_bonus, config.popularity_weight)
    }
}

impl Scorer for WeightedScorer {
    fn score(&self, profile: &MoodProfile, track: &Track) -> f64 {
        self.match_bonus(profile, track) + self.popularity_boost(track)
    }
}

/// True when every profile feature the track has a value for lies inside
/// the profile's range.
pub fn features_match(profile: &MoodProfile, track: &Track) -> bool {
    profile
        .audio_features
        .iter()
        .all(|(feature, range)| match track.feature(feature) {
            Some(value) => range.contains(value),
            None => true,
        })
}
