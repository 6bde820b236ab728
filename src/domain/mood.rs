use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Selection criteria for one mood: which tags pull a track into the
/// candidate pool and which feature ranges earn it the match bonus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodProfile {
    pub required_moods: BTreeSet<String>,
    #[serde(default)]
    pub audio_features: BTreeMap<String, FeatureRange>,
}

/// Inclusive numeric range, written as `[min, max]` in TOML and JSON.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct FeatureRange {
    pub min: f64,
    pub max: f64,
}

impl FeatureRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

impl From<[f64; 2]> for FeatureRange {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

impl From<FeatureRange> for [f64; 2] {
    fn from(range: FeatureRange) -> Self {
        [range.min, range.max]
    }
}
