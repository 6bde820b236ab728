use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse taxonomy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("taxonomy defines no moods")]
    Empty,

    #[error("mood '{mood}' has no required moods")]
    NoRequiredMoods { mood: String },

    #[error("mood '{mood}' has invalid range [{min}, {max}] for feature '{feature}'")]
    InvalidRange {
        mood: String,
        feature: String,
        min: f64,
        max: f64,
    },
}
