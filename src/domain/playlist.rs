use serde::{Deserialize, Serialize};

use super::track::Track;

/// A track together with the score it earned for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTrack {
    pub track: Track,
    pub score: f64,
}

/// Ranked engine output, best first.
pub type Playlist = Vec<ScoredTrack>;
