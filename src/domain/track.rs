use std::{
    collections::{BTreeMap, BTreeSet},
    str::FromStr,
};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use super::id::TrackId;

/// Represent a music track as the catalog stores it.
///
/// Everything except `id` and `status` may be missing in catalog documents,
/// so the optional parts stay optional here and the defaults live in the
/// accessor methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: TrackId,
    #[serde(default)]
    pub mood_ids: BTreeSet<String>,
    pub status: TrackStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub music_profile: Option<MusicProfile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<TrackStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicProfile {
    #[serde(default)]
    pub typical_features: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_count: Option<u64>,
}

/// Lifecycle flag of a track. Only active tracks are recommended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Active,
    Inactive,
    Pending,
    Removed,
}

impl TrackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackStatus::Active => "active",
            TrackStatus::Inactive => "inactive",
            TrackStatus::Pending => "pending",
            TrackStatus::Removed => "removed",
        }
    }
}

impl FromStr for TrackStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TrackStatus::Active),
            "inactive" => Ok(TrackStatus::Inactive),
            "pending" => Ok(TrackStatus::Pending),
            "removed" => Ok(TrackStatus::Removed),
            other => Err(anyhow!("unknown track status '{other}'")),
        }
    }
}

impl Track {
    /// Creates an active track with no tags, features or stats.
    pub fn new(id: TrackId) -> Self {
        Self {
            id,
            mood_ids: BTreeSet::new(),
            status: TrackStatus::Active,
            music_profile: None,
            stats: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == TrackStatus::Active
    }

    /// Play count, 0 when the track has no stats or no recorded count.
    pub fn play_count(&self) -> u64 {
        match &self.stats {
            Some(TrackStats {
                play_count: Some(count),
            }) => *count,
            Some(TrackStats { play_count: None }) | None => 0,
        }
    }

    /// Value of a typical audio feature, `None` when the track has no
    /// music profile or the profile lacks that feature.
    pub fn feature(&self, name: &str) -> Option<f64> {
        self.music_profile
            .as_ref()
            .and_then(|profile| profile.typical_features.get(name))
            .copied()
    }

    pub fn has_any_mood(&self, tags: &BTreeSet<String>) -> bool {
        self.mood_ids.iter().any(|mood| tags.contains(mood))
    }

    pub fn with_moods<I, S>(mut self, moods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mood_ids = moods.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_feature(mut self, name: &str, value: f64) -> Self {
        self.music_profile
            .get_or_insert_with(MusicProfile::default)
            .typical_features
            .insert(name.to_string(), value);
        self
    }

    pub fn with_play_count(mut self, count: u64) -> Self {
        self.stats
            .get_or_insert_with(TrackStats::default)
            .play_count = Some(count);
        self
    }

    pub fn with_status(mut self, status: TrackStatus) -> Self {
        self.status = status;
        self
    }
}
