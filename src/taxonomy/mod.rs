//! Mood taxonomy: the table that maps a mood id to its selection criteria.
//!
//! The table is plain data. It is loaded once (the built-in `moods.toml` or a
//! file named in the config) and then only read, so it can be shared between
//! threads behind an `Arc` without locking.

pub mod error;

use std::{collections::BTreeMap, path::Path};

use log::debug;

use crate::{domain::mood::MoodProfile, taxonomy::error::TaxonomyError};

const BUILTIN_TAXONOMY: &str = include_str!("../../moods.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Taxonomy {
    profiles: BTreeMap<String, MoodProfile>,
}

impl Taxonomy {
    /// Table shipped with the binary (`focus`, `workout`, `chill`).
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_toml_str(BUILTIN_TAXONOMY)
    }

    pub fn load(path: &Path) -> Result<Self, TaxonomyError> {
        let contents = std::fs::read_to_string(path).map_err(|source| TaxonomyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let taxonomy = Self::from_toml_str(&contents)?;
        debug!(
            "Loaded {} moods from {}",
            taxonomy.profiles.len(),
            path.to_string_lossy()
        );
        Ok(taxonomy)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, TaxonomyError> {
        let profiles: BTreeMap<String, MoodProfile> = toml::from_str(contents)?;
        Self::from_profiles(profiles)
    }

    /// Builds a table from already parsed profiles, validating each of them.
    pub fn from_profiles(profiles: BTreeMap<String, MoodProfile>) -> Result<Self, TaxonomyError> {
        if profiles.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        for (mood, profile) in &profiles {
            validate_profile(mood, profile)?;
        }

        Ok(Self { profiles })
    }

    pub fn get(&self, mood_id: &str) -> Option<&MoodProfile> {
        self.profiles.get(mood_id)
    }

    /// Iterates over profiles in mood id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MoodProfile)> {
        self.profiles
            .iter()
            .map(|(mood, profile)| (mood.as_str(), profile))
    }
}

fn validate_profile(mood: &str, profile: &MoodProfile) -> Result<(), TaxonomyError> {
    if profile.required_moods.is_empty() {
        return Err(TaxonomyError::NoRequiredMoods {
            mood: mood.to_string(),
        });
    }

    if let Some((feature, range)) = profile
        .audio_features
        .iter()
        .find(|(_, range)| !range.is_valid())
    {
        return Err(TaxonomyError::InvalidRange {
            mood: mood.to_string(),
            feature: feature.clone(),
            min: range.min,
            max: range.max,
        });
    }

    Ok(())
}
