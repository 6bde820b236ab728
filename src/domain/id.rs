use std::fmt::Display;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Represents the track ID.
///
/// Track ids are opaque strings assigned by the catalog the tracks come from.
/// The only requirement is that they are not blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackId(String);

impl TrackId {
    pub fn parse(id: &str) -> anyhow::Result<Self> {
        let trimmed = id.trim();
        if trimmed.is_empty() {
            bail!("track id must not be empty");
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TrackId {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackId> for String {
    fn from(id: TrackId) -> Self {
        id.0
    }
}

impl Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
