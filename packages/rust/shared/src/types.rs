//! Core domain types for ecoscout research runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EcoscoutError, Result};

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper identifying one research run (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// A research topic. Always trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Topic(String);

impl Topic {
    /// Validate and wrap a topic string.
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(EcoscoutError::validation("research topic must not be empty"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Topic {
    type Err = EcoscoutError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

// ---------------------------------------------------------------------------
// Repository data
// ---------------------------------------------------------------------------

/// A repository as returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// `owner/name` identifier.
    pub full_name: String,
    /// Browser URL of the repository.
    pub url: String,
    pub stars: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Last update time reported by the host.
    pub updated_at: DateTime<Utc>,
    /// Primary language, if the host detected one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A repository contributor and their contribution count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub username: String,
    pub contributions: u64,
}

/// A repository summary merged with its top contributors.
///
/// Fields are read-only; the only way to build one is [`EnrichedRepository::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRepository {
    #[serde(flatten)]
    repository: RepositorySummary,
    top_contributors: Vec<Contributor>,
}

impl EnrichedRepository {
    /// Merge one summary with the contributor list fetched for it.
    pub fn new(repository: RepositorySummary, top_contributors: Vec<Contributor>) -> Self {
        Self {
            repository,
            top_contributors,
        }
    }

    pub fn repository(&self) -> &RepositorySummary {
        &self.repository
    }

    /// Contributors in the order the source returned them. May be empty.
    pub fn top_contributors(&self) -> &[Contributor] {
        &self.top_contributors
    }
}
