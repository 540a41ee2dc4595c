//! GitHub REST payloads, reduced to the fields ecoscout reads.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use ecoscout_shared::{Contributor, RepositorySummary};

/// Body of `GET /search/repositories`.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub items: Vec<RepoItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoItem {
    pub full_name: String,
    pub html_url: String,
    pub stargazers_count: u64,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub language: Option<String>,
}

impl From<RepoItem> for RepositorySummary {
    fn from(item: RepoItem) -> Self {
        Self {
            full_name: item.full_name,
            url: item.html_url,
            stars: item.stargazers_count,
            description: item.description,
            updated_at: item.updated_at,
            language: item.language,
        }
    }
}

/// One element of `GET /repos/{owner}/{repo}/contributors`.
#[derive(Debug, Deserialize)]
pub(crate) struct ContributorItem {
    pub login: String,
    pub contributions: u64,
}

impl From<ContributorItem> for Contributor {
    fn from(item: ContributorItem) -> Self {
        Self {
            username: item.login,
            contributions: item.contributions,
        }
    }
}
