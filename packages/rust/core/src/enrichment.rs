//! Contributor enrichment stage.
//!
//! Fetches the top contributors of every repository and merges them into
//! [`EnrichedRepository`] records. Fetches fan out behind a semaphore; a
//! failed fetch leaves that repository with no contributors and never touches
//! the others or the context error.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use ecoscout_github::GithubClient;
use ecoscout_shared::{
    Contributor, EcoscoutError, EnrichedRepository, RepositorySummary, ResearchConfig, Result,
};

use crate::context::StageOutcome;

/// Diagnostic used when enrichment gets no input and nothing explains why.
pub const NO_REPOSITORIES: &str = "No repositories available for processing.";

/// Enrich `repositories` in order.
///
/// With no input this performs no network activity and returns `Degraded`,
/// carrying `carried_error` forward when the search stage set one.
#[instrument(skip_all, fields(repos = repositories.len(), concurrency = config.concurrency))]
pub async fn enrich(
    github: &GithubClient,
    repositories: &[RepositorySummary],
    carried_error: Option<&str>,
    config: &ResearchConfig,
    progress: &dyn EnrichmentProgress,
) -> StageOutcome<Vec<EnrichedRepository>> {
    if repositories.is_empty() {
        info!("no repositories to enrich, skipping contributor fetches");
        let reason = carried_error.unwrap_or(NO_REPOSITORIES);
        return StageOutcome::Degraded(reason.to_string());
    }

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1) as usize));
    let mut handles = Vec::with_capacity(repositories.len());

    for repo in repositories {
        let client = github.clone();
        let sem = semaphore.clone();
        let full_name = repo.full_name.clone();
        let max_contributors = config.max_contributors;

        handles.push(tokio::spawn(async move {
            fetch_contributors(&client, &sem, &full_name, max_contributors).await
        }));
    }

    // Handles are awaited in input order, so output order matches input order
    // whatever order the fetches finish in.
    let total = repositories.len();
    let mut enriched = Vec::with_capacity(total);
    let mut degraded = 0usize;

    for (i, (repo, handle)) in repositories.iter().zip(handles).enumerate() {
        let contributors = match handle.await {
            Ok(Ok(contributors)) => {
                debug!(repo = %repo.full_name, count = contributors.len(), "contributors fetched");
                contributors
            }
            Ok(Err(e)) => {
                warn!(repo = %repo.full_name, error = %e, "could not fetch contributors, continuing without them");
                degraded += 1;
                Vec::new()
            }
            Err(e) => {
                warn!(repo = %repo.full_name, error = %e, "contributor fetch task failed, continuing without them");
                degraded += 1;
                Vec::new()
            }
        };

        progress.repository_enriched(&repo.full_name, i + 1, total);
        enriched.push(EnrichedRepository::new(repo.clone(), contributors));
    }

    info!(
        enriched = enriched.len(),
        without_contributors = degraded,
        "enrichment complete"
    );

    StageOutcome::Ready(enriched)
}

/// Wait for a slot on `sem`, then fetch. A closed semaphore fails this
/// repository only.
async fn fetch_contributors(
    client: &GithubClient,
    sem: &Semaphore,
    full_name: &str,
    max_contributors: u32,
) -> Result<Vec<Contributor>> {
    let _permit = sem.acquire().await.map_err(|e| {
        EcoscoutError::Network(format!("{full_name}: no fetch slot available: {e}"))
    })?;
    client.top_contributors(full_name, max_contributors).await
}

// ---------------------------------------------------------------------------
// Progress trait
// ---------------------------------------------------------------------------

/// Progress callback for enrichment.
pub trait EnrichmentProgress: Send + Sync {
    /// Called once per repository, in input order.
    fn repository_enriched(&self, full_name: &str, current: usize, total: usize);
}

/// No-op enrichment progress.
pub struct SilentEnrichmentProgress;

impl EnrichmentProgress for SilentEnrichmentProgress {
    fn repository_enriched(&self, _full_name: &str, _current: usize, _total: usize) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
