//! Search stage: topic → bounded, star-sorted repository list.

use tracing::{info, instrument, warn};

use ecoscout_github::GithubClient;
use ecoscout_shared::{RepositorySummary, Topic};

use crate::context::StageOutcome;

/// Diagnostic recorded when the search succeeds but matches nothing.
pub fn no_results_message(topic: &Topic) -> String {
    format!(
        "No repositories found for topic '{topic}'. \
         Try broadening your search terms or checking the spelling."
    )
}

/// Run the search. Failures and empty results both come back as `Degraded`
/// with distinct diagnostic text.
#[instrument(skip_all, fields(topic = %topic, max_results = max_results))]
pub async fn search(
    github: &GithubClient,
    topic: &Topic,
    max_results: u32,
) -> StageOutcome<Vec<RepositorySummary>> {
    match github.search_repositories(topic, max_results).await {
        Ok(repositories) if repositories.is_empty() => {
            info!("search matched no repositories");
            StageOutcome::Degraded(no_results_message(topic))
        }
        Ok(repositories) => StageOutcome::Ready(repositories),
        Err(e) => {
            warn!(error = %e, "repository search failed");
            StageOutcome::Degraded(e.to_string())
        }
    }
}
