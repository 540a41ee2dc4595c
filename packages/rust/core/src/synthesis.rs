//! Plan synthesis stage: enriched repositories → markdown exploration plan.
//!
//! With repository data the plan is whatever the text model returns. Without
//! it, or when the model call fails, a fixed fallback document explains what
//! went wrong.

use chrono::SecondsFormat;
use tracing::{info, instrument, warn};

use ecoscout_llm::{CompletionRequest, TextModel};
use ecoscout_shared::{EnrichedRepository, Topic};

use crate::context::PlanSource;

/// System role for the model.
pub const SYSTEM_PROMPT: &str =
    "You are a technical research assistant helping users explore GitHub projects.";

/// Summary text used when no stage recorded an error.
pub const NO_DATA_MESSAGE: &str = "No repository data available for plan generation.";

/// Recommendations listed in every fallback plan.
pub const RECOMMENDATIONS: [&str; 4] = [
    "Try using different search terms",
    "Check if the topic name is spelled correctly",
    "Consider broader or more specific keywords",
    "Verify the topic exists in the GitHub ecosystem",
];

/// Output of the plan stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub plan: String,
    pub source: PlanSource,
    /// Set when the stage itself failed (model error).
    pub error: Option<String>,
}

/// Render each repository as a numbered markdown block, in order.
pub fn format_repository_blocks(enriched: &[EnrichedRepository]) -> String {
    let mut out = String::new();

    for (i, entry) in enriched.iter().enumerate() {
        let repo = entry.repository();
        let contributors = if entry.top_contributors().is_empty() {
            "none listed".to_string()
        } else {
            entry
                .top_contributors()
                .iter()
                .map(|c| c.username.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        };

        out.push_str(&format!(
            "### {n}. {name}\n\
             - Stars: {stars}\n\
             - Description: {description}\n\
             - Last Updated: {updated}\n\
             - Top Contributors: {contributors}\n\
             - URL: {url}\n\n",
            n = i + 1,
            name = repo.full_name,
            stars = repo.stars,
            description = repo.description.as_deref().unwrap_or("No description provided"),
            updated = repo.updated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            url = repo.url,
        ));
    }

    out
}

/// Build the model prompt for `topic` over `enriched`.
pub fn build_prompt(topic: &Topic, enriched: &[EnrichedRepository]) -> CompletionRequest {
    let summaries = format_repository_blocks(enriched);
    let user = format!(
        "Given the topic: **{topic}** and the following repository metadata:\n\n\
         {summaries}\
         Generate a clear, step-by-step exploration plan in Markdown format.\n\
         Each step should recommend specific actions like reading docs, comparing features, \
         or exploring contributors."
    );

    CompletionRequest {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// The deterministic plan produced when there is nothing to synthesize from.
pub fn fallback_plan(topic: &Topic, error: Option<&str>) -> String {
    let summary = error.unwrap_or(NO_DATA_MESSAGE);
    let recommendations: String = RECOMMENDATIONS
        .iter()
        .map(|r| format!("- {r}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "# Research Plan for: {topic}\n\n\
         ## Summary\n\n\
         {summary}\n\n\
         ## Recommendations\n\n\
         {recommendations}"
    )
}

/// Produce the plan. Calls `model` once when `enriched` is non-empty and
/// never otherwise. Never fails: a model error becomes a fallback plan whose
/// summary explains it.
#[instrument(skip_all, fields(topic = %topic, repos = enriched.len()))]
pub async fn synthesize<M: TextModel>(
    model: &M,
    topic: &Topic,
    enriched: &[EnrichedRepository],
    error: Option<&str>,
) -> Synthesis {
    if enriched.is_empty() {
        info!("no repository data, writing fallback plan");
        return Synthesis {
            plan: fallback_plan(topic, error),
            source: PlanSource::Fallback,
            error: None,
        };
    }

    let request = build_prompt(topic, enriched);

    match model.complete(&request).await {
        Ok(completion) => {
            info!(
                model = %completion.model,
                tokens_in = completion.tokens_in,
                tokens_out = completion.tokens_out,
                "plan generated"
            );
            Synthesis {
                plan: completion.text,
                source: PlanSource::Model,
                error: None,
            }
        }
        Err(e) => {
            warn!(error = %e, "plan generation failed, writing fallback plan");
            let reason = format!("Plan generation failed: {e}");
            Synthesis {
                plan: fallback_plan(topic, Some(&reason)),
                source: PlanSource::Fallback,
                error: Some(reason),
            }
        }
    }
}
