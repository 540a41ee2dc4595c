//! The research context threaded through one pipeline run.
//!
//! The context tracks which stage it is waiting on. Each `record_*` method is
//! only valid in that stage and advances it, so every field is written once
//! and in order.

use serde::Serialize;

use ecoscout_shared::{EnrichedRepository, RepositorySummary, RunId, Topic};

use crate::synthesis::Synthesis;

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Pipeline states. Edges are unconditional: `Search → Enrich → Plan → Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Search,
    Enrich,
    Plan,
    Done,
}

impl Stage {
    /// The state that follows this one. `Done` is absorbing.
    pub fn next(self) -> Self {
        match self {
            Self::Search => Self::Enrich,
            Self::Enrich => Self::Plan,
            Self::Plan | Self::Done => Self::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Enrich => "enrich",
            Self::Plan => "plan",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// StageOutcome
// ---------------------------------------------------------------------------

/// What a data-producing stage hands to the context.
///
/// `Degraded` carries the diagnostic text that later stages read in place of
/// the missing payload.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Ready(T),
    Degraded(String),
}

impl<T> StageOutcome<T> {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// Where the final plan text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanSource {
    /// Generated by the text model from repository data.
    Model,
    /// The deterministic no-results document.
    Fallback,
}

// ---------------------------------------------------------------------------
// ResearchContext
// ---------------------------------------------------------------------------

/// Everything one run knows, owned by the orchestrator for the run's duration.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchContext {
    run_id: RunId,
    topic: Topic,
    repositories: Vec<RepositorySummary>,
    enriched_repositories: Vec<EnrichedRepository>,
    plan: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan_source: Option<PlanSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    stage: Stage,
}

impl ResearchContext {
    /// A fresh context waiting on `Search`.
    pub fn new(topic: Topic) -> Self {
        Self {
            run_id: RunId::new(),
            topic,
            repositories: Vec::new(),
            enriched_repositories: Vec::new(),
            plan: String::new(),
            plan_source: None,
            error: None,
            stage: Stage::Search,
        }
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// The stage that runs next; `Done` once the plan is recorded.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn repositories(&self) -> &[RepositorySummary] {
        &self.repositories
    }

    pub fn enriched_repositories(&self) -> &[EnrichedRepository] {
        &self.enriched_repositories
    }

    /// The final markdown plan. Empty until the plan stage has run.
    pub fn plan(&self) -> &str {
        &self.plan
    }

    pub fn plan_source(&self) -> Option<PlanSource> {
        self.plan_source
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    pub(crate) fn record_search(&mut self, outcome: StageOutcome<Vec<RepositorySummary>>) {
        self.expect_stage(Stage::Search);
        match outcome {
            StageOutcome::Ready(repositories) => self.repositories = repositories,
            StageOutcome::Degraded(reason) => self.error = Some(reason),
        }
        self.advance();
    }

    pub(crate) fn record_enrichment(&mut self, outcome: StageOutcome<Vec<EnrichedRepository>>) {
        self.expect_stage(Stage::Enrich);
        match outcome {
            StageOutcome::Ready(enriched) => {
                debug_assert_eq!(enriched.len(), self.repositories.len());
                self.enriched_repositories = enriched;
            }
            StageOutcome::Degraded(reason) => self.error = Some(reason),
        }
        self.advance();
    }

    pub(crate) fn record_plan(&mut self, synthesis: Synthesis) {
        self.expect_stage(Stage::Plan);
        self.plan = synthesis.plan;
        self.plan_source = Some(synthesis.source);
        if let Some(reason) = synthesis.error {
            self.error = Some(reason);
        }
        self.advance();
    }

    fn expect_stage(&self, stage: Stage) {
        debug_assert_eq!(
            self.stage, stage,
            "stage {stage} recorded while context is at {}",
            self.stage
        );
    }

    fn advance(&mut self) {
        self.stage = self.stage.next();
    }
}
