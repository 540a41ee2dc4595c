//! Research pipeline: topic → search → enrich → plan → done.
//!
//! The topology never branches. Every stage runs exactly once per run and
//! failures travel forward as data on the [`ResearchContext`], so a run always
//! ends with a plan.

use std::time::Instant;

use tracing::{info, instrument};

use ecoscout_github::GithubClient;
use ecoscout_llm::TextModel;
use ecoscout_shared::{ResearchConfig, Result, Topic};

use crate::context::{ResearchContext, Stage};
use crate::enrichment::{self, EnrichmentProgress};
use crate::search;
use crate::synthesis;

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a stage runs.
    fn stage_started(&self, stage: Stage);
    /// Called once per repository during enrichment.
    fn repository_enriched(&self, full_name: &str, current: usize, total: usize);
    /// Called after a stage has recorded its result on the context.
    fn stage_finished(&self, stage: Stage, ctx: &ResearchContext);
    /// Called when the run reaches `Done`.
    fn done(&self, ctx: &ResearchContext);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn repository_enriched(&self, _full_name: &str, _current: usize, _total: usize) {}
    fn stage_finished(&self, _stage: Stage, _ctx: &ResearchContext) {}
    fn done(&self, _ctx: &ResearchContext) {}
}

/// The three-stage research pipeline.
///
/// Holds only collaborators and bounds; each [`run`](Self::run) owns its own
/// context, so concurrent runs on one pipeline never share state.
pub struct ResearchPipeline<M> {
    github: GithubClient,
    model: M,
    config: ResearchConfig,
}

impl<M: TextModel> ResearchPipeline<M> {
    /// Fails with a validation error when `config` bounds are out of range.
    pub fn new(github: GithubClient, model: M, config: ResearchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            github,
            model,
            config,
        })
    }

    pub fn config(&self) -> &ResearchConfig {
        &self.config
    }

    /// Run the pipeline for `topic` to completion and return the final context.
    #[instrument(skip_all, fields(topic = %topic))]
    pub async fn run(&self, topic: Topic, progress: &dyn ProgressReporter) -> ResearchContext {
        let start = Instant::now();
        let mut ctx = ResearchContext::new(topic);

        info!(run_id = %ctx.run_id(), "starting research run");

        while !ctx.is_done() {
            let stage = ctx.stage();
            progress.stage_started(stage);
            self.step(&mut ctx, progress).await;
            progress.stage_finished(stage, &ctx);
        }

        progress.done(&ctx);

        info!(
            run_id = %ctx.run_id(),
            repositories = ctx.repositories().len(),
            enriched = ctx.enriched_repositories().len(),
            plan_source = ?ctx.plan_source(),
            error = ctx.error().unwrap_or("none"),
            elapsed_ms = start.elapsed().as_millis(),
            "research run complete"
        );

        ctx
    }

    /// Execute the stage the context is waiting on and record its result.
    async fn step(&self, ctx: &mut ResearchContext, progress: &dyn ProgressReporter) {
        match ctx.stage() {
            Stage::Search => {
                let outcome =
                    search::search(&self.github, ctx.topic(), self.config.max_results).await;
                ctx.record_search(outcome);
            }
            Stage::Enrich => {
                let enrich_progress = PipelineEnrichmentProgress { inner: progress };
                let outcome = enrichment::enrich(
                    &self.github,
                    ctx.repositories(),
                    ctx.error(),
                    &self.config,
                    &enrich_progress,
                )
                .await;
                ctx.record_enrichment(outcome);
            }
            Stage::Plan => {
                let synthesis = synthesis::synthesize(
                    &self.model,
                    ctx.topic(),
                    ctx.enriched_repositories(),
                    ctx.error(),
                )
                .await;
                ctx.record_plan(synthesis);
            }
            Stage::Done => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Enrichment progress adapter
// ---------------------------------------------------------------------------

/// Adapts a `ProgressReporter` to the `EnrichmentProgress` interface.
struct PipelineEnrichmentProgress<'a> {
    inner: &'a dyn ProgressReporter,
}

impl EnrichmentProgress for PipelineEnrichmentProgress<'_> {
    fn repository_enriched(&self, full_name: &str, current: usize, total: usize) {
        self.inner.repository_enriched(full_name, current, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ecoscout_github::GithubOptions;
    use ecoscout_llm::{Completion, CompletionRequest};
    use ecoscout_shared::EcoscoutError;
    use url::Url;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::context::PlanSource;

    struct FixedModel;

    impl TextModel for FixedModel {
        async fn complete(&self, _request: &CompletionRequest) -> Result<Completion> {
            Ok(Completion {
                text: "# Plan".into(),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct TransitionLog {
        events: Mutex<Vec<String>>,
    }

    impl ProgressReporter for TransitionLog {
        fn stage_started(&self, stage: Stage) {
            self.events.lock().unwrap().push(format!("start:{stage}"));
        }
        fn repository_enriched(&self, full_name: &str, _current: usize, _total: usize) {
            self.events.lock().unwrap().push(format!("repo:{full_name}"));
        }
        fn stage_finished(&self, stage: Stage, ctx: &ResearchContext) {
            self.events
                .lock()
                .unwrap()
                .push(format!("finish:{stage}->{}", ctx.stage()));
        }
        fn done(&self, _ctx: &ResearchContext) {
            self.events.lock().unwrap().push("done".into());
        }
    }

    #[tokio::test]
    async fn every_stage_runs_once_even_after_search_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(502))
            .expect(1)
            .mount(&server)
            .await;

        let github =
            GithubClient::new(&GithubOptions::new(Url::parse(&server.uri()).unwrap())).unwrap();
        let pipeline = ResearchPipeline::new(github, FixedModel, ResearchConfig::default()).unwrap();
        let log = TransitionLog::default();

        let ctx = pipeline.run(Topic::new("anything").unwrap(), &log).await;

        assert!(ctx.is_done());
        assert_eq!(ctx.plan_source(), Some(PlanSource::Fallback));
        assert_eq!(
            *log.events.lock().unwrap(),
            [
                "start:search",
                "finish:search->enrich",
                "start:enrich",
                "finish:enrich->plan",
                "start:plan",
                "finish:plan->done",
                "done",
            ]
        );
    }

    #[tokio::test]
    async fn enrichment_progress_is_forwarded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "full_name": "acme/widgets",
                    "html_url": "https://github.com/acme/widgets",
                    "stargazers_count": 5,
                    "description": "Widgets",
                    "updated_at": "2024-01-01T00:00:00Z",
                    "language": "Rust"
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/widgets/contributors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let github =
            GithubClient::new(&GithubOptions::new(Url::parse(&server.uri()).unwrap())).unwrap();
        let pipeline = ResearchPipeline::new(github, FixedModel, ResearchConfig::default()).unwrap();
        let log = TransitionLog::default();

        let ctx = pipeline.run(Topic::new("widgets").unwrap(), &log).await;

        assert_eq!(ctx.plan(), "# Plan");
        assert!(log.events.lock().unwrap().contains(&"repo:acme/widgets".to_string()));
    }

    #[tokio::test]
    async fn out_of_range_bounds_are_rejected_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let github =
            GithubClient::new(&GithubOptions::new(Url::parse(&server.uri()).unwrap())).unwrap();
        let config = ResearchConfig {
            max_results: 0,
            ..ResearchConfig::default()
        };

        let err = ResearchPipeline::new(github, FixedModel, config)
            .err()
            .expect("zero max_results rejected");
        assert!(matches!(err, EcoscoutError::Validation { .. }));
        assert!(err.to_string().contains("max_results"));
    }
}
