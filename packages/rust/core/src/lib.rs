//! Core research pipeline for ecoscout.
//!
//! This crate ties together repository search, contributor enrichment, and
//! plan synthesis into one end-to-end run (`ResearchPipeline::run`).

pub mod context;
pub mod enrichment;
pub mod pipeline;
pub mod search;
pub mod synthesis;

pub use context::{PlanSource, ResearchContext, Stage, StageOutcome};
pub use pipeline::{ProgressReporter, ResearchPipeline, SilentProgress};
