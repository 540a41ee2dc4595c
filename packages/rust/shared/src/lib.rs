//! Shared types, error model, and configuration for ecoscout.
//!
//! This crate is the foundation depended on by all other ecoscout crates.
//! It provides:
//! - [`EcoscoutError`] — the unified error type
//! - Domain types ([`Topic`], [`RepositorySummary`], [`Contributor`], [`EnrichedRepository`], [`RunId`])
//! - Configuration ([`AppConfig`], [`ResearchConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GithubConfig, LlmConfig, ResearchConfig, config_dir, config_file_path,
    github_token, init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{EcoscoutError, Result};
pub use types::{Contributor, EnrichedRepository, RepositorySummary, RunId, Topic};
