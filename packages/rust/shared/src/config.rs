//! Application configuration for ecoscout.
//!
//! User config lives at `~/.ecoscout/ecoscout.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets never live in the file: it only names the env vars holding them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{EcoscoutError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "ecoscout.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".ecoscout";

// ---------------------------------------------------------------------------
// Config structs (matching ecoscout.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// GitHub search and contributor settings.
    #[serde(default)]
    pub github: GithubConfig,

    /// Generative model settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[github]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    /// REST API root.
    #[serde(default = "default_github_api")]
    pub api_base_url: Url,

    /// Name of the env var holding an optional personal access token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Repositories requested from the search endpoint.
    #[serde(default = "default_max_results")]
    pub max_results: u32,

    /// Contributors kept per repository.
    #[serde(default = "default_max_contributors")]
    pub max_contributors: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_github_timeout")]
    pub timeout_secs: u64,

    /// Contributor fetches allowed in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_github_api(),
            token_env: default_token_env(),
            max_results: default_max_results(),
            max_contributors: default_max_contributors(),
            timeout_secs: default_github_timeout(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_github_api() -> Url {
    Url::parse("https://api.github.com").expect("static URL is valid")
}
fn default_token_env() -> String {
    "GITHUB_TOKEN".into()
}
fn default_max_results() -> u32 {
    5
}
fn default_max_contributors() -> u32 {
    3
}
fn default_github_timeout() -> u64 {
    10
}
fn default_concurrency() -> u32 {
    4
}

/// `[llm]` section. Any OpenAI-compatible chat-completions endpoint works
/// (OpenAI, OpenRouter, a local gateway).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// API root; `/chat/completions` is appended.
    #[serde(default = "default_llm_base")]
    pub base_url: Url,

    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with each request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Sampling temperature; provider default when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_llm_base(),
            api_key_env: default_api_key_env(),
            model: default_model(),
            timeout_secs: default_llm_timeout(),
            temperature: None,
        }
    }
}

fn default_llm_base() -> Url {
    Url::parse("https://api.openai.com/v1").expect("static URL is valid")
}
fn default_api_key_env() -> String {
    "OPENAI_API_KEY".into()
}
fn default_model() -> String {
    "gpt-4.1".into()
}
fn default_llm_timeout() -> u64 {
    120
}

// ---------------------------------------------------------------------------
// Research config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime bounds for one research run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchConfig {
    /// Maximum repositories taken from search.
    pub max_results: u32,
    /// Maximum contributors kept per repository.
    pub max_contributors: u32,
    /// Contributor fetches allowed in flight at once (1 = sequential).
    pub concurrency: u32,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ResearchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_results: config.github.max_results,
            max_contributors: config.github.max_contributors,
            concurrency: config.github.concurrency,
        }
    }
}

impl ResearchConfig {
    /// Reject bounds that would make a run meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_results == 0 || self.max_results > 100 {
            return Err(EcoscoutError::validation(format!(
                "max_results must be between 1 and 100 (got {})",
                self.max_results
            )));
        }
        if self.max_contributors == 0 || self.max_contributors > 100 {
            return Err(EcoscoutError::validation(format!(
                "max_contributors must be between 1 and 100 (got {})",
                self.max_contributors
            )));
        }
        if self.concurrency == 0 {
            return Err(EcoscoutError::validation("concurrency must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.ecoscout/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| EcoscoutError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.ecoscout/ecoscout.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| EcoscoutError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        EcoscoutError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| EcoscoutError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| EcoscoutError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| EcoscoutError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the configured env var.
pub fn validate_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(EcoscoutError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Read the optional GitHub token. Unset or blank means anonymous access.
pub fn github_token(config: &AppConfig) -> Option<String> {
    std::env::var(&config.github.token_env)
        .ok()
        .filter(|t| !t.trim().is_empty())
}
