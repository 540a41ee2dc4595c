//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use ecoscout_core::{PlanSource, ProgressReporter, ResearchContext, ResearchPipeline, Stage};
use ecoscout_github::{GithubClient, GithubOptions};
use ecoscout_llm::{ChatCompletionsClient, ChatCompletionsOptions};
use ecoscout_shared::{AppConfig, ResearchConfig, Topic, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// ecoscout — turn a research topic into a GitHub exploration plan.
#[derive(Parser)]
#[command(
    name = "ecoscout",
    version,
    about = "Search GitHub for a topic and generate a markdown exploration plan.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Research a topic and print an exploration plan.
    Plan(PlanArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments for `ecoscout plan`.
#[derive(Args, Debug)]
pub(crate) struct PlanArgs {
    /// Research topic; multiple words are joined with spaces.
    #[arg(required = true, num_args = 1..)]
    pub topic: Vec<String>,

    /// Maximum repositories to take from search.
    #[arg(long)]
    pub max_results: Option<u32>,

    /// Maximum contributors to list per repository.
    #[arg(long)]
    pub max_contributors: Option<u32>,

    /// Contributor fetches allowed in flight at once (1 = sequential).
    #[arg(long)]
    pub concurrency: Option<u32>,

    /// Model identifier, overriding the config file.
    #[arg(long)]
    pub model: Option<String>,

    /// Also write the plan to this file.
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the final research context as JSON instead of the plan.
    #[arg(long)]
    pub json: bool,
}

impl PlanArgs {
    fn topic(&self) -> Result<Topic> {
        Ok(Topic::new(self.topic.join(" "))?)
    }

    /// Merge flag overrides on top of the configured bounds.
    fn research_config(&self, config: &AppConfig) -> ResearchConfig {
        let mut research = ResearchConfig::from(config);
        if let Some(n) = self.max_results {
            research.max_results = n;
        }
        if let Some(n) = self.max_contributors {
            research.max_contributors = n;
        }
        if let Some(n) = self.concurrency {
            research.concurrency = n;
        }
        research
    }
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout is
/// reserved for pipeline transitions and the plan.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "ecoscout=warn",
        1 => "ecoscout=info",
        2 => "ecoscout=debug",
        _ => "ecoscout=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Plan(args) => cmd_plan(args).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_plan(args: PlanArgs) -> Result<()> {
    let topic = args.topic()?;

    let mut config = load_config()?;
    if let Some(model) = &args.model {
        config.llm.model = model.clone();
    }

    let research = args.research_config(&config);
    research.validate()?;

    // Validate the model key before any network traffic.
    let model = ChatCompletionsClient::new(ChatCompletionsOptions::from_config(&config)?)?;
    let github = GithubClient::new(&GithubOptions::from_config(&config))?;

    info!(
        topic = %topic,
        model = model.model(),
        max_results = research.max_results,
        max_contributors = research.max_contributors,
        "starting research"
    );

    println!("Starting research on topic: '{topic}'...");

    let pipeline = ResearchPipeline::new(github, model, research)?;
    let reporter = CliProgress::new();
    let ctx = pipeline.run(topic, &reporter).await;

    if let Some(path) = &args.out {
        std::fs::write(path, ctx.plan())
            .map_err(|e| eyre!("failed to write plan to {}: {e}", path.display()))?;
        info!(path = %path.display(), "plan written");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&ctx)?);
    } else {
        println!("FINAL RESEARCH PLAN:");
        println!("{}", ctx.plan());
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// Prints each pipeline transition to stdout while a spinner tracks the
/// stage in flight.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(
                style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
            );
        }
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage_started(&self, stage: Stage) {
        let message = match stage {
            Stage::Search => "Searching GitHub repositories",
            Stage::Enrich => "Fetching top contributors",
            Stage::Plan => "Generating exploration plan",
            Stage::Done => "Done",
        };
        self.spinner.set_message(message);
    }

    fn repository_enriched(&self, full_name: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Fetching contributors [{current}/{total}] {full_name}"));
    }

    fn stage_finished(&self, stage: Stage, ctx: &ResearchContext) {
        let summary = describe_transition(stage, ctx);
        self.spinner.suspend(|| {
            println!("--- {stage} ---");
            println!("{summary}");
        });
    }

    fn done(&self, _ctx: &ResearchContext) {
        self.spinner.finish_and_clear();
    }
}

/// One human-readable line (plus detail lines) for what `stage` recorded.
fn describe_transition(stage: Stage, ctx: &ResearchContext) -> String {
    match stage {
        Stage::Search => match ctx.error() {
            Some(error) => format!("no repositories ({error})"),
            None => {
                let names: Vec<&str> = ctx
                    .repositories()
                    .iter()
                    .map(|r| r.full_name.as_str())
                    .collect();
                format!("found {} repositories: {}", names.len(), names.join(", "))
            }
        },
        Stage::Enrich => {
            if ctx.enriched_repositories().is_empty() {
                return format!("skipped ({})", ctx.error().unwrap_or("no input"));
            }
            let mut out = format!("enriched {} repositories", ctx.enriched_repositories().len());
            for entry in ctx.enriched_repositories() {
                out.push_str(&format!(
                    "\n  {} ({} contributors)",
                    entry.repository().full_name,
                    entry.top_contributors().len()
                ));
            }
            out
        }
        Stage::Plan => match ctx.plan_source() {
            Some(PlanSource::Model) => format!("generated ({} chars)", ctx.plan().len()),
            Some(PlanSource::Fallback) => match ctx.error() {
                Some(error) => format!("fallback plan written ({error})"),
                None => "fallback plan written".to_string(),
            },
            None => "no plan".to_string(),
        },
        Stage::Done => "done".to_string(),
    }
}
