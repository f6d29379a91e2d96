//! Run visual regression checks

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use tracing::debug;

use visreg_core::baseline::StoreConfig;
use visreg_core::browser::{Browser, BrowserConfig};
use visreg_core::review::ReviewConfig;
use visreg_core::runner::{CheckRunner, RunnerConfig};
use visreg_core::scenario::Scenario;

use crate::output::{self, OutputFormat};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Directory containing scenario YAML files
    #[arg(long, default_value = "scenarios")]
    scenarios: PathBuf,

    /// Run only the scenario with this name
    #[arg(short = 'n', long)]
    scenario: Option<String>,

    /// Run only scenarios for this application
    #[arg(short, long)]
    app: Option<String>,

    /// Base URL where the application is already served
    #[arg(long, env = "VISREG_BASE_URL", default_value = "http://localhost:3000")]
    base_url: String,

    /// Write captures as new baselines instead of comparing
    #[arg(long)]
    update_baselines: bool,

    /// Concurrent scenarios, each with its own browser session
    #[arg(short, long, default_value = "1")]
    jobs: usize,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    browser: String,

    /// Run the browser with a visible window
    #[arg(long)]
    headed: bool,

    /// Navigation timeout in milliseconds
    #[arg(long, default_value = "30000")]
    navigation_timeout_ms: u64,

    /// Readiness selector timeout in milliseconds
    #[arg(long, default_value = "5000")]
    wait_timeout_ms: u64,

    /// Overall per-scenario timeout in seconds
    #[arg(long, default_value = "60")]
    scenario_timeout_secs: u64,

    /// Seconds to wait for the base URL to answer before giving up
    #[arg(long, default_value = "30")]
    preflight_timeout_secs: u64,

    /// Per-channel difference absorbed before a pixel counts as differing
    #[arg(long, default_value = "0")]
    channel_tolerance: u8,

    /// Directory of committed baseline images
    #[arg(long, default_value = "baselines")]
    baseline_dir: PathBuf,

    /// Output directory for captures, diffs, and the suite report
    #[arg(short, long, default_value = "test-results")]
    output: PathBuf,

    /// Review service snapshot endpoint
    #[arg(long, env = "VISREG_REVIEW_ENDPOINT")]
    review_endpoint: Option<String>,

    /// Review service project slug
    #[arg(long, env = "VISREG_REVIEW_PROJECT", default_value = "frontend-suite")]
    review_project: String,
}

pub async fn execute(args: RunArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let scenarios = Scenario::load_all(&args.scenarios)
        .with_context(|| format!("loading scenarios from {}", args.scenarios.display()))?;

    let selected: Vec<Scenario> = scenarios
        .into_iter()
        .filter(|s| s.matches(args.app.as_deref(), args.scenario.as_deref()))
        .collect();

    if selected.is_empty() {
        anyhow::bail!("no scenarios matched the given filters");
    }
    debug!("selected {} of the discovered scenarios", selected.len());

    let browser: Browser = args.browser.parse().map_err(anyhow::Error::msg)?;

    let review = args.review_endpoint.map(|endpoint| ReviewConfig {
        endpoint,
        project: args.review_project,
    });

    let config = RunnerConfig {
        base_url: args.base_url,
        browser: BrowserConfig {
            browser,
            headless: !args.headed,
            navigation_timeout_ms: args.navigation_timeout_ms,
            wait_timeout_ms: args.wait_timeout_ms,
        },
        store: StoreConfig {
            baseline_dir: args.baseline_dir,
            capture_dir: args.output.join("captures"),
            diff_dir: args.output.join("diffs"),
        },
        update_baselines: args.update_baselines,
        jobs: args.jobs,
        channel_tolerance: args.channel_tolerance,
        preflight_timeout: Duration::from_secs(args.preflight_timeout_secs),
        scenario_timeout: Duration::from_secs(args.scenario_timeout_secs),
        output_dir: args.output,
        review,
    };

    let runner = CheckRunner::new(config)?;
    let report = runner.run(selected).await?;

    output::print_suite(&report, format);
    Ok(report.success())
}
