//! Suite orchestration: preflight, capture, comparison, reporting

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info, warn};

use crate::baseline::{BaselineStore, StoreConfig};
use crate::browser::{self, BrowserConfig, BrowserSession, CaptureRequest};
use crate::compare::CompareOptions;
use crate::error::{CheckError, CheckResult};
use crate::review::{ReviewClient, ReviewConfig};
use crate::scenario::Scenario;

/// Outcome of a single scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    BaselineCreated,
    Skipped,
}

impl std::fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Fail => "fail",
            CheckStatus::BaselineCreated => "baseline-created",
            CheckStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Result of one scenario, retained in the suite report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckReport {
    pub name: String,
    pub app: String,
    pub status: CheckStatus,
    pub tolerance: f64,

    /// Fraction of differing pixels, when a comparison ran
    pub diff_ratio: Option<f64>,

    /// Machine-readable failure kind from the error taxonomy
    pub failure_kind: Option<String>,
    pub error: Option<String>,

    pub capture: Option<PathBuf>,
    pub diff_image: Option<PathBuf>,
    pub duration_ms: u64,
}

impl CheckReport {
    fn skipped(scenario: &Scenario) -> Self {
        Self {
            name: scenario.name.clone(),
            app: scenario.app.clone(),
            status: CheckStatus::Skipped,
            tolerance: scenario.tolerance,
            diff_ratio: None,
            failure_kind: None,
            error: None,
            capture: None,
            diff_image: None,
            duration_ms: 0,
        }
    }
}

/// Aggregated result of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub started_at: DateTime<Utc>,
    pub base_url: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub baselines_created: usize,
    pub duration_ms: u64,
    pub checks: Vec<CheckReport>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for a suite run.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Where the application under test is already served. Serving it is an
    /// external precondition; visreg never starts or stops it.
    pub base_url: String,

    pub browser: BrowserConfig,
    pub store: StoreConfig,

    /// Write captures as new baselines instead of comparing
    pub update_baselines: bool,

    /// Concurrent scenarios; each owns its own browser session
    pub jobs: usize,

    /// Per-channel allowance passed to the comparison
    pub channel_tolerance: u8,

    /// How long to wait for the base URL to answer before giving up
    pub preflight_timeout: Duration,

    /// Overall bound for one scenario, capture plus comparison
    pub scenario_timeout: Duration,

    /// Where the suite report is written
    pub output_dir: PathBuf,

    /// Review service forwarding, active only when configured and the
    /// token env var is set
    pub review: Option<ReviewConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            browser: BrowserConfig::default(),
            store: StoreConfig::default(),
            update_baselines: false,
            jobs: 1,
            channel_tolerance: 0,
            preflight_timeout: Duration::from_secs(30),
            scenario_timeout: Duration::from_secs(60),
            output_dir: PathBuf::from("test-results"),
            review: None,
        }
    }
}

/// Runs scenarios and aggregates their reports.
pub struct CheckRunner {
    config: RunnerConfig,
    store: Arc<BaselineStore>,
    review: Option<Arc<ReviewClient>>,
}

impl CheckRunner {
    pub fn new(config: RunnerConfig) -> CheckResult<Self> {
        let store = Arc::new(BaselineStore::new(config.store.clone())?);
        let review = match &config.review {
            Some(review_config) => ReviewClient::from_env(review_config.clone())?.map(Arc::new),
            None => None,
        };

        Ok(Self { config, store, review })
    }

    pub fn store(&self) -> &BaselineStore {
        &self.store
    }

    /// Run the given scenarios and write the suite report.
    pub async fn run(&self, scenarios: Vec<Scenario>) -> CheckResult<SuiteReport> {
        browser::check_playwright_installed()?;
        self.preflight().await?;

        let started_at = Utc::now();
        let start = Instant::now();

        info!(
            "running {} scenario(s) against {}",
            scenarios.len(),
            self.config.base_url
        );

        let semaphore = Arc::new(Semaphore::new(self.config.jobs.max(1)));
        let mut tasks: JoinSet<(usize, CheckReport, Option<JoinHandle<()>>)> = JoinSet::new();
        let mut reports: Vec<Option<CheckReport>> = vec![None; scenarios.len()];
        let total = scenarios.len();

        for (index, scenario) in scenarios.into_iter().enumerate() {
            if scenario.skip {
                info!("- {} (skipped)", scenario.name);
                reports[index] = Some(CheckReport::skipped(&scenario));
                continue;
            }

            let context = ScenarioContext {
                scenario,
                base_url: self.config.base_url.clone(),
                browser: self.config.browser.clone(),
                store: Arc::clone(&self.store),
                review: self.review.clone(),
                update_baselines: self.config.update_baselines,
                channel_tolerance: self.config.channel_tolerance,
                scenario_timeout: self.config.scenario_timeout,
            };
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("semaphore not closed");
                let (report, forward) = run_one(context).await;
                (index, report, forward)
            });
        }

        let mut forwards = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, report, forward) = joined.map_err(|e| CheckError::Browser(e.to_string()))?;

            match report.status {
                CheckStatus::Pass => info!("✓ {} ({} ms)", report.name, report.duration_ms),
                CheckStatus::BaselineCreated => {
                    info!("+ {} baseline created ({} ms)", report.name, report.duration_ms)
                }
                CheckStatus::Fail => error!(
                    "✗ {} - {}",
                    report.name,
                    report.error.as_deref().unwrap_or("unknown error")
                ),
                CheckStatus::Skipped => {}
            }

            reports[index] = Some(report);
            forwards.extend(forward);
        }

        // Forwarding is fire-and-forget: let the sends finish, ignore the
        // outcome
        for handle in forwards {
            let _ = handle.await;
        }

        let checks: Vec<CheckReport> = reports.into_iter().flatten().collect();
        debug_assert_eq!(checks.len(), total);

        let report = SuiteReport {
            started_at,
            base_url: self.config.base_url.clone(),
            total: checks.len(),
            passed: checks.iter().filter(|c| c.status == CheckStatus::Pass).count(),
            failed: checks.iter().filter(|c| c.status == CheckStatus::Fail).count(),
            skipped: checks.iter().filter(|c| c.status == CheckStatus::Skipped).count(),
            baselines_created: checks
                .iter()
                .filter(|c| c.status == CheckStatus::BaselineCreated)
                .count(),
            duration_ms: start.elapsed().as_millis() as u64,
            checks,
        };

        info!(
            "results: {} passed, {} failed, {} skipped ({} ms)",
            report.passed, report.failed, report.skipped, report.duration_ms
        );

        self.write_report(&report)?;
        Ok(report)
    }

    /// Wait for the base URL to answer anything at all.
    ///
    /// Any HTTP response counts; only connection failures keep the loop
    /// waiting.
    async fn preflight(&self) -> CheckResult<()> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;

        let start = Instant::now();
        let mut first_attempt = true;

        while start.elapsed() < self.config.preflight_timeout {
            match client.get(&self.config.base_url).send().await {
                Ok(_) => return Ok(()),
                Err(e) => {
                    if first_attempt {
                        info!("waiting for {} to answer...", self.config.base_url);
                        first_attempt = false;
                    }
                    if !e.is_connect() && !e.is_timeout() {
                        warn!("preflight error: {}", e);
                    }
                }
            }

            tokio::time::sleep(Duration::from_millis(250)).await;
        }

        Err(CheckError::BaseUrlUnreachable(self.config.base_url.clone()))
    }

    fn write_report(&self, report: &SuiteReport) -> CheckResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("visreg-results.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("report written to {}", path.display());
        Ok(path)
    }
}

/// Everything one scenario task owns.
struct ScenarioContext {
    scenario: Scenario,
    base_url: String,
    browser: BrowserConfig,
    store: Arc<BaselineStore>,
    review: Option<Arc<ReviewClient>>,
    update_baselines: bool,
    channel_tolerance: u8,
    scenario_timeout: Duration,
}

async fn run_one(context: ScenarioContext) -> (CheckReport, Option<JoinHandle<()>>) {
    let start = Instant::now();
    let scenario = &context.scenario;
    let capture_path = context.store.capture_path(&scenario.name);

    debug!(name = %scenario.name, "running scenario");

    let timeout_secs = context.scenario_timeout.as_secs();
    let outcome = match tokio::time::timeout(context.scenario_timeout, execute(&context)).await {
        Ok(outcome) => outcome,
        Err(_) => Err(CheckError::Timeout(timeout_secs)),
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    // Forward to the review service whenever a capture exists; the check's
    // own result is independent of it
    let forward = match (&context.review, &scenario.review_label) {
        (Some(review), Some(label)) if capture_path.exists() => {
            let review = Arc::clone(review);
            let label = label.clone();
            let viewport = scenario.viewport;
            let name = scenario.name.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = review.forward(&label, viewport, &capture_path).await {
                    warn!("review forward for '{}' failed: {}", name, e);
                }
            }))
        }
        _ => None,
    };

    let report = match outcome {
        Ok(outcome) => CheckReport {
            name: scenario.name.clone(),
            app: scenario.app.clone(),
            status: outcome.status,
            tolerance: scenario.tolerance,
            diff_ratio: outcome.diff_ratio,
            failure_kind: None,
            error: None,
            capture: Some(context.store.capture_path(&scenario.name)),
            diff_image: None,
            duration_ms,
        },
        Err(e) => {
            let diff_image = match &e {
                CheckError::ThresholdExceeded { diff_image, .. } => Some(diff_image.clone()),
                _ => None,
            };
            let diff_ratio = match &e {
                CheckError::ThresholdExceeded { diff_ratio, .. } => Some(*diff_ratio),
                _ => None,
            };
            CheckReport {
                name: scenario.name.clone(),
                app: scenario.app.clone(),
                status: CheckStatus::Fail,
                tolerance: scenario.tolerance,
                diff_ratio,
                failure_kind: Some(e.kind().to_string()),
                error: Some(e.to_string()),
                capture: context
                    .store
                    .capture_path(&scenario.name)
                    .exists()
                    .then(|| context.store.capture_path(&scenario.name)),
                diff_image,
                duration_ms,
            }
        }
    };

    (report, forward)
}

struct ScenarioOutcome {
    status: CheckStatus,
    diff_ratio: Option<f64>,
}

async fn execute(context: &ScenarioContext) -> CheckResult<ScenarioOutcome> {
    let scenario = &context.scenario;
    let session = BrowserSession::new(context.browser.clone());

    let request = CaptureRequest {
        url: scenario.resolve_url(&context.base_url),
        ready_selector: scenario.ready_selector.clone(),
        viewport: scenario.viewport,
        full_page: scenario.full_page,
        capture_path: context.store.capture_path(&scenario.name),
    };

    let page = session.capture(&request).await?;

    if let Some(pattern) = &scenario.title_pattern {
        if !page.title.contains(pattern.as_str()) {
            return Err(CheckError::TitleMismatch {
                title: page.title,
                pattern: pattern.clone(),
            });
        }
    }

    if context.update_baselines {
        context.store.promote(&scenario.name)?;
        return Ok(ScenarioOutcome {
            status: CheckStatus::BaselineCreated,
            diff_ratio: None,
        });
    }

    let verified = context.store.verify(
        &scenario.name,
        scenario.tolerance,
        CompareOptions {
            channel_tolerance: context.channel_tolerance,
        },
    )?;

    if verified.diff_ratio > 0.0 {
        warn!(
            "'{}' differs by {:.4} but is within tolerance {}",
            scenario.name, verified.diff_ratio, scenario.tolerance
        );
    }

    Ok(ScenarioOutcome {
        status: CheckStatus::Pass,
        diff_ratio: Some(verified.diff_ratio),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_config_default() {
        let config = RunnerConfig::default();
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.jobs, 1);
        assert!(!config.update_baselines);
        assert_eq!(config.channel_tolerance, 0);
    }

    #[test]
    fn test_suite_report_success_only_when_nothing_failed() {
        let mut report = SuiteReport {
            started_at: Utc::now(),
            base_url: "http://localhost:3000".to_string(),
            total: 2,
            passed: 1,
            failed: 0,
            skipped: 1,
            baselines_created: 0,
            duration_ms: 10,
            checks: vec![],
        };
        assert!(report.success());

        report.failed = 1;
        assert!(!report.success());
    }

    #[test]
    fn test_check_status_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CheckStatus::BaselineCreated).unwrap(),
            "\"baseline_created\""
        );
        assert_eq!(serde_json::to_string(&CheckStatus::Pass).unwrap(), "\"pass\"");
    }
}
