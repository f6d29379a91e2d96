//! Error types for visual regression checks

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("navigation to {url} did not complete within {timeout_ms} ms")]
    NavigationTimeout { url: String, timeout_ms: u64 },

    #[error("readiness selector '{selector}' did not appear within {timeout_ms} ms")]
    ElementNotFound { selector: String, timeout_ms: u64 },

    #[error("page title '{title}' does not contain '{pattern}'")]
    TitleMismatch { title: String, pattern: String },

    #[error("capture is {capture_width}x{capture_height} but baseline is {baseline_width}x{baseline_height}")]
    DimensionMismatch {
        capture_width: u32,
        capture_height: u32,
        baseline_width: u32,
        baseline_height: u32,
    },

    #[error("no baseline at {}; run with --update-baselines to create it", .0.display())]
    MissingBaseline(PathBuf),

    #[error("'{name}' differs by {diff_ratio:.4} (tolerance {tolerance})")]
    ThresholdExceeded {
        name: String,
        diff_ratio: f64,
        tolerance: f64,
        diff_image: PathBuf,
    },

    #[error("base URL {0} did not become reachable")]
    BaseUrlUnreachable(String),

    #[error("scenario did not finish within {0} s")]
    Timeout(u64),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid scenario {path}: {reason}")]
    InvalidScenario { path: String, reason: String },

    #[error("capture not found: {}", .0.display())]
    CaptureNotFound(PathBuf),

    #[error("review service error: {0}")]
    Review(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CheckError {
    /// Stable machine-readable name for the failure kind, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            CheckError::PlaywrightNotFound => "playwright_not_found",
            CheckError::NavigationTimeout { .. } => "navigation_timeout",
            CheckError::ElementNotFound { .. } => "element_not_found",
            CheckError::TitleMismatch { .. } => "title_mismatch",
            CheckError::DimensionMismatch { .. } => "dimension_mismatch",
            CheckError::MissingBaseline(_) => "missing_baseline",
            CheckError::ThresholdExceeded { .. } => "threshold_exceeded",
            CheckError::BaseUrlUnreachable(_) => "base_url_unreachable",
            CheckError::Timeout(_) => "timeout",
            CheckError::Browser(_) => "browser",
            CheckError::InvalidScenario { .. } => "invalid_scenario",
            CheckError::CaptureNotFound(_) => "capture_not_found",
            CheckError::Review(_) => "review",
            CheckError::Io(_) => "io",
            CheckError::Image(_) => "image",
            CheckError::Yaml(_) => "yaml",
            CheckError::Json(_) => "json",
            CheckError::Http(_) => "http",
        }
    }
}

pub type CheckResult<T> = Result<T, CheckError>;
