//! Playwright browser automation
//!
//! Each capture generates a self-contained Playwright script and runs it
//! with `node`. The script reports its outcome as a single JSON line on
//! stdout, which is parsed back into the error taxonomy.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use regex::Regex;
use serde::Deserialize;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::error::{CheckError, CheckResult};
use crate::scenario::Viewport;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }
}

impl std::str::FromStr for Browser {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chromium" => Ok(Browser::Chromium),
            "firefox" => Ok(Browser::Firefox),
            "webkit" => Ok(Browser::Webkit),
            other => Err(format!("unknown browser '{other}' (chromium, firefox, webkit)")),
        }
    }
}

/// Browser-level settings shared by every capture in a run.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub browser: Browser,
    pub headless: bool,

    /// Upper bound for `page.goto`
    pub navigation_timeout_ms: u64,

    /// Upper bound for the readiness selector wait
    pub wait_timeout_ms: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: Browser::Chromium,
            headless: true,
            navigation_timeout_ms: 30_000,
            wait_timeout_ms: 5_000,
        }
    }
}

/// One screenshot request: where to go, what to wait for, where to write.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    pub url: String,
    pub ready_selector: String,
    pub viewport: Viewport,
    pub full_page: bool,
    pub capture_path: PathBuf,
}

/// Outcome of a successful capture.
#[derive(Debug, Clone)]
pub struct PageCapture {
    pub title: String,
}

/// Status line printed by the generated script.
#[derive(Debug, Deserialize)]
struct StatusLine {
    ok: bool,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

/// Check that Playwright is installed before any scenario runs.
pub fn check_playwright_installed() -> CheckResult<()> {
    let output = Command::new("npx")
        .args(["playwright", "--version"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match output {
        Ok(status) if status.success() => Ok(()),
        _ => Err(CheckError::PlaywrightNotFound),
    }
}

pub struct BrowserSession {
    config: BrowserConfig,
}

impl BrowserSession {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }

    /// Navigate, wait for readiness, and screenshot to the requested path.
    pub async fn capture(&self, request: &CaptureRequest) -> CheckResult<PageCapture> {
        if let Some(parent) = request.capture_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let script = self.build_capture_script(request);

        let temp_dir = tempfile::tempdir()?;
        let script_path = temp_dir.path().join("capture.js");
        std::fs::write(&script_path, &script)?;

        debug!(url = %request.url, script = %script_path.display(), "running capture script");

        // Run from the invocation directory so `playwright` resolves from
        // the project's node_modules
        let output = TokioCommand::new("node")
            .arg(&script_path)
            .current_dir(std::env::current_dir()?)
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let status = match parse_status_line(&stdout) {
            Some(status) => status,
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CheckError::Browser(format!(
                    "script produced no status line:\nstdout: {}\nstderr: {}",
                    stdout.trim(),
                    stderr.trim()
                )));
            }
        };

        if !status.ok {
            return Err(self.classify_failure(request, status));
        }

        if !request.capture_path.exists() {
            return Err(CheckError::CaptureNotFound(request.capture_path.clone()));
        }

        Ok(PageCapture {
            title: status.title.unwrap_or_default(),
        })
    }

    /// Build the Playwright script for a single capture.
    pub fn build_capture_script(&self, request: &CaptureRequest) -> String {
        let url = js_string(&request.url);
        let selector = js_string(&request.ready_selector);
        let capture_path = js_string(&request.capture_path.to_string_lossy());

        format!(
            r#"const playwright = require(require.resolve('playwright', {{ paths: [process.cwd()] }}));
const {{ chromium, firefox, webkit }} = playwright;

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}
  }});
  const page = await context.newPage();

  const status = {{ ok: true }};
  try {{
    try {{
      await page.goto({url}, {{ timeout: {nav_timeout} }});
    }} catch (error) {{
      throw {{ kind: 'navigation_timeout', message: error.message }};
    }}
    try {{
      await page.waitForSelector({selector}, {{ state: 'visible', timeout: {wait_timeout} }});
    }} catch (error) {{
      throw {{ kind: 'element_not_found', message: error.message }};
    }}
    status.title = await page.title();
    await page.screenshot({{ path: {capture_path}, fullPage: {full_page} }});
  }} catch (error) {{
    status.ok = false;
    status.kind = error.kind || 'browser';
    status.message = error.message || String(error);
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
  console.log(JSON.stringify(status));
}})();
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = request.viewport.width,
            height = request.viewport.height,
            url = url,
            nav_timeout = self.config.navigation_timeout_ms,
            selector = selector,
            wait_timeout = self.config.wait_timeout_ms,
            capture_path = capture_path,
            full_page = request.full_page,
        )
    }

    fn classify_failure(&self, request: &CaptureRequest, status: StatusLine) -> CheckError {
        let message = status.message.unwrap_or_else(|| "unknown".to_string());

        match status.kind.as_deref() {
            Some("navigation_timeout") => CheckError::NavigationTimeout {
                url: request.url.clone(),
                timeout_ms: self.config.navigation_timeout_ms,
            },
            Some("element_not_found") => CheckError::ElementNotFound {
                selector: request.ready_selector.clone(),
                timeout_ms: self.config.wait_timeout_ms,
            },
            _ => CheckError::Browser(message),
        }
    }
}

/// Extract the last JSON object line from script output.
///
/// The page under test may log to the console; only the final status line
/// is ours.
fn parse_status_line(stdout: &str) -> Option<StatusLine> {
    let re = Regex::new(r"(?m)^\{.*\}\s*$").expect("status line regex");
    re.find_iter(stdout)
        .filter_map(|m| serde_json::from_str::<StatusLine>(m.as_str()).ok())
        .last()
}

/// Quote a value as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).expect("string serialization")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CaptureRequest {
        CaptureRequest {
            url: "http://localhost:3000/dashboard".to_string(),
            ready_selector: r#"[data-testid="dashboard-main"]"#.to_string(),
            viewport: Viewport { width: 1280, height: 720 },
            full_page: false,
            capture_path: PathBuf::from("test-results/captures/react-dashboard.png"),
        }
    }

    #[test]
    fn test_script_contains_navigation_and_wait() {
        let session = BrowserSession::new(BrowserConfig::default());
        let script = session.build_capture_script(&request());

        assert!(script.contains(r#"page.goto("http://localhost:3000/dashboard", { timeout: 30000 })"#));
        assert!(script.contains(r#"waitForSelector("[data-testid=\"dashboard-main\"]""#));
        assert!(script.contains("timeout: 5000"));
        assert!(script.contains("viewport: { width: 1280, height: 720 }"));
        assert!(script.contains("fullPage: false"));
        assert!(script.contains("chromium.launch({ headless: true })"));
    }

    #[test]
    fn test_script_respects_browser_choice() {
        let session = BrowserSession::new(BrowserConfig {
            browser: Browser::Firefox,
            headless: false,
            ..Default::default()
        });
        let script = session.build_capture_script(&request());

        assert!(script.contains("firefox.launch({ headless: false })"));
    }

    #[test]
    fn test_parse_status_line_ignores_page_console_noise() {
        let stdout = "app booting\n{\"not\": \"ours\"}\n{\"ok\":true,\"title\":\"Dashboard\"}\n";
        let status = parse_status_line(stdout).unwrap();
        assert!(status.ok);
        assert_eq!(status.title.as_deref(), Some("Dashboard"));
    }

    #[test]
    fn test_parse_status_line_missing() {
        assert!(parse_status_line("nothing useful here").is_none());
    }

    #[test]
    fn test_classify_navigation_timeout() {
        let session = BrowserSession::new(BrowserConfig::default());
        let status: StatusLine = serde_json::from_str(
            r#"{"ok":false,"kind":"navigation_timeout","message":"Timeout 30000ms exceeded"}"#,
        )
        .unwrap();

        let err = session.classify_failure(&request(), status);
        assert!(matches!(err, CheckError::NavigationTimeout { timeout_ms: 30_000, .. }));
    }

    #[test]
    fn test_classify_element_not_found() {
        let session = BrowserSession::new(BrowserConfig::default());
        let status: StatusLine = serde_json::from_str(
            r#"{"ok":false,"kind":"element_not_found","message":"waiting for selector"}"#,
        )
        .unwrap();

        let err = session.classify_failure(&request(), status);
        match err {
            CheckError::ElementNotFound { selector, timeout_ms } => {
                assert_eq!(selector, r#"[data-testid="dashboard-main"]"#);
                assert_eq!(timeout_ms, 5_000);
            }
            other => panic!("expected ElementNotFound, got {other}"),
        }
    }

    #[test]
    fn test_classify_unknown_kind_is_browser_error() {
        let session = BrowserSession::new(BrowserConfig::default());
        let status: StatusLine =
            serde_json::from_str(r#"{"ok":false,"kind":"crash","message":"target closed"}"#).unwrap();

        let err = session.classify_failure(&request(), status);
        assert!(matches!(err, CheckError::Browser(_)));
    }

    #[test]
    fn test_browser_from_str() {
        assert_eq!("webkit".parse::<Browser>().unwrap(), Browser::Webkit);
        assert!("safari".parse::<Browser>().is_err());
    }
}
