//! Declarative YAML check scenarios

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CheckError, CheckResult};

/// A single visual regression scenario parsed from YAML.
///
/// A scenario names one (application, page) pair: where to navigate, what
/// signals readiness, and which baseline the capture is compared against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Application label, used for filtering (`--app leptos`)
    pub app: String,

    /// Scenario slug; the baseline file is `<name>.png`
    pub name: String,

    /// URL to navigate to. Relative URLs are joined to the run's base URL;
    /// absolute (`http://...`) URLs are used as-is.
    pub url: String,

    /// Selector that must appear before the screenshot is taken
    pub ready_selector: String,

    /// Viewport for the browser context; fixed so captures are reproducible
    #[serde(default = "default_viewport")]
    pub viewport: Viewport,

    /// Fraction of pixels allowed to differ, 0.0 - 1.0
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Capture the full scrollable page instead of the viewport
    #[serde(default)]
    pub full_page: bool,

    /// When set, the page title must contain this substring after navigation
    #[serde(default)]
    pub title_pattern: Option<String>,

    /// When set, the capture is also forwarded to the review service under
    /// this label
    #[serde(default)]
    pub review_label: Option<String>,

    /// Scenario is listed but never run
    #[serde(default)]
    pub skip: bool,
}

fn default_viewport() -> Viewport {
    Viewport { width: 1280, height: 720 }
}

fn default_tolerance() -> f64 {
    0.01 // 1% pixel difference allowed
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Scenario {
    /// Parse a scenario from a YAML string.
    pub fn from_yaml(yaml: &str) -> CheckResult<Self> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate("<inline>")?;
        Ok(scenario)
    }

    /// Parse a scenario from a YAML file.
    pub fn from_file(path: &Path) -> CheckResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario =
            serde_yaml::from_str(&content).map_err(|e| CheckError::InvalidScenario {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        scenario.validate(&path.display().to_string())?;
        Ok(scenario)
    }

    /// Load all scenarios under a directory, sorted by name.
    pub fn load_all(dir: &Path) -> CheckResult<Vec<Self>> {
        let mut scenarios = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            scenarios.push(Self::from_file(entry.path())?);
        }

        scenarios.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(scenarios)
    }

    /// Check the invariants the rest of the pipeline relies on.
    fn validate(&self, path: &str) -> CheckResult<()> {
        let fail = |reason: String| CheckError::InvalidScenario {
            path: path.to_string(),
            reason,
        };

        if self.name.is_empty() {
            return Err(fail("name must not be empty".into()));
        }
        // The name doubles as the baseline file stem
        if self.name.contains('/') || self.name.contains('\\') {
            return Err(fail(format!("name '{}' must not contain path separators", self.name)));
        }
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(fail(format!(
                "tolerance {} out of range (must be within 0.0 - 1.0)",
                self.tolerance
            )));
        }
        if self.ready_selector.is_empty() {
            return Err(fail("ready_selector must not be empty".into()));
        }
        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(fail(format!(
                "viewport {}x{} must be non-zero",
                self.viewport.width, self.viewport.height
            )));
        }
        Ok(())
    }

    /// Resolve the URL to navigate to against the run's base URL.
    pub fn resolve_url(&self, base_url: &str) -> String {
        if self.url.starts_with("http://") || self.url.starts_with("https://") {
            return self.url.clone();
        }
        format!(
            "{}/{}",
            base_url.trim_end_matches('/'),
            self.url.trim_start_matches('/')
        )
    }

    /// Whether this scenario matches the optional app/name filters.
    pub fn matches(&self, app: Option<&str>, name: Option<&str>) -> bool {
        app.map(|a| a == self.app).unwrap_or(true) && name.map(|n| n == self.name).unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_scenario() {
        let yaml = r#"
app: leptos
name: leptos-home
url: /
ready_selector: main
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.name, "leptos-home");
        assert_eq!(scenario.viewport.width, 1280);
        assert_eq!(scenario.viewport.height, 720);
        assert_eq!(scenario.tolerance, 0.01);
        assert!(!scenario.full_page);
        assert!(!scenario.skip);
    }

    #[test]
    fn test_parse_full_scenario() {
        let yaml = r#"
app: react
name: react-dashboard
url: /dashboard
ready_selector: '[data-testid="dashboard-main"]'
viewport:
  width: 1920
  height: 1080
tolerance: 0.05
full_page: true
review_label: Dashboard Snapshot
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.ready_selector, r#"[data-testid="dashboard-main"]"#);
        assert_eq!(scenario.viewport.width, 1920);
        assert_eq!(scenario.tolerance, 0.05);
        assert!(scenario.full_page);
        assert_eq!(scenario.review_label.as_deref(), Some("Dashboard Snapshot"));
    }

    #[test]
    fn test_tolerance_out_of_range_rejected() {
        let yaml = r#"
app: react
name: bad
url: /
ready_selector: main
tolerance: 1.5
"#;
        let err = Scenario::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, CheckError::InvalidScenario { .. }));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_name_with_separator_rejected() {
        let yaml = r#"
app: react
name: ../escape
url: /
ready_selector: main
"#;
        assert!(Scenario::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_resolve_url() {
        let yaml = r#"
app: react
name: react-dashboard
url: /dashboard
ready_selector: main
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(
            scenario.resolve_url("http://localhost:3000"),
            "http://localhost:3000/dashboard"
        );
        assert_eq!(
            scenario.resolve_url("http://localhost:3000/"),
            "http://localhost:3000/dashboard"
        );
    }

    #[test]
    fn test_resolve_url_absolute_passthrough() {
        let yaml = r#"
app: solid
name: solid-home
url: http://localhost:4000/
ready_selector: h1
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert_eq!(scenario.resolve_url("http://localhost:3000"), "http://localhost:4000/");
    }

    #[test]
    fn test_filter_matching() {
        let yaml = r#"
app: leptos
name: leptos-home
url: /
ready_selector: main
"#;
        let scenario = Scenario::from_yaml(yaml).unwrap();
        assert!(scenario.matches(None, None));
        assert!(scenario.matches(Some("leptos"), None));
        assert!(scenario.matches(Some("leptos"), Some("leptos-home")));
        assert!(!scenario.matches(Some("react"), None));
        assert!(!scenario.matches(None, Some("react-dashboard")));
    }
}
