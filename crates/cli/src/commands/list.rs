//! List scenarios and their baseline status

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use visreg_core::scenario::Scenario;

use crate::output::{self, OutputFormat, TableDisplay};

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory containing scenario YAML files
    #[arg(long, default_value = "scenarios")]
    scenarios: PathBuf,

    /// Directory of committed baseline images
    #[arg(long, default_value = "baselines")]
    baseline_dir: PathBuf,
}

#[derive(Serialize)]
struct ScenarioRow {
    app: String,
    name: String,
    url: String,
    tolerance: f64,
    baseline: &'static str,
    skip: bool,
}

impl TableDisplay for ScenarioRow {
    fn headers() -> Vec<&'static str> {
        vec!["APP", "NAME", "URL", "TOLERANCE", "BASELINE", "SKIP"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.app.clone(),
            self.name.clone(),
            self.url.clone(),
            format!("{}", self.tolerance),
            self.baseline.to_string(),
            if self.skip { "yes".to_string() } else { String::new() },
        ]
    }
}

pub fn execute(args: ListArgs, format: OutputFormat) -> anyhow::Result<bool> {
    let scenarios = Scenario::load_all(&args.scenarios)
        .with_context(|| format!("loading scenarios from {}", args.scenarios.display()))?;

    let rows: Vec<ScenarioRow> = scenarios
        .iter()
        .map(|s| ScenarioRow {
            app: s.app.clone(),
            name: s.name.clone(),
            url: s.url.clone(),
            tolerance: s.tolerance,
            baseline: if args.baseline_dir.join(format!("{}.png", s.name)).exists() {
                "present"
            } else {
                "missing"
            },
            skip: s.skip,
        })
        .collect();

    output::print_list(&rows, format);
    Ok(true)
}
