//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use visreg_core::runner::{CheckReport, CheckStatus, SuiteReport};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() {
        println!("No items found.");
        return;
    }

    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for item in items {
                println!("{}", item.row().join("\t"));
            }
        }
    }
}

impl TableDisplay for CheckReport {
    fn headers() -> Vec<&'static str> {
        vec!["SCENARIO", "APP", "STATUS", "DIFF", "TOLERANCE", "TIME", "DETAIL"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.app.clone(),
            status_cell(self.status),
            self.diff_ratio
                .map(|r| format!("{:.4}", r))
                .unwrap_or_else(|| "-".to_string()),
            format!("{}", self.tolerance),
            format!("{} ms", self.duration_ms),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

fn status_cell(status: CheckStatus) -> String {
    match status {
        CheckStatus::Pass => "pass".green().to_string(),
        CheckStatus::Fail => "FAIL".red().bold().to_string(),
        CheckStatus::BaselineCreated => "baseline-created".yellow().to_string(),
        CheckStatus::Skipped => "skipped".dimmed().to_string(),
    }
}

/// Print a full suite report
pub fn print_suite(report: &SuiteReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            print_list(&report.checks, OutputFormat::Table);

            let summary = format!(
                "{} passed, {} failed, {} skipped, {} baseline(s) created ({} ms)",
                report.passed,
                report.failed,
                report.skipped,
                report.baselines_created,
                report.duration_ms
            );
            if report.success() {
                println!("{}", summary.green());
            } else {
                println!("{}", summary.red());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(report).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for check in &report.checks {
                println!(
                    "{}\t{}\t{}",
                    check.name,
                    check.status,
                    check
                        .diff_ratio
                        .map(|r| format!("{:.4}", r))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
            println!(
                "total={} passed={} failed={} skipped={}",
                report.total, report.passed, report.failed, report.skipped
            );
        }
    }
}
