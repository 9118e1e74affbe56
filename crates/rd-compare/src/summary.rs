//! Roll-up of many per-test reports into one pass/fail summary.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use rd_store::{Stage, TestId};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::diff::Status;
use crate::report::{ReportError, RunRecord, STYLE, escape_html, report_file_name};
use crate::runner::TestRun;

/// File name of the aggregated summary inside the report directory.
pub const SUMMARY_FILE: &str = "summary.html";

/// One test's line in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub test_id: TestId,
    pub passed: bool,
    pub first_failing: Option<Stage>,
    pub first_status: Option<Status>,
    /// Per-test HTML report, relative to the summary.
    pub report: String,
}

impl SummaryEntry {
    pub fn from_run(run: &TestRun) -> Self {
        let first = run.first_failing();
        Self {
            test_id: run.test_id,
            passed: first.is_none(),
            first_failing: first.map(|r| r.stage),
            first_status: first.map(|r| r.verdict.status()),
            report: report_file_name(run),
        }
    }
}

/// Test results keyed by distinct test id, in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub entries: Vec<SummaryEntry>,
}

/// Parse the test id out of `report_<id>.json`.
///
/// Only the canonical spelling is accepted (plain digits, no leading zero),
/// so every id maps to exactly one record name.
pub fn parse_report_id(file_name: &str) -> Option<TestId> {
    let digits = file_name.strip_prefix("report_")?.strip_suffix(".json")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if digits.len() > 1 && digits.starts_with('0') {
        return None;
    }
    digits.parse::<u64>().ok().map(TestId)
}

impl Summary {
    pub fn from_runs<'a>(runs: impl IntoIterator<Item = &'a TestRun>) -> Self {
        let mut by_id = BTreeMap::new();
        for run in runs {
            by_id.insert(run.test_id, SummaryEntry::from_run(run));
        }
        Self {
            entries: by_id.into_values().collect(),
        }
    }

    /// Read every `report_<id>.json` record in `dir`.
    ///
    /// Files whose name carries no numeric id are skipped with a warning.
    pub fn collect(dir: &Path) -> Result<Self, ReportError> {
        let io_err = |source| ReportError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut by_id = BTreeMap::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with("report_") || !name.ends_with(".json") {
                continue;
            }
            let Some(id) = parse_report_id(&name) else {
                warn!(file = %name, "report name carries no test id, skipping");
                continue;
            };

            let path = entry.path();
            let text = fs::read_to_string(&path).map_err(|source| ReportError::Io {
                path: path.clone(),
                source,
            })?;
            let record: RunRecord = serde_json::from_str(&text)?;
            let mut summary_entry = SummaryEntry::from_run(&record.run);
            summary_entry.test_id = id;
            summary_entry.report = format!("report_{}.html", id);
            by_id.insert(id, summary_entry);
        }

        info!(reports = by_id.len(), dir = %dir.display(), "collected reports");
        Ok(Self {
            entries: by_id.into_values().collect(),
        })
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }

    pub fn passed(&self) -> usize {
        self.entries.iter().filter(|e| e.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.passed()
    }

    pub fn all_passed(&self) -> bool {
        self.failed() == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &SummaryEntry> {
        self.entries.iter().filter(|e| !e.passed)
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n============================================================");
        println!("SUMMARY");
        println!("============================================================");
        println!("Total:  {}", self.total());
        println!("Passed: {}", self.passed());
        println!("Failed: {}", self.failed());

        if self.failed() > 0 {
            println!("\nFailed tests:");
            for entry in self.failures() {
                println!(
                    "  - {}: first failing stage {}",
                    human_size(entry.test_id.0),
                    entry
                        .first_failing
                        .map_or_else(|| "unknown".to_string(), |s| s.to_string())
                );
            }
        }
        println!("============================================================\n");
    }
}

/// `512 bytes`, `10 KB`, `1.0 MB`.
pub fn human_size(size: u64) -> String {
    if size >= 1_048_576 {
        format!("{:.1} MB", size as f64 / 1_048_576.0)
    } else if size >= 1024 {
        format!("{:.0} KB", size as f64 / 1024.0)
    } else {
        format!("{} bytes", size)
    }
}

/// HTML summary table linking every per-test report.
pub fn render_summary(summary: &Summary, generated: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Diagnostic Test Summary</title>\n<style>\n{style}</style>\n</head>\n\
         <body>\n<div class=\"container\">\n<h1>Pipeline Diagnostic Summary</h1>\n\
         <div class=\"info\"><strong>Generated:</strong> {generated}<br>\n\
         <strong>Total Tests:</strong> {total}<br>\n<strong>Passed:</strong> {passed}<br>\n\
         <strong>Failed:</strong> {failed}</div>\n",
        style = STYLE,
        generated = escape_html(generated),
        total = summary.total(),
        passed = summary.passed(),
        failed = summary.failed(),
    );

    html.push_str(
        "<table>\n<tr><th>Test Size</th><th>Status</th><th>First Failing Stage</th><th>Report</th></tr>\n",
    );
    for entry in &summary.entries {
        let (class, status) = if entry.passed { ("pass", "PASS") } else { ("fail", "FAIL") };
        let first = match (entry.first_failing, entry.first_status) {
            (Some(stage), Some(status)) => format!("{} ({})", stage, status),
            (Some(stage), None) => stage.to_string(),
            (None, _) => "N/A".to_string(),
        };
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td class=\"{}\">{}</td><td>{}</td><td><a href=\"{}\">View Report</a></td></tr>",
            human_size(entry.test_id.0),
            class,
            status,
            first,
            escape_html(&entry.report),
        );
    }
    html.push_str("</table>\n</div>\n</body>\n</html>\n");
    html
}

/// Write `summary.html` into `dir`, leaving the per-test reports alone.
pub fn write_summary(summary: &Summary, dir: &Path, generated: &str) -> Result<PathBuf, ReportError> {
    let path = dir.join(SUMMARY_FILE);
    fs::write(&path, render_summary(summary, generated)).map_err(|source| ReportError::Io {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), "summary report generated");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_report_id() {
        assert_eq!(parse_report_id("report_1048576.json"), Some(TestId(1048576)));
        assert_eq!(parse_report_id("report_big.json"), None);
        assert_eq!(parse_report_id("report_12.html"), None);
        assert_eq!(parse_report_id("report_0.json"), Some(TestId(0)));
    }

    #[test]
    fn test_non_canonical_report_ids_are_rejected() {
        assert_eq!(parse_report_id("report_+5.json"), None);
        assert_eq!(parse_report_id("report_007.json"), None);
        assert_eq!(parse_report_id("report_.json"), None);
        assert_eq!(parse_report_id("report_-1.json"), None);
    }

    #[test]
    fn test_human_size() {
        assert_eq!(human_size(512), "512 bytes");
        assert_eq!(human_size(10240), "10 KB");
        assert_eq!(human_size(1048576), "1.0 MB");
        assert_eq!(human_size(5242880), "5.0 MB");
    }

    #[test]
    fn test_empty_summary() {
        let summary = Summary::default();
        assert!(summary.all_passed());
        assert!(render_summary(&summary, "now").contains("<strong>Total Tests:</strong> 0"));
    }
}
