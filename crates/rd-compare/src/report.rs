//! Per-test reports: console, HTML, and a JSON record for aggregation.
//!
//! Rendering is a pure function of the [`TestRun`] and an explicit
//! generation timestamp; nothing here compares bytes.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::diff::{Status, Verdict};
use crate::runner::TestRun;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Cannot write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Report output {0} would collide with its JSON record; choose a non-.json path")]
    OutputCollides(PathBuf),
}

/// Machine-readable form of a per-test report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub generated: String,
    pub run: TestRun,
}

/// Where a per-test report was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    pub html: PathBuf,
    pub json: PathBuf,
}

/// `report_<id>.html`
pub fn report_file_name(run: &TestRun) -> String {
    format!("report_{}.html", run.test_id)
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

pub(crate) const STYLE: &str = "\
        body { font-family: monospace; padding: 20px; background: #f5f5f5; }
        .container { max-width: 1200px; margin: 0 auto; background: white; padding: 20px; }
        h1 { color: #333; border-bottom: 3px solid #4CAF50; padding-bottom: 10px; }
        h2 { color: #555; margin-top: 30px; border-bottom: 2px solid #ddd; padding-bottom: 5px; }
        .match, .pass { color: green; font-weight: bold; }
        .differ, .fail { color: red; font-weight: bold; }
        .missing { color: orange; font-weight: bold; }
        pre { background: #f4f4f4; padding: 15px; overflow-x: auto; border: 1px solid #ddd; font-size: 12px; }
        table { border-collapse: collapse; width: 100%; margin: 20px 0; }
        th, td { border: 1px solid #ddd; padding: 8px; text-align: left; }
        th { background-color: #4CAF50; color: white; }
        .info { background: #e3f2fd; padding: 15px; border-left: 4px solid #2196F3; margin: 15px 0; }
        .error { background: #ffebee; padding: 15px; border-left: 4px solid #f44336; margin: 15px 0; }
        .success { background: #e8f5e9; padding: 15px; border-left: 4px solid #4CAF50; margin: 15px 0; }
";

fn css_class(status: Status) -> &'static str {
    match status {
        Status::Match => "match",
        Status::Missing => "missing",
        Status::Differ
        | Status::SizeMismatch
        | Status::PartCountMismatch
        | Status::PartsDiffer => "differ",
    }
}

/// Self-contained HTML report for one test.
pub fn render_run(run: &TestRun, generated: &str) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Diagnostic Comparison Report - {id}</title>\n<style>\n{style}</style>\n</head>\n\
         <body>\n<div class=\"container\">\n<h1>Pipeline Diagnostic Report</h1>\n\
         <div class=\"info\"><strong>Test:</strong> {id}<br>\n<strong>Generated:</strong> {generated}</div>\n",
        id = run.test_id,
        style = STYLE,
        generated = escape_html(generated),
    );

    html.push_str("<h2>Summary</h2>\n<table>\n<tr><th>#</th><th>Stage</th><th>Status</th><th>Details</th></tr>\n");
    for (position, result) in run.stages.iter().enumerate() {
        let status = result.verdict.status();
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td class=\"{}\">{}</td><td>{}</td></tr>",
            position,
            result.stage,
            css_class(status),
            status,
            escape_html(&result.verdict.detail()),
        );
    }
    html.push_str("</table>\n");

    match run.first_failing() {
        None => html.push_str(
            "<div class=\"success\"><strong>ALL STAGES MATCH</strong><br>\n\
             No divergence detected between reference and candidate.</div>\n",
        ),
        Some(first) => {
            let _ = write!(
                html,
                "<div class=\"error\"><strong>DIVERGENCE DETECTED</strong><br>\n\
                 First failing stage: <strong>{}</strong> ({})<br>\n{}</div>\n",
                first.stage,
                first.verdict.status(),
                escape_html(&first.verdict.detail()),
            );
        }
    }

    html.push_str("<h2>Detailed Comparisons</h2>\n");
    for result in &run.stages {
        match &result.verdict {
            Verdict::Differ { context, .. } => {
                let _ = write!(
                    html,
                    "<h3>{}</h3>\n<p>Reference: {}<br>\nCandidate: {}</p>\n<pre>{}</pre>\n",
                    result.stage,
                    escape_html(&result.reference),
                    escape_html(&result.candidate),
                    escape_html(context),
                );
            }
            Verdict::PartsDiffer { mismatches, .. } => {
                let _ = write!(
                    html,
                    "<h3>{}</h3>\n<table>\n<tr><th>Part</th><th>Reference bytes</th>\
                     <th>Candidate bytes</th><th>First diff</th></tr>\n",
                    result.stage
                );
                for m in mismatches {
                    let offset = m
                        .first_offset
                        .map_or_else(|| "size only".to_string(), |o| format!("0x{:08x}", o));
                    let _ = writeln!(
                        html,
                        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                        m.index, m.reference_size, m.candidate_size, offset
                    );
                }
                html.push_str("</table>\n");
            }
            Verdict::Match { .. }
            | Verdict::SizeMismatch { .. }
            | Verdict::PartCountMismatch { .. }
            | Verdict::Missing { .. } => {}
        }
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

/// Write `report_<id>.html` and its JSON record.
///
/// `output` overrides the HTML path; the JSON record always sits next to
/// the HTML with a `.json` extension. Only those two files are touched, so an
/// output path that already ends in `.json` is refused.
pub fn write_run_report(
    run: &TestRun,
    default_dir: &Path,
    output: Option<&Path>,
    generated: &str,
) -> Result<ReportPaths, ReportError> {
    let html_path = output.map_or_else(|| default_dir.join(report_file_name(run)), Path::to_path_buf);
    let json_path = html_path.with_extension("json");
    if json_path == html_path {
        return Err(ReportError::OutputCollides(html_path));
    }

    if let Some(parent) = html_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| ReportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let record = RunRecord {
        generated: generated.to_string(),
        run: run.clone(),
    };
    fs::write(&html_path, render_run(run, generated)).map_err(|source| ReportError::Io {
        path: html_path.clone(),
        source,
    })?;
    fs::write(&json_path, serde_json::to_string_pretty(&record)?).map_err(|source| ReportError::Io {
        path: json_path.clone(),
        source,
    })?;

    info!(path = %html_path.display(), "HTML report generated");
    Ok(ReportPaths {
        html: html_path,
        json: json_path,
    })
}

/// Print the per-stage verdicts and the root cause to stdout.
pub fn print_run(run: &TestRun) {
    println!("\n============================================================");
    println!("DIAGNOSTIC COMPARISON - test {}", run.test_id);
    println!("============================================================");
    for result in &run.stages {
        println!("  {:<20} {}", result.stage, result.verdict);
    }
    println!("------------------------------------------------------------");
    match run.first_failing() {
        None => println!("ALL STAGES MATCH - no divergence detected"),
        Some(first) => {
            println!("DIVERGENCE DETECTED");
            println!("First failing stage: {}", first.stage);
            println!("Status: {}", first.verdict.status());
            if let Verdict::Differ { context, .. } = &first.verdict {
                println!("\n{}", context);
            }
        }
    }
    println!("============================================================\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::compare_blobs;
    use crate::runner::StageResult;
    use rd_store::{Stage, TestId};

    fn run_with(verdict: Verdict) -> TestRun {
        TestRun {
            test_id: TestId(1024),
            stages: vec![StageResult {
                stage: Stage::Encrypted,
                reference: "py<1>.bin".into(),
                candidate: "cpp.bin".into(),
                verdict,
            }],
        }
    }

    #[test]
    fn test_render_is_deterministic() {
        let run = run_with(compare_blobs(Some(&b"abc<d"[..]), Some(&b"abX<d"[..])));
        let a = render_run(&run, "2026-01-01 00:00:00");
        let b = render_run(&run, "2026-01-01 00:00:00");
        assert_eq!(a, b);
        assert!(a.contains("First failing stage: <strong>encrypted</strong>"));
        assert!(a.contains("py&lt;1&gt;.bin"));
        assert!(!a.contains("abc<d"));
    }

    #[test]
    fn test_render_pass_banner() {
        let run = run_with(compare_blobs(Some(&b"abc"[..]), Some(&b"abc"[..])));
        let html = render_run(&run, "now");
        assert!(html.contains("ALL STAGES MATCH"));
        assert!(!html.contains("DIVERGENCE DETECTED"));
    }

    #[test]
    fn test_write_run_report_default_location() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("report_2048.html"), "other").unwrap();

        let run = run_with(compare_blobs(Some(&b"abc"[..]), Some(&b"abc"[..])));
        let paths = write_run_report(&run, dir.path(), None, "now").unwrap();
        assert_eq!(paths.html, dir.path().join("report_1024.html"));
        assert_eq!(paths.json, dir.path().join("report_1024.json"));

        let record: RunRecord =
            serde_json::from_str(&fs::read_to_string(&paths.json).unwrap()).unwrap();
        assert_eq!(record.run, run);
        assert_eq!(
            fs::read_to_string(dir.path().join("report_2048.html")).unwrap(),
            "other"
        );
    }

    #[test]
    fn test_json_output_path_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_with(compare_blobs(Some(&b"abc"[..]), Some(&b"abc"[..])));
        let output = dir.path().join("out.json");

        let result = write_run_report(&run, dir.path(), Some(&output), "t");
        assert!(matches!(result, Err(ReportError::OutputCollides(p)) if p == output));
        assert!(!output.exists());
    }

    #[test]
    fn test_custom_output_keeps_html_and_record_apart() {
        let dir = tempfile::tempdir().unwrap();
        let run = run_with(compare_blobs(Some(&b"abc"[..]), Some(&b"abc"[..])));
        let output = dir.path().join("nested").join("out.html");

        let paths = write_run_report(&run, dir.path(), Some(&output), "t").unwrap();
        assert_eq!(paths.json, dir.path().join("nested").join("out.json"));
        assert!(fs::read_to_string(&paths.html).unwrap().starts_with("<!DOCTYPE html>"));
        assert!(fs::read_to_string(&paths.json).unwrap().starts_with('{'));
    }
}
