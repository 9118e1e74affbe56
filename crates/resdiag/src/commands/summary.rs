use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use rd_compare::Summary;
use rd_compare::summary::write_summary;
use rd_store::default_dump_dir;
use tracing::warn;

use super::{Outcome, generated_now};

/// Execute the `summary` command: roll every per-test record in `dir` up
/// into `summary.html`.
pub fn execute(dir: Option<PathBuf>) -> Result<Outcome> {
    let dir = dir.unwrap_or_else(default_dump_dir);
    if !dir.is_dir() {
        bail!("Directory {} does not exist", dir.display());
    }

    let summary = Summary::collect(&dir)
        .with_context(|| format!("Failed to read reports in {}", dir.display()))?;
    if summary.total() == 0 {
        warn!(dir = %dir.display(), "no report files found");
        println!("No report files found in {}", dir.display());
        return Ok(Outcome::Fail);
    }

    let path = write_summary(&summary, &dir, &generated_now())?;
    summary.print_summary();
    println!("Summary report: {}", path.display());

    Ok(Outcome::from_passed(summary.all_passed()))
}
