use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use rd_compare::hexdump::DEFAULT_CONTEXT_BYTES;
use rd_compare::report::{print_run, write_run_report};
use rd_compare::{ComparisonRunner, StageComparator, StagePlan};
use rd_store::{TestId, default_dump_dir};

use super::{Outcome, generated_now};

#[derive(Args, Debug, Clone)]
pub struct CompareArgs {
    /// Test id, normally the payload size in bytes
    #[arg(short, long)]
    pub size: u64,

    /// Reference dump directory (default: the shared dump directory)
    #[arg(long)]
    pub reference_dir: Option<PathBuf>,

    /// Candidate dump directory (default: the reference directory)
    #[arg(long)]
    pub candidate_dir: Option<PathBuf>,

    /// HTML report path (default: report_<size>.html in the reference directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON stage plan overriding the built-in stage order and file names
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Bytes of hex context shown on each side of a difference
    #[arg(long, default_value_t = DEFAULT_CONTEXT_BYTES)]
    pub context: usize,
}

/// Execute the `compare` command: evaluate every stage, print the verdicts
/// and write the per-test report.
pub fn execute(args: &CompareArgs) -> Result<Outcome> {
    let reference_dir = args.reference_dir.clone().unwrap_or_else(default_dump_dir);
    let candidate_dir = args
        .candidate_dir
        .clone()
        .unwrap_or_else(|| reference_dir.clone());

    let plan = match &args.plan {
        Some(path) => StagePlan::load(path)
            .with_context(|| format!("Failed to load stage plan: {}", path.display()))?,
        None => StagePlan::default(),
    };

    let runner = ComparisonRunner::new(plan, &reference_dir, &candidate_dir)?
        .with_comparator(StageComparator::new(args.context));
    let run = runner.run(TestId(args.size))?;

    print_run(&run);
    let paths = write_run_report(&run, &reference_dir, args.output.as_deref(), &generated_now())?;
    println!("Report: {}", paths.html.display());

    Ok(Outcome::from_passed(run.passed()))
}
