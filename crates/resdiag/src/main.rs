//! resdiag: compare a pipeline implementation under test against reference
//! dumps, stage by stage, and report the first stage that diverges.

mod commands;
mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::Outcome;

#[derive(Parser)]
#[command(
    name = "resdiag",
    version,
    about = "Stage-by-stage differential diagnostics for resource transfers"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare every planned stage of one test and write its report
    Compare(commands::compare::CompareArgs),
    /// Aggregate per-test reports into summary.html
    Summary {
        /// Directory holding report_<size>.json records
        dir: Option<PathBuf>,
    },
    /// Write the deterministic test payload
    Pattern {
        /// Payload size in bytes
        #[arg(short, long)]
        size: usize,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let result = match cli.command {
        Commands::Compare(args) => commands::compare::execute(&args),
        Commands::Summary { dir } => commands::summary::execute(dir),
        Commands::Pattern { size, output } => commands::pattern::execute(size, &output),
    };

    match result {
        Ok(Outcome::Pass) => ExitCode::SUCCESS,
        Ok(Outcome::Fail) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}
