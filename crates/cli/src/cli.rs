use std::path::PathBuf;

use clap::Parser;

/// Resolve a matrix computation graph on a fatigue-weighted worker pool.
///
/// Reads a JSON graph description, computes it, and writes either
/// `{"result": [[...]]}` or `{"error": "..."}` to the output file.
#[derive(Parser, Debug)]
#[command(name = "lae", about = "Parallel matrix expression evaluator")]
pub struct CliArgs {
    /// JSON graph description to evaluate
    pub input: PathBuf,

    /// Where to write the result document
    pub output: PathBuf,

    /// Worker threads (overrides LAE_WORKER_THREADS; 0 = available parallelism)
    #[arg(long)]
    pub threads: Option<usize>,

    /// Config profile; keys are looked up as {PROFILE}_{KEY} first
    #[arg(long, env = "LAE_PROFILE")]
    pub profile: Option<String>,

    /// Print the per-worker fatigue report after the run
    #[arg(long)]
    pub report: bool,
}
