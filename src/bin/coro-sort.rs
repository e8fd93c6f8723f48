//! `coro-sort` -- external sort of integer files driven by the C1
//! coroutine scheduler.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use log::error;

use sysprog_lab::coro::run_external_sort;

#[derive(Parser, Debug)]
#[command(name = "coro-sort", about = "Sort integer files with a coroutine scheduler")]
struct Args {
    /// Total scheduling latency budget in microseconds, split evenly across
    /// the input files to produce each coroutine's time quantum.
    #[arg(short = 'l', long = "latency", default_value_t = 100_000)]
    latency_us: u64,

    /// Number of worker coroutines to spawn; defaults to the file count.
    #[arg(short = 'c', long = "coro-count")]
    coro_count: Option<usize>,

    /// Input files to sort.
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if args.latency_us == 0 {
        error!("--latency must be positive");
        return ExitCode::FAILURE;
    }
    if args.coro_count == Some(0) {
        error!("--coro-count must be positive");
        return ExitCode::FAILURE;
    }

    let coro_count = args.coro_count.unwrap_or(args.files.len());
    let temp_dir = match tempfile::Builder::new().prefix("coro-sort-").tempdir() {
        Ok(dir) => dir,
        Err(e) => {
            error!("failed to create a temp directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run_external_sort(
        &args.files,
        coro_count,
        Duration::from_micros(args.latency_us),
        temp_dir.path(),
        &PathBuf::from("result.txt"),
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("coro-sort failed: {e}");
            ExitCode::FAILURE
        }
    }
}
