//! Standalone benchmark runner.
//!
//! Usage:
//!   cargo run --release                      # 5 batches of 1,000,000
//!   cargo run --release -- 10 200000         # 10 batches of 200,000
//!   cargo run --release -- --mode cached --accessor wide
//!
//! Logging goes to stderr (`SQLITE_BENCH_LOG_LEVEL`, default info) and
//! optionally to `SQLITE_BENCH_LOG_FILE`; stdout carries one line per batch.

use std::io;
use std::process;

use anyhow::Context;
use clap::Parser;
use sqlite_bench::config::{resolve_log_file, resolve_log_level, BenchArgs, BenchConfig};
use sqlite_bench::driver;
use sqlite_bench::report::log_summary;

fn run(args: BenchArgs) -> anyhow::Result<()> {
    let config = BenchConfig::try_from(args).context("invalid arguments")?;
    log::info!(
        "{} batches x {} executions of {:?} ({:?}, {:?} accessor, {:?} range check)",
        config.batches,
        config.iterations,
        config.sql,
        config.mode,
        config.accessor,
        config.range
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let report = driver::run(&config, &mut out).context("benchmark run failed")?;
    log_summary(&report);
    Ok(())
}

fn main() {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();
    let args = BenchArgs::parse();

    let log_file = resolve_log_file();
    fastint_core::initialize_logger(resolve_log_level(), log_file.as_deref()).unwrap_or_else(
        |e| {
            eprintln!("Failed to initialize logger: {e:#}. Exiting.");
            process::exit(1);
        },
    );

    if let Err(e) = run(args) {
        log::error!("{e:#}");
        process::exit(1);
    }
}
