//! SQLite Prepared-Statement Microbenchmark
//!
//! Opens a private `:memory:` database, applies a handful of session pragmas
//! and times repeated executions of one prepared statement, reading column 0
//! of each result through the overflow-aware extractor from `fastint-core`
//! (or a plain 64-bit / checked 32-bit read, for comparison).
//!
//! Run the harness: `cargo run --release -- [BATCHES] [ITERATIONS]`
//! Run benchmarks: `cargo bench`
//! Run tests: `cargo test`

pub mod config;
pub mod driver;
pub mod error;
pub mod populate;
pub mod probe;
pub mod report;

pub use error::{BenchError, Result};
