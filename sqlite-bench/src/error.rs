//! Error type shared by the benchmark driver.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The probe statement hit the end of its rows (or failed) and was
    /// finalized; it cannot be executed again.
    #[error("probe statement was finalized and cannot be executed again")]
    Finalized,
    #[error("column value {value} does not fit in 32 bits")]
    Overflow { value: i64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("writing benchmark output: {0}")]
    Io(#[from] std::io::Error),
}
