//! Command line and environment configuration.
//!
//! Positional arguments follow the classic harness: `sqlite-bench [BATCHES]
//! [ITERATIONS]`. Everything else is an optional flag. A `.env` file in the
//! working directory is honoured by `main` before parsing.

use std::env;

use clap::{Parser, ValueEnum};
use fastint_core::RangeCheck;
use log::LevelFilter;

use crate::error::{BenchError, Result};

pub const DEFAULT_BATCHES: u32 = 5;
pub const DEFAULT_ITERATIONS: u64 = 1_000_000;
pub const DEFAULT_SQL: &str = "pragma user_version";
pub const DEFAULT_USER_VERSION: i32 = 100;

/// How the probe statement is obtained for each execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PrepareMode {
    /// Prepare once, step and reset it on every execution.
    Once,
    /// Look the SQL up in the connection's statement cache on every execution.
    Cached,
}

/// How column 0 is read after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Accessor {
    /// 32-bit read with the overflow side channel.
    Fast,
    /// Plain 64-bit read.
    Wide,
    /// Checked 32-bit read; an out-of-range value is an error.
    Native,
}

#[derive(Debug, Parser)]
#[command(
    name = "sqlite-bench",
    version,
    about = "Times repeated execution of one prepared statement against in-memory SQLite"
)]
pub struct BenchArgs {
    /// Number of timed batches.
    #[arg(env = "SQLITE_BENCH_BATCHES", default_value_t = DEFAULT_BATCHES)]
    pub batches: u32,

    /// Statement executions per batch.
    #[arg(env = "SQLITE_BENCH_ITERATIONS", default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: u64,

    /// Query to time. Column 0 of its first row is read on every execution.
    #[arg(long, default_value = DEFAULT_SQL)]
    pub sql: String,

    /// Value written with `PRAGMA user_version` during setup.
    #[arg(long, default_value_t = DEFAULT_USER_VERSION, allow_negative_numbers = true)]
    pub user_version: i32,

    #[arg(long, value_enum, default_value_t = PrepareMode::Once)]
    pub mode: PrepareMode,

    #[arg(long, value_enum, default_value_t = Accessor::Fast)]
    pub accessor: Accessor,

    /// Only flag values above i32::MAX as overflowing (legacy rule).
    #[arg(long)]
    pub upper_only: bool,
}

/// Validated benchmark settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    pub batches: u32,
    pub iterations: u64,
    pub sql: String,
    pub user_version: i32,
    pub mode: PrepareMode,
    pub accessor: Accessor,
    pub range: RangeCheck,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            batches: DEFAULT_BATCHES,
            iterations: DEFAULT_ITERATIONS,
            sql: DEFAULT_SQL.to_string(),
            user_version: DEFAULT_USER_VERSION,
            mode: PrepareMode::Once,
            accessor: Accessor::Fast,
            range: RangeCheck::Symmetric,
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batches == 0 {
            return Err(BenchError::InvalidConfig("batches must be at least 1".into()));
        }
        if self.iterations == 0 {
            return Err(BenchError::InvalidConfig("iterations must be at least 1".into()));
        }
        if self.sql.trim().is_empty() {
            return Err(BenchError::InvalidConfig("sql must not be empty".into()));
        }
        Ok(())
    }
}

impl TryFrom<BenchArgs> for BenchConfig {
    type Error = BenchError;

    fn try_from(args: BenchArgs) -> Result<Self> {
        let config = Self {
            batches: args.batches,
            iterations: args.iterations,
            sql: args.sql,
            user_version: args.user_version,
            mode: args.mode,
            accessor: args.accessor,
            range: if args.upper_only {
                RangeCheck::UpperOnly
            } else {
                RangeCheck::Symmetric
            },
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_log_level(value: &str) -> Option<LevelFilter> {
    match value.to_lowercase().as_str() {
        "off" => Some(LevelFilter::Off),
        "error" => Some(LevelFilter::Error),
        "warn" | "warning" => Some(LevelFilter::Warn),
        "info" => Some(LevelFilter::Info),
        "debug" => Some(LevelFilter::Debug),
        "trace" => Some(LevelFilter::Trace),
        _ => None,
    }
}

pub const LOG_LEVEL_VAR: &str = "SQLITE_BENCH_LOG_LEVEL";
pub const LOG_FILE_VAR: &str = "SQLITE_BENCH_LOG_FILE";

fn log_level_or_default(value: Option<&str>) -> LevelFilter {
    value.and_then(parse_log_level).unwrap_or(LevelFilter::Info)
}

fn log_file_or_none(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Level from `SQLITE_BENCH_LOG_LEVEL`; info when unset or unrecognised.
pub fn resolve_log_level() -> LevelFilter {
    log_level_or_default(env::var(LOG_LEVEL_VAR).ok().as_deref())
}

/// Log file path, or `None` when unset, empty or `none`.
pub fn resolve_log_file() -> Option<String> {
    log_file_or_none(env::var(LOG_FILE_VAR).ok().as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> BenchArgs {
        BenchArgs::try_parse_from(std::iter::once("sqlite-bench").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn positional_arguments_are_optional() {
        let args = parse(&[]);
        assert_eq!(args.batches, DEFAULT_BATCHES);
        assert_eq!(args.iterations, DEFAULT_ITERATIONS);

        let config = BenchConfig::try_from(args).unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn positional_batches_then_iterations() {
        let config = BenchConfig::try_from(parse(&["2", "300"])).unwrap();
        assert_eq!(config.batches, 2);
        assert_eq!(config.iterations, 300);
    }

    #[test]
    fn flags_select_mode_accessor_and_range() {
        let config = BenchConfig::try_from(parse(&[
            "1",
            "10",
            "--mode",
            "cached",
            "--accessor",
            "native",
            "--upper-only",
            "--user-version=-4",
            "--sql",
            "select 1",
        ]))
        .unwrap();
        assert_eq!(config.mode, PrepareMode::Cached);
        assert_eq!(config.accessor, Accessor::Native);
        assert_eq!(config.range, RangeCheck::UpperOnly);
        assert_eq!(config.user_version, -4);
        assert_eq!(config.sql, "select 1");
    }

    #[test]
    fn zero_counts_are_rejected() {
        assert!(matches!(
            BenchConfig::try_from(parse(&["0"])),
            Err(BenchError::InvalidConfig(_))
        ));
        assert!(matches!(
            BenchConfig::try_from(parse(&["1", "0"])),
            Err(BenchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn blank_sql_is_rejected() {
        let config = BenchConfig {
            sql: "   ".into(),
            ..BenchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn log_level_names() {
        assert_eq!(parse_log_level("WARNING"), Some(LevelFilter::Warn));
        assert_eq!(parse_log_level("trace"), Some(LevelFilter::Trace));
        assert_eq!(parse_log_level("loud"), None);
    }

    #[test]
    fn log_level_fallbacks() {
        assert_eq!(log_level_or_default(None), LevelFilter::Info);
        assert_eq!(log_level_or_default(Some("")), LevelFilter::Info);
        assert_eq!(log_level_or_default(Some("loud")), LevelFilter::Info);
        assert_eq!(log_level_or_default(Some("Debug")), LevelFilter::Debug);
        assert_eq!(log_level_or_default(Some("off")), LevelFilter::Off);
    }

    #[test]
    fn log_file_fallbacks() {
        assert_eq!(log_file_or_none(None), None);
        assert_eq!(log_file_or_none(Some("")), None);
        assert_eq!(log_file_or_none(Some("   ")), None);
        assert_eq!(log_file_or_none(Some("none")), None);
        assert_eq!(log_file_or_none(Some("NONE")), None);
        assert_eq!(
            log_file_or_none(Some("  bench.log ")),
            Some("bench.log".to_string())
        );
    }

    // The only test that touches these variables, so it cannot race another.
    #[test]
    fn resolvers_read_the_environment() {
        env::remove_var(LOG_LEVEL_VAR);
        env::remove_var(LOG_FILE_VAR);
        assert_eq!(resolve_log_level(), LevelFilter::Info);
        assert_eq!(resolve_log_file(), None);

        env::set_var(LOG_LEVEL_VAR, "warning");
        env::set_var(LOG_FILE_VAR, "run.log");
        assert_eq!(resolve_log_level(), LevelFilter::Warn);
        assert_eq!(resolve_log_file(), Some("run.log".to_string()));

        env::set_var(LOG_LEVEL_VAR, "chatty");
        env::set_var(LOG_FILE_VAR, "none");
        assert_eq!(resolve_log_level(), LevelFilter::Info);
        assert_eq!(resolve_log_file(), None);

        env::remove_var(LOG_LEVEL_VAR);
        env::remove_var(LOG_FILE_VAR);
    }
}
