//! Benchmark driver: connection setup, the timed batch loop and teardown.

use std::io::Write;
use std::time::Instant;

use fastint_core::column::classify;
use fastint_core::{FastIntColumn, IntColumn, Narrowed, OverflowSlots};
use rusqlite::{Connection, OpenFlags, Row};

use crate::config::{Accessor, BenchConfig};
use crate::error::{BenchError, Result};
use crate::probe::Probe;
use crate::report::{BatchTiming, BenchReport};

/// Open a private, unsynchronised in-memory database.
pub fn open_connection() -> Result<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_PRIVATE_CACHE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Ok(Connection::open_in_memory_with_flags(flags)?)
}

/// Session pragmas, applied in order.
pub fn session_pragmas(user_version: i32) -> [String; 5] {
    [
        "PRAGMA auto_vacuum = none".to_string(),
        "PRAGMA journal_mode = OFF".to_string(),
        "PRAGMA temp_store = memory".to_string(),
        "PRAGMA locking_mode = exclusive".to_string(),
        format!("PRAGMA user_version = {user_version}"),
    ]
}

/// Configure a connection for single-owner in-memory benchmarking.
///
/// `journal_mode` and `locking_mode` answer with a row, so every pragma is
/// run as a query and its rows drained.
pub fn configure_connection(conn: &Connection, user_version: i32) -> Result<()> {
    for pragma in session_pragmas(user_version) {
        let mut stmt = conn.prepare(&pragma)?;
        let mut rows = stmt.query([])?;
        while rows.next()?.is_some() {}
        log::debug!("applied {pragma}");
    }
    Ok(())
}

/// Reads column 0 of a probe row according to the configured accessor.
pub struct ColumnReader<'a> {
    accessor: Accessor,
    column: FastIntColumn<'a>,
    slots: &'a OverflowSlots,
}

impl<'a> ColumnReader<'a> {
    pub fn new(config: &BenchConfig, slots: &'a OverflowSlots) -> Self {
        Self {
            accessor: config.accessor,
            column: FastIntColumn::with_slots(slots).with_range_check(config.range),
            slots,
        }
    }

    /// Returns the value widened to `i64` and whether it overflowed `i32`.
    pub fn read(&self, row: &Row<'_>) -> Result<(i64, bool)> {
        match self.accessor {
            Accessor::Fast => {
                let narrow = self.column.extract(row, 0)?;
                Ok(match self.slots.overflowed() {
                    Some(wide) => (wide, true),
                    None => (i64::from(narrow), false),
                })
            }
            Accessor::Wide => {
                let wide = row.column_i64(0)?;
                let overflowed = matches!(
                    classify(wide, self.column.range_check()),
                    Narrowed::Overflow(_)
                );
                Ok((wide, overflowed))
            }
            Accessor::Native => match row.get::<_, i32>(0) {
                Ok(narrow) => Ok((i64::from(narrow), false)),
                Err(rusqlite::Error::IntegralValueOutOfRange(_, value)) => {
                    Err(BenchError::Overflow { value })
                }
                Err(e) => Err(e.into()),
            },
        }
    }
}

/// Run one timed batch of `iterations` executions.
pub fn run_batch(
    probe: &mut Probe<'_>,
    reader: &ColumnReader<'_>,
    iterations: u64,
    report: &mut BenchReport,
) -> Result<BatchTiming> {
    let start = Instant::now();
    for _ in 0..iterations {
        if let Some((value, overflowed)) = probe.execute(|row| reader.read(row))? {
            report.last_value = Some(value);
            report.overflows += u64::from(overflowed);
        }
    }
    let timing = BatchTiming {
        elapsed: start.elapsed(),
        iterations,
    };
    report.executions = probe.executions();
    report.push(timing);
    Ok(timing)
}

/// Full run: open, configure, prepare, time every batch, then finalize and
/// close. One line per batch is written to `out`.
pub fn run<W: Write>(config: &BenchConfig, out: &mut W) -> Result<BenchReport> {
    config.validate()?;

    let conn = open_connection()?;
    configure_connection(&conn, config.user_version)?;

    let slots = OverflowSlots::new();
    let reader = ColumnReader::new(config, &slots);
    let mut report = BenchReport::default();

    {
        let mut probe = Probe::prepare(&conn, &config.sql, config.mode)?;
        for batch in 0..config.batches {
            let timing = run_batch(&mut probe, &reader, config.iterations, &mut report)?;
            writeln!(out, "{}", timing.line())?;
            log::debug!("batch {batch} done in {:.2} ms", timing.elapsed_ms());
        }
        probe.finalize()?;
    }

    conn.close().map_err(|(_, e)| e)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PrepareMode;
    use fastint_core::RangeCheck;

    #[test]
    fn pragmas_are_applied() {
        let conn = open_connection().unwrap();
        configure_connection(&conn, 100).unwrap();

        let version: i32 = conn
            .query_row("pragma user_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 100);

        let temp_store: i64 = conn
            .query_row("pragma temp_store", [], |r| r.get(0))
            .unwrap();
        assert_eq!(temp_store, 2);

        let journal: String = conn
            .query_row("pragma journal_mode", [], |r| r.get(0))
            .unwrap();
        assert_eq!(journal, "off");
    }

    fn reader_value(accessor: Accessor, sql: &str) -> Result<(i64, bool)> {
        let conn = Connection::open_in_memory().unwrap();
        let config = BenchConfig {
            accessor,
            ..BenchConfig::default()
        };
        let slots = OverflowSlots::new();
        let reader = ColumnReader::new(&config, &slots);
        let mut probe = Probe::prepare(&conn, sql, PrepareMode::Once).unwrap();
        let value = probe.execute(|row| reader.read(row))?;
        Ok(value.unwrap())
    }

    #[test]
    fn accessors_agree_on_fitting_values() {
        for accessor in [Accessor::Fast, Accessor::Wide, Accessor::Native] {
            assert_eq!(reader_value(accessor, "select -12").unwrap(), (-12, false));
        }
    }

    #[test]
    fn fast_and_wide_recover_overflowing_values() {
        for accessor in [Accessor::Fast, Accessor::Wide] {
            assert_eq!(
                reader_value(accessor, "select 4294967296").unwrap(),
                (4_294_967_296, true)
            );
        }
    }

    #[test]
    fn fast_and_wide_share_the_range_check() {
        let conn = Connection::open_in_memory().unwrap();
        for range in [RangeCheck::UpperOnly, RangeCheck::Symmetric] {
            let mut flags = Vec::new();
            for accessor in [Accessor::Fast, Accessor::Wide] {
                let config = BenchConfig {
                    accessor,
                    range,
                    ..BenchConfig::default()
                };
                let slots = OverflowSlots::new();
                let reader = ColumnReader::new(&config, &slots);
                let mut probe =
                    Probe::prepare(&conn, "select -3000000000", PrepareMode::Once).unwrap();
                let (_, overflowed) = probe.execute(|row| reader.read(row)).unwrap().unwrap();
                flags.push(overflowed);
            }
            let expected = range == RangeCheck::Symmetric;
            assert_eq!(flags, [expected, expected], "{range:?}");
        }
    }

    #[test]
    fn native_accessor_reports_overflow() {
        assert!(matches!(
            reader_value(Accessor::Native, "select 4294967296"),
            Err(BenchError::Overflow {
                value: 4_294_967_296
            })
        ));
    }

    #[test]
    fn run_rejects_invalid_config() {
        let config = BenchConfig {
            iterations: 0,
            ..BenchConfig::default()
        };
        let mut out = Vec::new();
        assert!(matches!(
            run(&config, &mut out),
            Err(BenchError::InvalidConfig(_))
        ));
        assert!(out.is_empty());
    }
}
