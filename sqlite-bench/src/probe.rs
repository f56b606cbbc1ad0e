//! The benchmark's probe statement and its lifecycle.
//!
//! A probe starts out `Prepared`. Every execution steps the statement once,
//! hands the first row to a reader closure and resets the statement. When a
//! step produces no row, or the step itself fails, the probe is finalized;
//! any later execution returns [`BenchError::Finalized`] instead of touching
//! a dead statement.

use rusqlite::{Connection, Row, Statement};

use crate::config::PrepareMode;
use crate::error::{BenchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Prepared,
    Finalized,
}

pub struct Probe<'conn> {
    conn: &'conn Connection,
    sql: String,
    mode: PrepareMode,
    /// Held only in `PrepareMode::Once`.
    stmt: Option<Statement<'conn>>,
    state: ProbeState,
    executions: u64,
}

impl<'conn> Probe<'conn> {
    /// Prepare `sql` on `conn`. In cached mode the statement is prepared into
    /// the connection cache up front so syntax errors surface here too.
    pub fn prepare(conn: &'conn Connection, sql: &str, mode: PrepareMode) -> Result<Self> {
        let stmt = match mode {
            PrepareMode::Once => Some(conn.prepare(sql)?),
            PrepareMode::Cached => {
                conn.prepare_cached(sql)?;
                None
            }
        };
        log::debug!("prepared probe {sql:?} ({mode:?})");
        Ok(Self {
            conn,
            sql: sql.to_string(),
            mode,
            stmt,
            state: ProbeState::Prepared,
            executions: 0,
        })
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    /// Number of executions attempted on a live probe.
    pub fn executions(&self) -> u64 {
        self.executions
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Step once and read the first row with `read`.
    ///
    /// Returns `Ok(None)` when the query produced no row; the probe is
    /// finalized in that case.
    pub fn execute<T, F>(&mut self, read: F) -> Result<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> Result<T>,
    {
        if self.state == ProbeState::Finalized {
            return Err(BenchError::Finalized);
        }
        self.executions += 1;

        let outcome = match self.mode {
            PrepareMode::Once => match self.stmt.as_mut() {
                Some(stmt) => step_once(stmt, read),
                None => Err(BenchError::Finalized),
            },
            PrepareMode::Cached => match self.conn.prepare_cached(&self.sql) {
                Ok(mut stmt) => step_once(&mut stmt, read),
                Err(e) => Err(e.into()),
            },
        };

        match outcome {
            Ok(Some(value)) => Ok(Some(value)),
            Ok(None) => {
                log::debug!("probe {:?} returned no row; finalizing", self.sql);
                self.finalize()?;
                Ok(None)
            }
            Err(e) => {
                if let Err(fin) = self.finalize() {
                    log::warn!("finalizing probe after failed step: {fin}");
                }
                Err(e)
            }
        }
    }

    /// Release the statement. Idempotent.
    pub fn finalize(&mut self) -> Result<()> {
        if self.state == ProbeState::Finalized {
            return Ok(());
        }
        self.state = ProbeState::Finalized;
        match self.stmt.take() {
            Some(stmt) => stmt.finalize()?,
            None => self.conn.flush_prepared_statement_cache(),
        }
        Ok(())
    }
}

/// Dropping `Rows` resets the statement, so it can be stepped again.
fn step_once<T, F>(stmt: &mut Statement<'_>, read: F) -> Result<Option<T>>
where
    F: FnOnce(&Row<'_>) -> Result<T>,
{
    let mut rows = stmt.raw_query();
    let value = match rows.next()? {
        Some(row) => Some(read(row)?),
        None => None,
    };
    Ok(value)
}
