//! Synthetic integer tables for extraction benchmarks.
//!
//! Most values fit in 32 bits; a configurable share lands on either side of
//! the `i32` range so the overflow path gets exercised too.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rusqlite::{params, Connection};

use crate::error::Result;

pub const VALUES_TABLE: &str = "vals";

#[derive(Debug, Clone, Copy)]
pub struct ValueParams {
    pub rows: usize,
    /// Share of rows outside the `i32` range, in `0.0..=1.0`.
    pub overflow_ratio: f64,
    pub seed: u64,
}

impl ValueParams {
    /// 10k rows, 1% overflowing.
    pub fn standard() -> Self {
        Self {
            rows: 10_000,
            overflow_ratio: 0.01,
            seed: 0xDEAD_BEEF_CAFE_1337,
        }
    }

    /// 10k rows, a quarter of them overflowing.
    pub fn overflow_heavy() -> Self {
        Self {
            overflow_ratio: 0.25,
            ..Self::standard()
        }
    }
}

/// Generate the values without touching a database.
pub fn generate_values(params: &ValueParams) -> Vec<i64> {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let ratio = params.overflow_ratio.clamp(0.0, 1.0);
    let above = i64::from(i32::MAX) + 1;
    let below = i64::from(i32::MIN) - 1;

    (0..params.rows)
        .map(|_| {
            if !rng.gen_bool(ratio) {
                i64::from(rng.gen::<i32>())
            } else if rng.gen_bool(0.5) {
                rng.gen_range(above..=i64::MAX)
            } else {
                rng.gen_range(i64::MIN..=below)
            }
        })
        .collect()
}

/// Create `vals(id INTEGER PRIMARY KEY, v INTEGER NOT NULL)` and fill it.
///
/// Returns the inserted values in id order (ids start at 1).
pub fn populate_values(conn: &mut Connection, params: &ValueParams) -> Result<Vec<i64>> {
    let values = generate_values(params);

    conn.execute_batch(&format!(
        "DROP TABLE IF EXISTS {VALUES_TABLE};
         CREATE TABLE {VALUES_TABLE} (id INTEGER PRIMARY KEY, v INTEGER NOT NULL);"
    ))?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {VALUES_TABLE} (id, v) VALUES (?1, ?2)"
        ))?;
        for (i, v) in values.iter().enumerate() {
            stmt.execute(params![i as i64 + 1, v])?;
        }
    }
    tx.commit()?;

    log::debug!(
        "populated {} rows into {VALUES_TABLE} ({:.1}% overflowing)",
        values.len(),
        params.overflow_ratio * 100.0
    );
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn out_of_range(v: i64) -> bool {
        i32::try_from(v).is_err()
    }

    #[test]
    fn generation_is_deterministic() {
        let params = ValueParams::standard();
        assert_eq!(generate_values(&params), generate_values(&params));
    }

    #[test]
    fn ratio_bounds() {
        let none = generate_values(&ValueParams {
            overflow_ratio: 0.0,
            ..ValueParams::standard()
        });
        assert!(none.iter().all(|&v| !out_of_range(v)));

        let all = generate_values(&ValueParams {
            rows: 200,
            overflow_ratio: 1.0,
            ..ValueParams::standard()
        });
        assert!(all.iter().all(|&v| out_of_range(v)));
        assert!(all.iter().any(|&v| v > 0));
        assert!(all.iter().any(|&v| v < 0));
    }

    #[test]
    fn populate_writes_every_row() {
        let mut conn = Connection::open_in_memory().unwrap();
        let params = ValueParams {
            rows: 500,
            ..ValueParams::overflow_heavy()
        };
        let values = populate_values(&mut conn, &params).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM vals", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 500);

        let tenth: i64 = conn
            .query_row("SELECT v FROM vals WHERE id = 10", [], |r| r.get(0))
            .unwrap();
        assert_eq!(tenth, values[9]);
    }
}
