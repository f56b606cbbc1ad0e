//! Overflow-aware 32-bit column extraction.
//!
//! SQLite stores integers as 64-bit values, but a lot of calling code only
//! wants an `i32`. Reading through `i32` directly either truncates silently or
//! fails, and reading through `i64` everywhere pushes the wider type into code
//! that never needs it. [`FastIntColumn`] returns the narrow value in the
//! common case and reports the rare overflowing value through two caller-owned
//! slots: a flag that is written on every extraction and a wide value that is
//! only written when the flag is raised.
//!
//! ```
//! use std::cell::Cell;
//! use fastint_core::column::FastIntColumn;
//!
//! let flag = Cell::new(false);
//! let wide = Cell::new(0i64);
//! let column = FastIntColumn::new(&flag, &wide);
//!
//! let row: &[i64] = &[7, 5_000_000_000];
//! assert_eq!(column.extract(row, 0).unwrap(), 7);
//! assert!(!flag.get());
//!
//! column.extract(row, 1).unwrap();
//! assert!(flag.get());
//! assert_eq!(wide.get(), 5_000_000_000);
//! ```

use std::cell::Cell;

use rusqlite::types::ValueRef;
use rusqlite::Row;

/// Which 64-bit values count as overflowing when narrowed to `i32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeCheck {
    /// Only values above `i32::MAX` overflow. Values below `i32::MIN` are
    /// narrowed with wrapping and the flag stays clear.
    UpperOnly,
    /// Any value outside `i32::MIN..=i32::MAX` overflows.
    #[default]
    Symmetric,
}

/// Outcome of classifying a 64-bit value against a [`RangeCheck`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Narrowed {
    Fits(i32),
    Overflow(i64),
}

/// Classify `value` without touching any slot.
pub fn classify(value: i64, range: RangeCheck) -> Narrowed {
    match range {
        RangeCheck::UpperOnly if value > i64::from(i32::MAX) => Narrowed::Overflow(value),
        // Wrapping narrow for the lower side.
        RangeCheck::UpperOnly => Narrowed::Fits(value as i32),
        RangeCheck::Symmetric => match i32::try_from(value) {
            Ok(narrow) => Narrowed::Fits(narrow),
            Err(_) => Narrowed::Overflow(value),
        },
    }
}

/// A row-like source that can hand out a column as a 64-bit integer.
pub trait IntColumn {
    fn column_i64(&self, idx: usize) -> rusqlite::Result<i64>;
}

impl IntColumn for Row<'_> {
    fn column_i64(&self, idx: usize) -> rusqlite::Result<i64> {
        Ok(coerce_i64(self.get_ref(idx)?))
    }
}

/// In-memory rows, handy for tests and for feeding already-decoded values.
impl IntColumn for [i64] {
    fn column_i64(&self, idx: usize) -> rusqlite::Result<i64> {
        self.get(idx)
            .copied()
            .ok_or(rusqlite::Error::InvalidColumnIndex(idx))
    }
}

/// Coerce any SQLite value to `i64` the way `sqlite3_column_int64` does.
///
/// REAL truncates toward zero and saturates, NULL is 0. TEXT and BLOB keep
/// only their leading integer: optional whitespace, an optional sign and a
/// run of digits, saturating at the `i64` bounds. Fractions and exponents are
/// ignored, so `'1e3'` reads as 1.
pub fn coerce_i64(value: ValueRef<'_>) -> i64 {
    match value {
        ValueRef::Null => 0,
        ValueRef::Integer(i) => i,
        ValueRef::Real(r) => r as i64,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => parse_integer_prefix(bytes),
    }
}

/// Whitespace as SQLite's `sqlite3Isspace` sees it, vertical tab included.
fn is_sql_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\x0b' | b'\x0c' | b'\r')
}

fn parse_integer_prefix(bytes: &[u8]) -> i64 {
    let mut pos = bytes
        .iter()
        .position(|&b| !is_sql_space(b))
        .unwrap_or(bytes.len());

    let negative = match bytes.get(pos) {
        Some(b'-') => {
            pos += 1;
            true
        }
        Some(b'+') => {
            pos += 1;
            false
        }
        _ => false,
    };

    // Accumulate toward the sign so i64::MIN is reachable.
    let mut value: i64 = 0;
    for &b in bytes[pos..].iter().take_while(|b| b.is_ascii_digit()) {
        let digit = i64::from(b - b'0');
        let next = value.checked_mul(10).and_then(|v| {
            if negative {
                v.checked_sub(digit)
            } else {
                v.checked_add(digit)
            }
        });
        value = match next {
            Some(v) => v,
            None if negative => return i64::MIN,
            None => return i64::MAX,
        };
    }
    value
}

/// Owner for a pair of overflow slots.
#[derive(Debug, Default)]
pub struct OverflowSlots {
    pub flag: Cell<bool>,
    pub value: Cell<i64>,
}

impl OverflowSlots {
    pub fn new() -> Self {
        Self::default()
    }

    /// The preserved wide value if the last extraction overflowed.
    pub fn overflowed(&self) -> Option<i64> {
        self.flag.get().then(|| self.value.get())
    }
}

/// Extractor bound to a flag slot and a wide-value slot.
///
/// Borrows `Cell`s, so it is neither `Send` nor `Sync`: the slots can only
/// ever be written from the thread that owns them.
#[derive(Debug, Clone, Copy)]
pub struct FastIntColumn<'a> {
    flag: &'a Cell<bool>,
    value: &'a Cell<i64>,
    range: RangeCheck,
}

impl<'a> FastIntColumn<'a> {
    pub fn new(flag: &'a Cell<bool>, value: &'a Cell<i64>) -> Self {
        Self {
            flag,
            value,
            range: RangeCheck::default(),
        }
    }

    pub fn with_slots(slots: &'a OverflowSlots) -> Self {
        Self::new(&slots.flag, &slots.value)
    }

    pub fn with_range_check(mut self, range: RangeCheck) -> Self {
        self.range = range;
        self
    }

    pub fn range_check(&self) -> RangeCheck {
        self.range
    }

    /// Point every later extraction at a new pair of slots.
    pub fn configure(&mut self, flag: &'a Cell<bool>, value: &'a Cell<i64>) {
        self.flag = flag;
        self.value = value;
    }

    /// Read column `idx` and narrow it to `i32`.
    ///
    /// When the flag slot reads `true` afterwards, the returned value is a
    /// wrapped truncation and the real value is in the wide slot. Errors come
    /// only from the row itself; no slot is written in that case.
    pub fn extract<R: IntColumn + ?Sized>(&self, row: &R, idx: usize) -> rusqlite::Result<i32> {
        let wide = row.column_i64(idx)?;
        Ok(self.narrow(wide))
    }

    /// Apply the narrowing rule to an already-read value.
    pub fn narrow(&self, wide: i64) -> i32 {
        match classify(wide, self.range) {
            Narrowed::Fits(narrow) => {
                self.flag.set(false);
                narrow
            }
            Narrowed::Overflow(wide) => {
                self.flag.set(true);
                self.value.set(wide);
                wide as i32
            }
        }
    }
}
