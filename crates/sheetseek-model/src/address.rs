use core::fmt;

use serde::{Deserialize, Serialize};

/// Highest column reachable with three-letter column names (`ZZZ`).
pub const SHEET_MAX_COLS: u32 = 18_278;

/// A reference to a single cell within a sheet grid.
///
/// Rows and columns are **0-indexed**:
/// - `row = 0` is sheet row `1`
/// - `col = 0` is column `A`
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    /// 0-indexed row.
    pub row: u32,
    /// 0-indexed column.
    pub col: u32,
}

impl CellRef {
    /// Construct a new [`CellRef`].
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Build a reference from grid indices.
    ///
    /// Returns `None` when either index does not fit the addressable range.
    pub fn from_indices(row: usize, col: usize) -> Option<Self> {
        let row = u32::try_from(row).ok()?;
        let col = u32::try_from(col).ok()?;
        if col >= SHEET_MAX_COLS || row == u32::MAX {
            return None;
        }
        Some(Self { row, col })
    }

    /// Convert to A1 notation (e.g. `A1`, `BC32`).
    pub fn to_a1(self) -> String {
        format!("{}{}", column_name(self.col), self.row + 1)
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1())
    }
}

/// Render a 0-based column index as letters (`0` -> `A`, `26` -> `AA`).
pub fn column_name(col: u32) -> String {
    // Column letters are 1-based; we store 0-based internally.
    let mut n = col as u64 + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// Parse column letters (case-insensitive) into a 0-based index.
fn column_index(letters: &str) -> Option<u32> {
    let mut col: u32 = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = (b.to_ascii_uppercase() - b'A') as u32 + 1;
        col = col.checked_mul(26)?.checked_add(v)?;
    }
    if col == 0 || col > SHEET_MAX_COLS {
        return None;
    }
    Some(col - 1)
}

/// Errors produced by [`parse_column_identifier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ColumnIdError {
    #[error("empty column identifier")]
    Empty,
    #[error("column number must be 1 or greater, got {0}")]
    NotPositive(i64),
    #[error("invalid column identifier '{0}' (expected letters like `B` or a 1-based number)")]
    Invalid(String),
}

/// Parse a user-supplied column identifier into a 0-based index.
///
/// Accepts column letters (`B`, `aa`) or a 1-based number (`2`).
pub fn parse_column_identifier(input: &str) -> Result<u32, ColumnIdError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(ColumnIdError::Empty);
    }

    if s.bytes().all(|b| b.is_ascii_alphabetic()) {
        return column_index(s).ok_or_else(|| ColumnIdError::Invalid(s.to_string()));
    }

    match s.parse::<i64>() {
        Ok(n) if n >= 1 => u32::try_from(n - 1)
            .ok()
            .filter(|c| *c < SHEET_MAX_COLS)
            .ok_or_else(|| ColumnIdError::Invalid(s.to_string())),
        Ok(n) => Err(ColumnIdError::NotPositive(n)),
        Err(_) => Err(ColumnIdError::Invalid(s.to_string())),
    }
}
