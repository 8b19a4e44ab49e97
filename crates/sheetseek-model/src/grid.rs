use serde::{Deserialize, Serialize};

use crate::CellValue;

static MISSING: CellValue = CellValue::Missing;

/// Row-major 2-D block of cell values for one sheet.
///
/// Rows may be ragged: backends omit trailing empty cells, and every read past
/// the end of a row yields [`CellValue::Missing`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    /// Build a grid from anything convertible into cell values.
    ///
    /// ```
    /// use sheetseek_model::{CellValue, Grid};
    ///
    /// let grid = Grid::from_rows(vec![vec!["Zlecenie", "Stawka"], vec!["38960"]]);
    /// assert_eq!(grid.width(), 2);
    /// assert_eq!(grid.cell(1, 1), &CellValue::Missing);
    /// ```
    pub fn from_rows<R, T>(rows: impl IntoIterator<Item = R>) -> Self
    where
        R: IntoIterator<Item = T>,
        T: Into<CellValue>,
    {
        Self {
            rows: rows
                .into_iter()
                .map(|row| row.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn row(&self, idx: usize) -> Option<&[CellValue]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Bounds-checked cell access; anything outside the grid is missing.
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&MISSING)
    }
}

impl From<Vec<Vec<CellValue>>> for Grid {
    fn from(rows: Vec<Vec<CellValue>>) -> Self {
        Self::new(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ragged_rows_read_as_missing() {
        let grid = Grid::from_rows(vec![vec!["a", "b", "c"], vec!["d"]]);
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(1, 0), &CellValue::from("d"));
        assert_eq!(grid.cell(1, 2), &CellValue::Missing);
        assert_eq!(grid.cell(9, 9), &CellValue::Missing);
        assert_eq!(grid.row(1), Some(&[CellValue::from("d")][..]));
        assert!(grid.row(2).is_none());
    }

    #[test]
    fn empty_grid() {
        let grid = Grid::default();
        assert!(grid.is_empty());
        assert_eq!(grid.width(), 0);
    }
}
