//! Header-row resolution.
//!
//! A sheet's header is either designated explicitly (one or more rows whose
//! cells are joined per column) or detected heuristically from the first two
//! rows. Either way the result is a [`ResolvedHeader`]: one normalized label
//! per physical column plus the index of the first data row.

use serde::{Deserialize, Serialize};
use sheetseek_model::{column_name, CellValue, Grid};

use crate::normalize::normalize_header_name;

/// Designated header rows, 0-based, sorted and de-duplicated. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<usize>", into = "Vec<usize>")]
pub struct HeaderSpec {
    rows: Vec<usize>,
}

impl Default for HeaderSpec {
    fn default() -> Self {
        Self { rows: vec![0] }
    }
}

impl HeaderSpec {
    /// Build from 0-based row indices; an empty list means the first row.
    pub fn new(rows: impl IntoIterator<Item = usize>) -> Self {
        let mut rows: Vec<usize> = rows.into_iter().collect();
        rows.sort_unstable();
        rows.dedup();
        if rows.is_empty() {
            return Self::default();
        }
        Self { rows }
    }

    /// Parse a comma-separated list of 1-based row numbers (`"1,2"`).
    ///
    /// Tokens that are not positive integers are dropped; if nothing valid
    /// remains the result is the first row.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.split(',')
                .filter_map(|token| token.trim().parse::<i64>().ok())
                .filter(|n| *n >= 1)
                .filter_map(|n| usize::try_from(n - 1).ok()),
        )
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    /// Last designated row; data starts right after it.
    pub fn last_row(&self) -> usize {
        self.rows.last().copied().unwrap_or(0)
    }
}

impl From<Vec<usize>> for HeaderSpec {
    fn from(rows: Vec<usize>) -> Self {
        Self::new(rows)
    }
}

impl From<HeaderSpec> for Vec<usize> {
    fn from(spec: HeaderSpec) -> Self {
        spec.rows
    }
}

/// Where a [`ResolvedHeader`] came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderOrigin {
    /// Rows designated by a [`HeaderSpec`].
    Explicit(HeaderSpec),
    /// A single row picked by [`HeaderDetector`].
    Detected(usize),
    /// No header; every row is data.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedHeader {
    labels: Vec<String>,
    data_start: usize,
    origin: HeaderOrigin,
}

impl ResolvedHeader {
    /// Combine the designated rows of `grid` column by column.
    pub fn from_spec(grid: &Grid, spec: &HeaderSpec) -> Self {
        Self {
            labels: combine_header_rows(grid, spec.rows()),
            data_start: spec.last_row().saturating_add(1),
            origin: HeaderOrigin::Explicit(spec.clone()),
        }
    }

    fn detected(grid: &Grid, row: usize) -> Self {
        Self {
            labels: combine_header_rows(grid, &[row]),
            data_start: row + 1,
            origin: HeaderOrigin::Detected(row),
        }
    }

    /// Header-less resolution: every row is data.
    pub fn none() -> Self {
        Self {
            labels: Vec::new(),
            data_start: 0,
            origin: HeaderOrigin::None,
        }
    }

    /// Normalized labels, one per physical column of the header.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Label of column `col`; `""` beyond the header's width.
    pub fn label(&self, col: usize) -> &str {
        self.labels.get(col).map(String::as_str).unwrap_or("")
    }

    /// Label for display: the header label, or `Column C` when there is none.
    pub fn display_label(&self, col: usize) -> String {
        match self.label(col) {
            "" => format!("Column {}", column_letter(col)),
            label => label.to_string(),
        }
    }

    /// 0-based index of the first data row.
    pub fn data_start(&self) -> usize {
        self.data_start
    }

    pub fn origin(&self) -> &HeaderOrigin {
        &self.origin
    }

    pub fn has_header(&self) -> bool {
        !matches!(self.origin, HeaderOrigin::None)
    }
}

pub(crate) fn column_letter(col: usize) -> String {
    column_name(u32::try_from(col).unwrap_or(u32::MAX))
}

/// Join the non-blank cells of each designated row per column, then normalize.
///
/// The result is as wide as the widest designated row; rows outside the grid
/// contribute nothing.
pub fn combine_header_rows(grid: &Grid, rows: &[usize]) -> Vec<String> {
    let width = rows
        .iter()
        .filter_map(|r| grid.row(*r))
        .map(<[CellValue]>::len)
        .max()
        .unwrap_or(0);

    (0..width)
        .map(|col| {
            let parts: Vec<String> = rows
                .iter()
                .map(|r| grid.cell(*r, col).to_text())
                .filter(|text| !text.trim().is_empty())
                .map(|text| text.into_owned())
                .collect();
            normalize_header_name(&parts.join(" "))
        })
        .collect()
}

/// Heuristic header-row detection over the first two rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderDetector {
    /// Minimum number of cells containing a letter for a row to count as a header.
    pub min_label_cells: usize,
}

impl Default for HeaderDetector {
    fn default() -> Self {
        Self { min_label_cells: 2 }
    }
}

impl HeaderDetector {
    pub fn looks_like_header(&self, row: &[CellValue]) -> bool {
        let label_cells = row
            .iter()
            .filter(|cell| cell.to_text().trim().chars().any(char::is_alphabetic))
            .count();
        label_cells >= self.min_label_cells.max(1)
    }

    /// Pick the header row of `grid`.
    ///
    /// `has_target` tells whether a candidate row's normalized labels contain
    /// the column the caller is after. Row 0 wins only when it has the target;
    /// otherwise a header-like row 1 is taken even without it, so a title row
    /// above the real header is never scanned as data. A header-like row 0
    /// without the target is the last resort before header-less mode.
    pub fn detect<F>(&self, grid: &Grid, has_target: F) -> ResolvedHeader
    where
        F: Fn(&[String]) -> bool,
    {
        let row0 = grid.row(0).filter(|row| self.looks_like_header(row));
        let row1 = grid.row(1).filter(|row| self.looks_like_header(row));

        if row0.is_some() {
            let candidate = ResolvedHeader::detected(grid, 0);
            if has_target(candidate.labels()) {
                return candidate;
            }
        }
        if row1.is_some() {
            return ResolvedHeader::detected(grid, 1);
        }
        if row0.is_some() {
            return ResolvedHeader::detected(grid, 0);
        }
        ResolvedHeader::none()
    }
}
