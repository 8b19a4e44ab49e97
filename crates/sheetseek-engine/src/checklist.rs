//! Found/missing report for a list of values, e.g. order numbers exported
//! from an accounting system, checked against one spreadsheet.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sheetseek_model::{CellRef, Grid};

use crate::cancel::CancellationToken;
use crate::columns::find_all_column_indices_by_name;
use crate::header::{HeaderSpec, ResolvedHeader};
use crate::ignore::IgnoreRules;
use crate::normalize::comparison_key;
use crate::source::{SheetSource, SpreadsheetInfo};
use crate::walk::{ScanIssue, ScanState};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckMode {
    /// Comparison keys are equal.
    #[default]
    Exact,
    /// Either comparison key contains the other.
    Substring,
}

#[derive(Debug, Clone, Default)]
pub struct ChecklistOptions {
    pub mode: CheckMode,
    /// Sheets to search; empty means every sheet.
    pub sheets: Vec<String>,
    /// Column names to search; empty means every column.
    pub columns: Vec<String>,
    pub header_rows: HeaderSpec,
}

/// Where a value was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistHit {
    pub sheet_name: String,
    pub cell: CellRef,
    pub column_label: String,
    pub matched_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistEntry {
    pub value: String,
    pub hit: Option<ChecklistHit>,
}

impl ChecklistEntry {
    pub fn is_found(&self) -> bool {
        self.hit.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistReport {
    pub spreadsheet: SpreadsheetInfo,
    /// One entry per input value, in input order.
    pub entries: Vec<ChecklistEntry>,
    pub state: ScanState,
    pub issues: Vec<ScanIssue>,
}

impl ChecklistReport {
    pub fn found(&self) -> usize {
        self.entries.iter().filter(|e| e.is_found()).count()
    }

    pub fn missing(&self) -> usize {
        self.entries.len() - self.found()
    }
}

struct IndexedCell {
    row: usize,
    col: usize,
    key: String,
}

struct IndexedSheet {
    name: String,
    grid: Grid,
    header: ResolvedHeader,
    cells: Vec<IndexedCell>,
    /// First cell per key, for exact lookups.
    first_by_key: HashMap<String, usize>,
}

impl IndexedSheet {
    fn find(&self, key: &str, mode: CheckMode) -> Option<&IndexedCell> {
        match mode {
            CheckMode::Exact => self.first_by_key.get(key).map(|idx| &self.cells[*idx]),
            CheckMode::Substring => self
                .cells
                .iter()
                .find(|cell| cell.key.contains(key) || key.contains(cell.key.as_str())),
        }
    }

    fn hit(&self, cell: &IndexedCell) -> Option<ChecklistHit> {
        Some(ChecklistHit {
            sheet_name: self.name.clone(),
            cell: CellRef::from_indices(cell.row, cell.col)?,
            column_label: self.header.display_label(cell.col),
            matched_value: self.grid.cell(cell.row, cell.col).to_text().into_owned(),
        })
    }
}

/// Look up every value of `values` in `spreadsheet`.
///
/// Each selected sheet is fetched once. A value's hit is its first match in
/// sheet order, then row order, then column order. Sheets that fail to load
/// are recorded as issues and searched as empty.
pub fn check_values<S>(
    source: &S,
    spreadsheet: &SpreadsheetInfo,
    values: &[String],
    options: &ChecklistOptions,
    token: &CancellationToken,
) -> ChecklistReport
where
    S: SheetSource + ?Sized,
{
    let mut report = ChecklistReport {
        spreadsheet: spreadsheet.clone(),
        entries: values
            .iter()
            .map(|value| ChecklistEntry {
                value: value.clone(),
                hit: None,
            })
            .collect(),
        state: ScanState::Completed,
        issues: Vec::new(),
    };

    let names = match source.sheet_names(&spreadsheet.id) {
        Ok(names) => names,
        Err(err) => {
            log::warn!("cannot list sheets of '{}': {err}", spreadsheet.name);
            report.issues.push(ScanIssue::Spreadsheet {
                spreadsheet_id: spreadsheet.id.clone(),
                spreadsheet_name: spreadsheet.name.clone(),
                reason: err.to_string(),
            });
            report.state = ScanState::CompletedWithErrors;
            return report;
        }
    };
    let selected: Vec<String> = names
        .into_iter()
        .filter(|name| options.sheets.is_empty() || options.sheets.iter().any(|s| s == name))
        .collect();

    let mut sheets = Vec::with_capacity(selected.len());
    for name in selected {
        if token.is_cancelled() {
            report.state = ScanState::Stopped;
            return report;
        }
        let grid = match source.sheet_values(&spreadsheet.id, &name) {
            Ok(grid) => grid,
            Err(err) => {
                log::warn!("sheet '{name}' treated as empty: {err}");
                report.issues.push(ScanIssue::Sheet {
                    spreadsheet_id: spreadsheet.id.clone(),
                    spreadsheet_name: spreadsheet.name.clone(),
                    sheet_name: name.clone(),
                    reason: err.to_string(),
                });
                Grid::default()
            }
        };
        match index_sheet(name, grid, options, token) {
            Some(sheet) => sheets.push(sheet),
            None => {
                report.state = ScanState::Stopped;
                return report;
            }
        }
    }
    log::debug!(
        "checking {} value(s) against {} sheet(s)",
        values.len(),
        sheets.len()
    );

    for entry in &mut report.entries {
        let key = comparison_key(&entry.value);
        if key.is_empty() {
            continue;
        }
        entry.hit = sheets
            .iter()
            .find_map(|sheet| sheet.find(&key, options.mode).and_then(|c| sheet.hit(c)));
    }

    if !report.issues.is_empty() {
        report.state = ScanState::CompletedWithErrors;
    }
    log::debug!(
        "checklist: {} found, {} missing",
        report.found(),
        report.missing()
    );
    report
}

fn index_sheet(
    name: String,
    grid: Grid,
    options: &ChecklistOptions,
    token: &CancellationToken,
) -> Option<IndexedSheet> {
    let header = ResolvedHeader::from_spec(&grid, &options.header_rows);
    let columns: Vec<usize> = if options.columns.is_empty() {
        (0..grid.width().max(header.labels().len())).collect()
    } else {
        let none = IgnoreRules::default();
        let mut cols: Vec<usize> = options
            .columns
            .iter()
            .flat_map(|column| find_all_column_indices_by_name(header.labels(), column, &none))
            .collect();
        cols.sort_unstable();
        cols.dedup();
        cols
    };

    let mut cells = Vec::new();
    let mut first_by_key = HashMap::new();
    for row in header.data_start()..grid.row_count() {
        if token.is_cancelled() {
            return None;
        }
        for &col in &columns {
            let key = comparison_key(&grid.cell(row, col).to_text());
            if key.is_empty() {
                continue;
            }
            first_by_key.entry(key.clone()).or_insert(cells.len());
            cells.push(IndexedCell { row, col, key });
        }
    }

    Some(IndexedSheet {
        name,
        grid,
        header,
        cells,
        first_by_key,
    })
}
