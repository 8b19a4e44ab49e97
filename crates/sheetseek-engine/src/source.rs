//! The sheet-data collaborator the engine reads from.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sheetseek_model::{CsvImportError, Grid};
use thiserror::Error;

/// A spreadsheet as listed by a [`SheetSource`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpreadsheetInfo {
    pub id: String,
    pub name: String,
}

impl SpreadsheetInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),
    #[error("sheet '{sheet}' not found in spreadsheet {spreadsheet}")]
    SheetNotFound { spreadsheet: String, sheet: String },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{context}: {source}")]
    Import {
        context: String,
        #[source]
        source: CsvImportError,
    },
    #[error("{0}")]
    Backend(String),
}

/// Read access to a set of spreadsheets, each holding named sheets.
///
/// Calls are synchronous; each one may block on I/O. The engine issues at most
/// one `sheet_values` call per sheet per invocation.
pub trait SheetSource {
    /// Every searchable spreadsheet, in a stable order.
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>, SourceError>;

    /// Sheet (tab) names of one spreadsheet, in display order.
    fn sheet_names(&self, spreadsheet_id: &str) -> Result<Vec<String>, SourceError>;

    /// Full value grid of one sheet, row-major.
    fn sheet_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Grid, SourceError>;
}

impl<T: SheetSource + ?Sized> SheetSource for &T {
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>, SourceError> {
        (**self).list_spreadsheets()
    }

    fn sheet_names(&self, spreadsheet_id: &str) -> Result<Vec<String>, SourceError> {
        (**self).sheet_names(spreadsheet_id)
    }

    fn sheet_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Grid, SourceError> {
        (**self).sheet_values(spreadsheet_id, sheet_name)
    }
}

/// A call made against a [`MemorySource`], recorded in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceCall {
    ListSpreadsheets,
    SheetNames(String),
    SheetValues(String, String),
}

#[derive(Debug, Default)]
struct MemorySpreadsheet {
    info: SpreadsheetInfo,
    sheets: Vec<(String, Grid)>,
    fail_sheet_names: bool,
    failing_sheets: Vec<String>,
}

/// In-memory [`SheetSource`] for embedding callers and tests.
///
/// Individual calls can be made to fail, and every call is recorded.
#[derive(Debug, Default)]
pub struct MemorySource {
    spreadsheets: Vec<MemorySpreadsheet>,
    fail_listing: bool,
    calls: Mutex<Vec<SourceCall>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sheet, creating its spreadsheet on first use. Order is kept.
    pub fn with_sheet(
        mut self,
        spreadsheet: SpreadsheetInfo,
        sheet_name: impl Into<String>,
        grid: Grid,
    ) -> Self {
        self.entry(spreadsheet).sheets.push((sheet_name.into(), grid));
        self
    }

    /// Make `sheet_values` fail for one sheet.
    pub fn fail_sheet(mut self, spreadsheet_id: &str, sheet_name: &str) -> Self {
        if let Some(entry) = self.find_mut(spreadsheet_id) {
            entry.failing_sheets.push(sheet_name.to_string());
        }
        self
    }

    /// Make `sheet_names` fail for one spreadsheet.
    pub fn fail_spreadsheet(mut self, spreadsheet_id: &str) -> Self {
        if let Some(entry) = self.find_mut(spreadsheet_id) {
            entry.fail_sheet_names = true;
        }
        self
    }

    /// Make `list_spreadsheets` fail.
    pub fn fail_listing(mut self) -> Self {
        self.fail_listing = true;
        self
    }

    /// Calls made so far.
    pub fn calls(&self) -> Vec<SourceCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn record(&self, call: SourceCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn entry(&mut self, info: SpreadsheetInfo) -> &mut MemorySpreadsheet {
        let pos = match self.spreadsheets.iter().position(|s| s.info.id == info.id) {
            Some(pos) => pos,
            None => {
                self.spreadsheets.push(MemorySpreadsheet {
                    info,
                    ..MemorySpreadsheet::default()
                });
                self.spreadsheets.len() - 1
            }
        };
        &mut self.spreadsheets[pos]
    }

    fn find(&self, spreadsheet_id: &str) -> Option<&MemorySpreadsheet> {
        self.spreadsheets.iter().find(|s| s.info.id == spreadsheet_id)
    }

    fn find_mut(&mut self, spreadsheet_id: &str) -> Option<&mut MemorySpreadsheet> {
        self.spreadsheets
            .iter_mut()
            .find(|s| s.info.id == spreadsheet_id)
    }
}

impl SheetSource for MemorySource {
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>, SourceError> {
        self.record(SourceCall::ListSpreadsheets);
        if self.fail_listing {
            return Err(SourceError::Backend("listing unavailable".to_string()));
        }
        Ok(self.spreadsheets.iter().map(|s| s.info.clone()).collect())
    }

    fn sheet_names(&self, spreadsheet_id: &str) -> Result<Vec<String>, SourceError> {
        self.record(SourceCall::SheetNames(spreadsheet_id.to_string()));
        let entry = self
            .find(spreadsheet_id)
            .ok_or_else(|| SourceError::SpreadsheetNotFound(spreadsheet_id.to_string()))?;
        if entry.fail_sheet_names {
            return Err(SourceError::Backend(format!(
                "metadata unavailable for {spreadsheet_id}"
            )));
        }
        Ok(entry.sheets.iter().map(|(name, _)| name.clone()).collect())
    }

    fn sheet_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Grid, SourceError> {
        self.record(SourceCall::SheetValues(
            spreadsheet_id.to_string(),
            sheet_name.to_string(),
        ));
        let entry = self
            .find(spreadsheet_id)
            .ok_or_else(|| SourceError::SpreadsheetNotFound(spreadsheet_id.to_string()))?;
        if entry.failing_sheets.iter().any(|s| s == sheet_name) {
            return Err(SourceError::Backend(format!(
                "values unavailable for {spreadsheet_id}/{sheet_name}"
            )));
        }
        entry
            .sheets
            .iter()
            .find(|(name, _)| name == sheet_name)
            .map(|(_, grid)| grid.clone())
            .ok_or_else(|| SourceError::SheetNotFound {
                spreadsheet: spreadsheet_id.to_string(),
                sheet: sheet_name.to_string(),
            })
    }
}
