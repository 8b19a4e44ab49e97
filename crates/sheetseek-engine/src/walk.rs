//! Lazy traversal of the sheets a scan covers.
//!
//! [`SheetWalker`] turns a [`ScanTarget`] into a pull-driven sequence of
//! fetched sheet grids. It issues collaborator calls only when asked for the
//! next sheet, checks the cancellation token before every spreadsheet and
//! every sheet, and records failed units as [`ScanIssue`]s instead of
//! failing the whole scan.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use sheetseek_model::Grid;

use crate::cancel::CancellationToken;
use crate::source::{SheetSource, SpreadsheetInfo};

/// What a scan covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// One sheet of one spreadsheet.
    Sheet {
        spreadsheet: SpreadsheetInfo,
        sheet: String,
    },
    /// Every sheet of one spreadsheet.
    Spreadsheet(SpreadsheetInfo),
    /// Every sheet of each listed spreadsheet, in list order.
    Spreadsheets(Vec<SpreadsheetInfo>),
    /// Every spreadsheet the source lists.
    AllSpreadsheets,
}

/// Lifecycle of one scan invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    ResolvingHeader,
    ResolvingColumns,
    Scanning,
    Completed,
    /// Finished, but at least one spreadsheet or sheet was skipped.
    CompletedWithErrors,
    /// The cancellation token was observed.
    Stopped,
}

impl ScanState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanState::Completed | ScanState::CompletedWithErrors | ScanState::Stopped
        )
    }
}

/// A unit of work that was skipped because the source failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScanIssue {
    Listing {
        reason: String,
    },
    Spreadsheet {
        spreadsheet_id: String,
        spreadsheet_name: String,
        reason: String,
    },
    Sheet {
        spreadsheet_id: String,
        spreadsheet_name: String,
        sheet_name: String,
        reason: String,
    },
}

impl ScanIssue {
    pub fn reason(&self) -> &str {
        match self {
            ScanIssue::Listing { reason }
            | ScanIssue::Spreadsheet { reason, .. }
            | ScanIssue::Sheet { reason, .. } => reason,
        }
    }
}

/// Result of a cursor's `try_next`.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T> {
    Item(T),
    /// No more items; carries the terminal state.
    End(ScanState),
}

/// One fetched sheet.
#[derive(Debug)]
pub(crate) struct SheetUnit {
    pub spreadsheet: SpreadsheetInfo,
    pub sheet_name: String,
    pub grid: Grid,
}

#[derive(Debug)]
pub(crate) enum WalkEnd {
    Exhausted,
    Cancelled,
}

/// Spreadsheet waiting to be walked; `sheets` is known up front for
/// single-sheet targets.
#[derive(Debug)]
struct PendingSpreadsheet {
    info: SpreadsheetInfo,
    sheets: Option<Vec<String>>,
}

pub(crate) struct SheetWalker<'a, S: ?Sized> {
    source: &'a S,
    token: CancellationToken,
    target: Option<ScanTarget>,
    queue: VecDeque<PendingSpreadsheet>,
    current: Option<(SpreadsheetInfo, VecDeque<String>)>,
    issues: Vec<ScanIssue>,
}

impl<'a, S: SheetSource + ?Sized> SheetWalker<'a, S> {
    pub fn new(source: &'a S, target: ScanTarget, token: CancellationToken) -> Self {
        Self {
            source,
            token,
            target: Some(target),
            queue: VecDeque::new(),
            current: None,
            issues: Vec::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn issues(&self) -> &[ScanIssue] {
        &self.issues
    }

    /// Terminal state for a walk that ran to the end.
    pub fn completed_state(&self) -> ScanState {
        if self.issues.is_empty() {
            ScanState::Completed
        } else {
            ScanState::CompletedWithErrors
        }
    }

    /// Fetch the next sheet, skipping units the source fails on.
    pub fn next_sheet(&mut self) -> Result<SheetUnit, WalkEnd> {
        if let Some(target) = self.target.take() {
            self.plan(target);
        }

        loop {
            if self.token.is_cancelled() {
                return Err(WalkEnd::Cancelled);
            }

            if let Some((info, sheets)) = self.current.as_mut() {
                let Some(sheet_name) = sheets.pop_front() else {
                    self.current = None;
                    continue;
                };
                let info = info.clone();
                match self.source.sheet_values(&info.id, &sheet_name) {
                    Ok(grid) => {
                        return Ok(SheetUnit {
                            spreadsheet: info,
                            sheet_name,
                            grid,
                        })
                    }
                    Err(err) => {
                        log::warn!(
                            "skipping sheet '{}' of '{}' ({}): {err}",
                            sheet_name,
                            info.name,
                            info.id
                        );
                        self.issues.push(ScanIssue::Sheet {
                            spreadsheet_id: info.id,
                            spreadsheet_name: info.name,
                            sheet_name,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                }
            }

            let Some(pending) = self.queue.pop_front() else {
                return Err(WalkEnd::Exhausted);
            };
            let sheets = match pending.sheets {
                Some(sheets) => sheets,
                None => match self.source.sheet_names(&pending.info.id) {
                    Ok(names) => names,
                    Err(err) => {
                        log::warn!(
                            "skipping spreadsheet '{}' ({}): {err}",
                            pending.info.name,
                            pending.info.id
                        );
                        self.issues.push(ScanIssue::Spreadsheet {
                            spreadsheet_id: pending.info.id,
                            spreadsheet_name: pending.info.name,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                },
            };
            log::debug!(
                "spreadsheet '{}': {} sheet(s) to scan",
                pending.info.name,
                sheets.len()
            );
            self.current = Some((pending.info, sheets.into()));
        }
    }

    fn plan(&mut self, target: ScanTarget) {
        let pending = match target {
            ScanTarget::Sheet { spreadsheet, sheet } => vec![PendingSpreadsheet {
                info: spreadsheet,
                sheets: Some(vec![sheet]),
            }],
            ScanTarget::Spreadsheet(info) => vec![PendingSpreadsheet { info, sheets: None }],
            ScanTarget::Spreadsheets(list) => list
                .into_iter()
                .map(|info| PendingSpreadsheet { info, sheets: None })
                .collect(),
            ScanTarget::AllSpreadsheets => {
                if self.token.is_cancelled() {
                    return;
                }
                match self.source.list_spreadsheets() {
                    Ok(list) => list
                        .into_iter()
                        .map(|info| PendingSpreadsheet { info, sheets: None })
                        .collect(),
                    Err(err) => {
                        log::warn!("listing spreadsheets failed: {err}");
                        self.issues.push(ScanIssue::Listing {
                            reason: err.to_string(),
                        });
                        Vec::new()
                    }
                }
            }
        };
        self.queue = pending.into();
    }
}
