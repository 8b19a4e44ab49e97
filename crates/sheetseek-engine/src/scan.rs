//! Query search over one sheet, one spreadsheet or many spreadsheets.

use serde::{Deserialize, Serialize};
use sheetseek_model::{CellRef, Grid};

use crate::cancel::CancellationToken;
use crate::columns::{ColumnQuery, ColumnResolver};
use crate::companion::CompanionResolver;
use crate::header::{HeaderDetector, HeaderSpec, ResolvedHeader};
use crate::ignore::IgnoreRules;
use crate::pattern::QueryMatcher;
use crate::source::{SheetSource, SpreadsheetInfo};
use crate::vocab::Vocabulary;
use crate::walk::{ScanIssue, ScanState, ScanTarget, SheetUnit, SheetWalker, Step, WalkEnd};

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Treat the query as a regular expression.
    pub regex: bool,
    pub case_sensitive: bool,
    pub column: ColumnQuery,
    /// Columns whose header matches are skipped; matched values that match
    /// are dropped when `ignore_matched_values` is set.
    pub ignore: IgnoreRules,
    /// Explicit header rows; `None` detects the header per sheet.
    pub header_rows: Option<HeaderSpec>,
    pub ignore_matched_values: bool,
    /// Stop after this many records.
    pub max_results: Option<usize>,
    pub vocabulary: Vocabulary,
    pub detector: HeaderDetector,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            regex: false,
            case_sensitive: false,
            column: ColumnQuery::default(),
            ignore: IgnoreRules::default(),
            header_rows: None,
            ignore_matched_values: true,
            max_results: None,
            vocabulary: Vocabulary::default(),
            detector: HeaderDetector::default(),
        }
    }
}

/// One matching cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub spreadsheet_id: String,
    pub spreadsheet_name: String,
    pub sheet_name: String,
    pub cell: CellRef,
    pub column_label: String,
    pub matched_value: String,
    /// Value of the related "rate" column, `""` when there is none.
    pub companion_value: String,
}

impl MatchRecord {
    /// A1 address of the matching cell.
    pub fn cell_address(&self) -> String {
        self.cell.to_a1()
    }
}

/// Start a search. Nothing is fetched until the cursor is first pulled.
pub fn search<'a, S>(
    source: &'a S,
    target: ScanTarget,
    query: &str,
    options: SearchOptions,
    token: CancellationToken,
) -> SearchCursor<'a, S>
where
    S: SheetSource + ?Sized,
{
    let matcher = QueryMatcher::new(query, options.regex, options.case_sensitive);
    SearchCursor {
        walker: SheetWalker::new(source, target, token),
        matcher,
        options,
        active: None,
        state: ScanState::Idle,
        emitted: 0,
    }
}

struct ActiveSheet {
    spreadsheet: SpreadsheetInfo,
    sheet_name: String,
    grid: Grid,
    header: ResolvedHeader,
    columns: Vec<usize>,
    rate_column: Option<usize>,
    row: usize,
    next_col: usize,
}

enum SheetStep {
    Record(MatchRecord),
    Cancelled,
    Exhausted,
}

/// Lazy, cancellable stream of [`MatchRecord`]s.
///
/// Records come in sheet order, then row order, then ascending column.
/// Each pull fetches at most one sheet.
pub struct SearchCursor<'a, S: ?Sized> {
    walker: SheetWalker<'a, S>,
    matcher: QueryMatcher,
    options: SearchOptions,
    active: Option<ActiveSheet>,
    state: ScanState,
    emitted: usize,
}

impl<'a, S: SheetSource + ?Sized> SearchCursor<'a, S> {
    pub fn state(&self) -> ScanState {
        self.state
    }

    /// Units skipped so far because the source failed.
    pub fn issues(&self) -> &[ScanIssue] {
        self.walker.issues()
    }

    /// Next record, or the terminal state once the scan is over.
    pub fn try_next(&mut self) -> Step<MatchRecord> {
        match self.pull() {
            Some(record) => Step::Item(record),
            None => Step::End(self.state),
        }
    }

    fn pull(&mut self) -> Option<MatchRecord> {
        if self.state.is_terminal() {
            return None;
        }
        if self.walker.is_cancelled() {
            self.stop();
            return None;
        }
        if self.limit_reached() {
            self.active = None;
            self.state = self.walker.completed_state();
            return None;
        }

        loop {
            if let Some(active) = self.active.as_mut() {
                match scan_sheet(active, &self.matcher, &self.options, &self.walker) {
                    SheetStep::Record(record) => {
                        self.emitted += 1;
                        if self.limit_reached() {
                            log::debug!("result limit of {} reached", self.emitted);
                            self.active = None;
                            self.state = self.walker.completed_state();
                        }
                        return Some(record);
                    }
                    SheetStep::Cancelled => {
                        self.stop();
                        return None;
                    }
                    SheetStep::Exhausted => self.active = None,
                }
            }

            match self.walker.next_sheet() {
                Ok(unit) => self.active = self.prepare(unit),
                Err(WalkEnd::Cancelled) => {
                    self.stop();
                    return None;
                }
                Err(WalkEnd::Exhausted) => {
                    self.state = self.walker.completed_state();
                    return None;
                }
            }
        }
    }

    fn limit_reached(&self) -> bool {
        self.options
            .max_results
            .is_some_and(|max| self.emitted >= max)
    }

    fn stop(&mut self) {
        log::debug!("search cancelled after {} record(s)", self.emitted);
        self.active = None;
        self.state = ScanState::Stopped;
    }

    /// Resolve header and columns; `None` when the sheet has nothing to scan.
    fn prepare(&mut self, unit: SheetUnit) -> Option<ActiveSheet> {
        let SheetUnit {
            spreadsheet,
            sheet_name,
            grid,
        } = unit;
        let options = &self.options;

        self.state = ScanState::ResolvingHeader;
        let header = match &options.header_rows {
            Some(spec) => ResolvedHeader::from_spec(&grid, spec),
            None => options.detector.detect(&grid, |labels| {
                options.column.header_has_target(labels, &options.vocabulary)
            }),
        };

        self.state = ScanState::ResolvingColumns;
        let resolver = ColumnResolver::new(&options.vocabulary, &options.ignore);
        let columns = resolver.resolve(&header, &options.column, grid.width());
        log::debug!(
            "'{}'/'{}': header {:?}, columns {:?}",
            spreadsheet.name,
            sheet_name,
            header.origin(),
            columns
        );
        if columns.is_empty() {
            log::debug!(
                "'{}'/'{}': no column matches {:?}, skipping",
                spreadsheet.name,
                sheet_name,
                options.column
            );
            return None;
        }
        let rate_column = resolver.rate_column(&header, None);

        self.state = ScanState::Scanning;
        Some(ActiveSheet {
            spreadsheet,
            sheet_name,
            row: header.data_start(),
            grid,
            header,
            columns,
            rate_column,
            next_col: 0,
        })
    }
}

fn scan_sheet<S: SheetSource + ?Sized>(
    active: &mut ActiveSheet,
    matcher: &QueryMatcher,
    options: &SearchOptions,
    walker: &SheetWalker<'_, S>,
) -> SheetStep {
    while active.row < active.grid.row_count() {
        if active.next_col == 0 && walker.is_cancelled() {
            return SheetStep::Cancelled;
        }
        let row = active.row;

        while let Some(&col) = active.columns.get(active.next_col) {
            active.next_col += 1;

            let text = active.grid.cell(row, col).to_text();
            if text.trim().is_empty() || !matcher.is_match(&text) {
                continue;
            }
            if options.ignore_matched_values && options.ignore.matches_value(&text) {
                log::trace!("row {}: value {text:?} matches an ignore rule", row + 1);
                continue;
            }
            let Some(cell) = CellRef::from_indices(row, col) else {
                log::warn!(
                    "'{}': cell at row {row}, column {col} is outside the addressable range",
                    active.sheet_name
                );
                continue;
            };

            let companion = CompanionResolver::new(
                active.rate_column,
                &active.header,
                &options.vocabulary,
            )
            .value(&active.grid, row, col);

            return SheetStep::Record(MatchRecord {
                spreadsheet_id: active.spreadsheet.id.clone(),
                spreadsheet_name: active.spreadsheet.name.clone(),
                sheet_name: active.sheet_name.clone(),
                cell,
                column_label: active.header.display_label(col),
                matched_value: text.into_owned(),
                companion_value: companion,
            });
        }

        active.row += 1;
        active.next_col = 0;
    }
    SheetStep::Exhausted
}

impl<'a, S: SheetSource + ?Sized> Iterator for SearchCursor<'a, S> {
    type Item = MatchRecord;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull()
    }
}
