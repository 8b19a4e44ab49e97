//! Repeated values within a column.

use std::collections::{HashMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;
use crate::columns::{ColumnQuery, ColumnResolver};
use crate::header::{column_letter, HeaderDetector, HeaderSpec, ResolvedHeader};
use crate::ignore::IgnoreRules;
use crate::normalize::comparison_key;
use crate::source::SheetSource;
use crate::vocab::Vocabulary;
use crate::walk::{ScanIssue, ScanState, ScanTarget, SheetUnit, SheetWalker, Step, WalkEnd};

const MAX_SAMPLES: usize = 5;

#[derive(Debug, Clone)]
pub struct DuplicateOptions {
    /// Compare by [`comparison_key`] rather than by trimmed text.
    pub normalize: bool,
    pub ignore: IgnoreRules,
    pub header_rows: Option<HeaderSpec>,
    pub vocabulary: Vocabulary,
    pub detector: HeaderDetector,
}

impl Default for DuplicateOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            ignore: IgnoreRules::default(),
            header_rows: None,
            vocabulary: Vocabulary::default(),
            detector: HeaderDetector::default(),
        }
    }
}

/// Rows of one physical column that share a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateGroup {
    pub spreadsheet_id: String,
    pub spreadsheet_name: String,
    pub sheet_name: String,
    pub column_label: String,
    pub normalized_value: String,
    /// First occurrence, trimmed.
    pub display_value: String,
    /// 1-based sheet row numbers, ascending.
    pub row_numbers: Vec<usize>,
    /// Up to five raw values in row order.
    pub sample_raw_values: Vec<String>,
}

impl DuplicateGroup {
    pub fn count(&self) -> usize {
        self.row_numbers.len()
    }
}

/// Start a duplicate scan. Nothing is fetched until the cursor is first pulled.
pub fn find_duplicates<'a, S>(
    source: &'a S,
    target: ScanTarget,
    column: ColumnQuery,
    options: DuplicateOptions,
    token: CancellationToken,
) -> DuplicateCursor<'a, S>
where
    S: SheetSource + ?Sized,
{
    DuplicateCursor {
        walker: SheetWalker::new(source, target, token),
        column,
        options,
        pending: VecDeque::new(),
        state: ScanState::Idle,
    }
}

/// Lazy, cancellable stream of [`DuplicateGroup`]s.
///
/// Each sheet is grouped in full before its first group is yielded; a sheet
/// interrupted by cancellation yields nothing.
pub struct DuplicateCursor<'a, S: ?Sized> {
    walker: SheetWalker<'a, S>,
    column: ColumnQuery,
    options: DuplicateOptions,
    pending: VecDeque<DuplicateGroup>,
    state: ScanState,
}

impl<'a, S: SheetSource + ?Sized> DuplicateCursor<'a, S> {
    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn issues(&self) -> &[ScanIssue] {
        self.walker.issues()
    }

    pub fn try_next(&mut self) -> Step<DuplicateGroup> {
        match self.pull() {
            Some(group) => Step::Item(group),
            None => Step::End(self.state),
        }
    }

    fn pull(&mut self) -> Option<DuplicateGroup> {
        loop {
            if self.state.is_terminal() {
                return None;
            }
            if self.walker.is_cancelled() {
                self.stop();
                return None;
            }
            if let Some(group) = self.pending.pop_front() {
                return Some(group);
            }

            match self.walker.next_sheet() {
                Ok(unit) => match self.group_sheet(unit) {
                    Some(groups) => self.pending = groups.into(),
                    None => {
                        self.stop();
                        return None;
                    }
                },
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

    fn stop(&mut self) {
        self.pending.clear();
        self.state = ScanState::Stopped;
    }

    /// Groups of one sheet, or `None` when cancelled part-way.
    fn group_sheet(&mut self, unit: SheetUnit) -> Option<Vec<DuplicateGroup>> {
        let options = &self.options;
        let grid = &unit.grid;

        self.state = ScanState::ResolvingHeader;
        let header = match &options.header_rows {
            Some(spec) => ResolvedHeader::from_spec(grid, spec),
            None => options.detector.detect(grid, |labels| {
                self.column.header_has_target(labels, &options.vocabulary)
            }),
        };

        self.state = ScanState::ResolvingColumns;
        let columns = ColumnResolver::new(&options.vocabulary, &options.ignore).resolve(
            &header,
            &self.column,
            grid.width(),
        );
        log::debug!(
            "'{}'/'{}': grouping columns {:?}",
            unit.spreadsheet.name,
            unit.sheet_name,
            columns
        );

        self.state = ScanState::Scanning;
        let mut groups = Vec::new();
        for &col in &columns {
            let mut buckets: Vec<Bucket> = Vec::new();
            let mut by_key: HashMap<String, usize> = HashMap::new();

            for row in header.data_start()..grid.row_count() {
                if self.walker.is_cancelled() {
                    log::debug!("duplicate scan cancelled in '{}'", unit.sheet_name);
                    return None;
                }
                let raw = grid.cell(row, col).to_text();
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let key = if options.normalize {
                    comparison_key(trimmed)
                } else {
                    trimmed.to_string()
                };
                if key.is_empty() {
                    continue;
                }

                let idx = *by_key.entry(key.clone()).or_insert_with(|| {
                    buckets.push(Bucket::new(key));
                    buckets.len() - 1
                });
                buckets[idx].push(row + 1, &raw);
            }

            let label = column_label(&header, &columns, col);
            groups.extend(
                buckets
                    .into_iter()
                    .filter(|bucket| bucket.rows.len() > 1)
                    .map(|bucket| DuplicateGroup {
                        spreadsheet_id: unit.spreadsheet.id.clone(),
                        spreadsheet_name: unit.spreadsheet.name.clone(),
                        sheet_name: unit.sheet_name.clone(),
                        column_label: label.clone(),
                        display_value: bucket
                            .samples
                            .first()
                            .map(|s| s.trim().to_string())
                            .unwrap_or_default(),
                        normalized_value: bucket.key,
                        row_numbers: bucket.rows,
                        sample_raw_values: bucket.samples,
                    }),
            );
        }
        Some(groups)
    }
}

impl<'a, S: SheetSource + ?Sized> Iterator for DuplicateCursor<'a, S> {
    type Item = DuplicateGroup;

    fn next(&mut self) -> Option<Self::Item> {
        self.pull()
    }
}

struct Bucket {
    key: String,
    rows: Vec<usize>,
    samples: Vec<String>,
}

impl Bucket {
    fn new(key: String) -> Self {
        Self {
            key,
            rows: Vec::new(),
            samples: Vec::new(),
        }
    }

    fn push(&mut self, row_number: usize, raw: &str) {
        self.rows.push(row_number);
        if self.samples.len() < MAX_SAMPLES {
            self.samples.push(raw.to_string());
        }
    }
}

/// Header label of `col`, suffixed with its letter when another resolved
/// column carries the same label.
fn column_label(header: &ResolvedHeader, columns: &[usize], col: usize) -> String {
    let label = header.display_label(col);
    if !header.has_header() || header.label(col).is_empty() {
        return label;
    }
    let shared = columns
        .iter()
        .filter(|other| header.label(**other) == header.label(col))
        .count();
    if shared > 1 {
        format!("{label} ({})", column_letter(col))
    } else {
        label
    }
}
