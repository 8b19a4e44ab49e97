//! Column-resolution and cell-matching search engine.
//!
//! The engine reads sheet grids through a [`SheetSource`] and answers three
//! kinds of questions about them:
//!
//! - [`search`]: which cells match a query, as a lazy [`SearchCursor`] of
//!   [`MatchRecord`]s enriched with a companion ("rate") value;
//! - [`find_duplicates`]: which values repeat within a column, as a lazy
//!   [`DuplicateCursor`] of [`DuplicateGroup`]s;
//! - [`check_values`]: which values of a list occur in a spreadsheet, and where.
//!
//! All three resolve a header per sheet ([`HeaderSpec`] or [`HeaderDetector`]),
//! map a [`ColumnQuery`] onto physical columns while honoring [`IgnoreRules`],
//! and compare values through the [`normalize`] helpers. Collaborator failures
//! skip the affected unit and are reported as [`ScanIssue`]s; a
//! [`CancellationToken`] stops a scan between units.

mod cancel;
mod checklist;
mod columns;
mod companion;
mod duplicates;
mod header;
mod ignore;
pub mod normalize;
mod pattern;
mod scan;
pub mod source;
mod vocab;
mod walk;

pub use cancel::CancellationToken;
pub use checklist::{
    check_values, CheckMode, ChecklistEntry, ChecklistHit, ChecklistOptions, ChecklistReport,
};
pub use columns::{find_all_column_indices_by_name, ColumnQuery, ColumnResolver};
pub use companion::CompanionResolver;
pub use duplicates::{find_duplicates, DuplicateCursor, DuplicateGroup, DuplicateOptions};
pub use header::{combine_header_rows, HeaderDetector, HeaderOrigin, HeaderSpec, ResolvedHeader};
pub use ignore::IgnoreRules;
pub use pattern::QueryMatcher;
pub use scan::{search, MatchRecord, SearchCursor, SearchOptions};
pub use source::{MemorySource, SheetSource, SourceError, SpreadsheetInfo};
pub use vocab::Vocabulary;
pub use walk::{ScanIssue, ScanState, ScanTarget, Step};

pub use sheetseek_model::{parse_column_identifier, CellRef, CellValue, Grid};
