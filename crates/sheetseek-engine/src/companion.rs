use sheetseek_model::Grid;

use crate::header::ResolvedHeader;
use crate::vocab::Vocabulary;

/// Looks up the "rate" value that accompanies a matched cell.
#[derive(Debug, Clone, Copy)]
pub struct CompanionResolver<'a> {
    rate_column: Option<usize>,
    header: &'a ResolvedHeader,
    vocabulary: &'a Vocabulary,
}

impl<'a> CompanionResolver<'a> {
    pub fn new(
        rate_column: Option<usize>,
        header: &'a ResolvedHeader,
        vocabulary: &'a Vocabulary,
    ) -> Self {
        Self {
            rate_column,
            header,
            vocabulary,
        }
    }

    /// Companion for the match at (`row`, `col`).
    ///
    /// With a rate column this is the row's value there. Without one it is the
    /// right-hand neighbour, unless that neighbour's header is blacklisted
    /// (free-text columns such as notes). Absent cells give `""`.
    pub fn value(&self, grid: &Grid, row: usize, col: usize) -> String {
        if let Some(rate_col) = self.rate_column {
            return grid.cell(row, rate_col).to_text().into_owned();
        }

        let neighbour = col + 1;
        if self
            .vocabulary
            .is_blacklisted_companion(self.header.label(neighbour))
        {
            return String::new();
        }
        grid.cell(row, neighbour).to_text().into_owned()
    }
}
