//! `sheetseek-model` defines the data handed between sheet collaborators and
//! the search engine: cell values, ragged grids, A1 cell references and column
//! identifiers, plus CSV import into a grid.

mod address;
mod grid;
pub mod import;
mod value;

pub use address::{column_name, parse_column_identifier, CellRef, ColumnIdError, SHEET_MAX_COLS};
pub use grid::Grid;
pub use import::{read_csv_grid, CsvImportError, CsvOptions, CsvTextEncoding};
pub use value::CellValue;
