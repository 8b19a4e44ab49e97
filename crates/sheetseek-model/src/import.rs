use std::borrow::Cow;
use std::io::Read;

use csv::ByteRecord;
use encoding_rs::{WINDOWS_1250, WINDOWS_1252};
use thiserror::Error;

use crate::{CellValue, Grid};

#[derive(Clone, Debug)]
pub struct CsvOptions {
    pub delimiter: u8,
    /// How to decode raw CSV bytes into text fields.
    pub encoding: CsvTextEncoding,
    /// Drop empty fields at the end of each row so they read as missing cells,
    /// the way spreadsheet APIs omit trailing blanks.
    pub trim_trailing_empty: bool,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: CsvTextEncoding::Auto,
            trim_trailing_empty: true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CsvTextEncoding {
    /// Attempt to decode as UTF-8; if a field contains invalid UTF-8, fall back to Windows-1250.
    ///
    /// Central European exports (Polish accounting tools in particular) default to CP-1250.
    Auto,
    /// Decode as UTF-8 and reject invalid byte sequences.
    Utf8,
    /// Decode as Windows-1250 (aka CP-1250).
    Windows1250,
    /// Decode as Windows-1252 (aka CP-1252).
    Windows1252,
}

#[derive(Debug, Error)]
pub enum CsvImportError {
    #[error("csv parse error at row {row}, column {column}: {reason}")]
    Parse { row: u64, column: u64, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Read a CSV stream into a [`Grid`] of text cells.
///
/// Rows may have varying field counts. Every field becomes [`CellValue::Text`];
/// trailing empty fields are dropped when [`CsvOptions::trim_trailing_empty`] is set.
pub fn read_csv_grid<R: Read>(reader: R, options: &CsvOptions) -> Result<Grid, CsvImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        // Header rows are content here; header detection happens in the engine.
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    let mut record = ByteRecord::new();
    let mut record_index: u64 = 0;

    loop {
        match csv_reader.read_byte_record(&mut record) {
            Ok(false) => break,
            Ok(true) => {
                record_index += 1;
                let mut row = decode_record(&record, record_index, options.encoding)?;
                if options.trim_trailing_empty {
                    while matches!(row.last(), Some(CellValue::Text(s)) if s.is_empty()) {
                        row.pop();
                    }
                }
                rows.push(row);
            }
            Err(e) => return Err(map_csv_error(e, record_index + 1)),
        }
    }

    Ok(Grid::new(rows))
}

fn decode_record(
    record: &ByteRecord,
    row: u64,
    encoding: CsvTextEncoding,
) -> Result<Vec<CellValue>, CsvImportError> {
    let mut out = Vec::with_capacity(record.len());
    for (idx, field) in record.iter().enumerate() {
        let s = decode_field(field, row, idx as u64 + 1, encoding)?;
        out.push(CellValue::Text(s.into_owned()));
    }
    Ok(out)
}

fn decode_field<'a>(
    field: &'a [u8],
    row: u64,
    column: u64,
    encoding: CsvTextEncoding,
) -> Result<Cow<'a, str>, CsvImportError> {
    // Handle UTF-8 BOM at the start of the file. This commonly appears in Excel-exported CSVs.
    let field = if row == 1 && column == 1 && field.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &field[3..]
    } else {
        field
    };

    match encoding {
        CsvTextEncoding::Utf8 => std::str::from_utf8(field)
            .map(Cow::Borrowed)
            .map_err(|e| CsvImportError::Parse {
                row,
                column,
                reason: format!("invalid UTF-8: {e}"),
            }),
        CsvTextEncoding::Windows1250 => Ok(WINDOWS_1250.decode(field).0),
        CsvTextEncoding::Windows1252 => Ok(WINDOWS_1252.decode(field).0),
        CsvTextEncoding::Auto => match std::str::from_utf8(field) {
            Ok(s) => Ok(Cow::Borrowed(s)),
            Err(_) => Ok(WINDOWS_1250.decode(field).0),
        },
    }
}

fn map_csv_error(err: csv::Error, fallback_row: u64) -> CsvImportError {
    let reason = err.to_string();
    let pos = err.position().cloned();

    match err.into_kind() {
        csv::ErrorKind::Io(e) => CsvImportError::Io(e),
        _ => {
            let row = pos
                .map(|p| p.record())
                .filter(|r| *r > 0)
                .unwrap_or(fallback_row);
            CsvImportError::Parse {
                row,
                column: 0,
                reason,
            }
        }
    }
}
