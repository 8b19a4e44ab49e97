use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw value of a single grid cell as delivered by a sheet collaborator.
///
/// Spreadsheet backends hand back heterogeneous cells; everything the engine
/// needs to compare goes through [`CellValue::to_text`] so there is exactly one
/// stringification rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Absent cell (past the end of a ragged row, or an explicit null).
    #[default]
    Missing,
    /// IEEE-754 double precision number.
    Number(f64),
    /// Plain text, exactly as the backend rendered it.
    Text(String),
}

impl CellValue {
    /// Stringify the cell.
    ///
    /// `Missing` becomes `""`; numbers use the shortest round-trip form, so an
    /// integral `38960.0` renders as `38960`.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            CellValue::Missing => Cow::Borrowed(""),
            CellValue::Number(n) => Cow::Owned(format_number(*n)),
            CellValue::Text(s) => Cow::Borrowed(s.as_str()),
        }
    }
}

fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid rendering negative zero as `-0`.
        return "0".to_string();
    }
    format!("{n}")
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(value as f64)
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Missing)
    }
}
