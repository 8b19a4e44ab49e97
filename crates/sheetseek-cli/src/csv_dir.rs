//! A directory of CSV files exposed as a [`SheetSource`].
//!
//! Layout under the root:
//! - every sub-directory is a spreadsheet (id and name = directory name) whose
//!   `*.csv` files are its sheets (name = file stem);
//! - every top-level `*.csv` file is a single-sheet spreadsheet (id = file
//!   name, name and sheet = file stem).
//!
//! Listings are sorted by name.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use sheetseek_engine::{SheetSource, SourceError, SpreadsheetInfo};
use sheetseek_model::{read_csv_grid, CsvOptions, Grid};

#[derive(Debug, Clone)]
pub struct CsvDirSource {
    root: PathBuf,
    options: CsvOptions,
}

impl CsvDirSource {
    /// Open `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>, options: CsvOptions) -> anyhow::Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            anyhow::bail!("spreadsheet root {} is not a directory", root.display());
        }
        Ok(Self { root, options })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn sheet_path(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<PathBuf, SourceError> {
        let path = self.root.join(spreadsheet_id);
        if path.is_dir() {
            let sheet = path.join(format!("{sheet_name}.csv"));
            if sheet.is_file() {
                return Ok(sheet);
            }
        } else if is_csv(&path) && file_stem(&path).as_deref() == Some(sheet_name) {
            return Ok(path);
        }
        Err(SourceError::SheetNotFound {
            spreadsheet: spreadsheet_id.to_string(),
            sheet: sheet_name.to_string(),
        })
    }
}

fn is_csv(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
    let entries = fs::read_dir(dir).map_err(|source| SourceError::Io {
        context: format!("read directory {}", dir.display()),
        source,
    })?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SourceError::Io {
            context: format!("read directory {}", dir.display()),
            source,
        })?;
        paths.push(entry.path());
    }
    paths.sort();
    Ok(paths)
}

impl SheetSource for CsvDirSource {
    fn list_spreadsheets(&self) -> Result<Vec<SpreadsheetInfo>, SourceError> {
        let mut spreadsheets = Vec::new();
        for path in read_dir_sorted(&self.root)? {
            let Some(file_name) = path.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };
            if path.is_dir() {
                spreadsheets.push(SpreadsheetInfo::new(file_name.clone(), file_name));
            } else if is_csv(&path) {
                let name = file_stem(&path).unwrap_or_else(|| file_name.clone());
                spreadsheets.push(SpreadsheetInfo::new(file_name, name));
            }
        }
        spreadsheets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        log::debug!(
            "{} spreadsheet(s) under {}",
            spreadsheets.len(),
            self.root.display()
        );
        Ok(spreadsheets)
    }

    fn sheet_names(&self, spreadsheet_id: &str) -> Result<Vec<String>, SourceError> {
        let path = self.root.join(spreadsheet_id);
        if path.is_dir() {
            let mut names: Vec<String> = read_dir_sorted(&path)?
                .iter()
                .filter(|p| is_csv(p))
                .filter_map(|p| file_stem(p))
                .collect();
            names.sort();
            return Ok(names);
        }
        if is_csv(&path) {
            return Ok(file_stem(&path).into_iter().collect());
        }
        Err(SourceError::SpreadsheetNotFound(spreadsheet_id.to_string()))
    }

    fn sheet_values(&self, spreadsheet_id: &str, sheet_name: &str) -> Result<Grid, SourceError> {
        let path = self.sheet_path(spreadsheet_id, sheet_name)?;
        log::trace!("reading {}", path.display());
        let file = File::open(&path).map_err(|source| SourceError::Io {
            context: format!("open {}", path.display()),
            source,
        })?;
        read_csv_grid(BufReader::new(file), &self.options).map_err(|source| SourceError::Import {
            context: format!("read {}", path.display()),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetseek_model::CellValue;

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("zlecenia")).unwrap();
        fs::write(
            dir.path().join("zlecenia/styczen.csv"),
            "Numer zlecenia,Stawka\n38960,280.00\n",
        )
        .unwrap();
        fs::write(dir.path().join("zlecenia/luty.csv"), "Numer zlecenia\n1\n").unwrap();
        fs::write(dir.path().join("zlecenia/notatki.txt"), "nie arkusz").unwrap();
        fs::write(dir.path().join("archiwum.csv"), "a,b\n").unwrap();
        dir
    }

    #[test]
    fn lists_directories_and_top_level_files() {
        let dir = fixture();
        let src = CsvDirSource::open(dir.path(), CsvOptions::default()).unwrap();
        assert_eq!(
            src.list_spreadsheets().unwrap(),
            vec![
                SpreadsheetInfo::new("archiwum.csv", "archiwum"),
                SpreadsheetInfo::new("zlecenia", "zlecenia"),
            ]
        );
        assert_eq!(src.sheet_names("zlecenia").unwrap(), vec!["luty", "styczen"]);
        assert_eq!(src.sheet_names("archiwum.csv").unwrap(), vec!["archiwum"]);
    }

    #[test]
    fn reads_sheet_grids() {
        let dir = fixture();
        let src = CsvDirSource::open(dir.path(), CsvOptions::default()).unwrap();
        let grid = src.sheet_values("zlecenia", "styczen").unwrap();
        assert_eq!(grid.row_count(), 2);
        assert_eq!(grid.cell(1, 1), &CellValue::from("280.00"));
        assert!(src.sheet_values("archiwum.csv", "archiwum").is_ok());
    }

    #[test]
    fn unknown_units_are_errors() {
        let dir = fixture();
        let src = CsvDirSource::open(dir.path(), CsvOptions::default()).unwrap();
        assert!(matches!(
            src.sheet_names("brak"),
            Err(SourceError::SpreadsheetNotFound(_))
        ));
        assert!(matches!(
            src.sheet_values("zlecenia", "notatki"),
            Err(SourceError::SheetNotFound { .. })
        ));
        assert!(matches!(
            src.sheet_values("archiwum.csv", "inny"),
            Err(SourceError::SheetNotFound { .. })
        ));
    }

    #[test]
    fn root_must_be_a_directory() {
        let dir = fixture();
        assert!(CsvDirSource::open(dir.path().join("archiwum.csv"), CsvOptions::default()).is_err());
        assert!(CsvDirSource::open(dir.path().join("brak"), CsvOptions::default()).is_err());
    }
}
