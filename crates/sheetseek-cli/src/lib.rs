//! Command-line front end over a directory of CSV spreadsheets.

pub mod cli;
mod csv_dir;

pub use csv_dir::CsvDirSource;
