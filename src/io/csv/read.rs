//! CSV reading operations.

use std::{fs::File, path::Path};

use anyhow::{Context, Result};
use polars::{frame::DataFrame, io::SerReader, prelude::{CsvReadOptions, CsvReader}};

/// Reads a CSV file from `path` into a Polars DataFrame.
///
/// Every column is read as text.
pub(crate) fn read_csv(path: &Path) -> Result<DataFrame> {
    let file = File::open(path)
        .with_context(|| format!("[io::csv::read] Failed to open CSV file: {}", path.display()))?;
    CsvReader::new(file)
        .with_options(CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0)))
        .finish()
        .with_context(|| format!("[io::csv::read] Failed to read CSV from {}", path.display()))
}
