//! Format handlers: turn one source file into a [`Table`].

mod delimited;
#[cfg(feature = "pdf")]
mod pdf;

pub use delimited::{CsvHandler, CsvOptions};
#[cfg(feature = "pdf")]
pub use pdf::{PdfHandler, PdfOptions};

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, NaiveDateTime};
use tracing::{debug, info};

use crate::error::HandlerError;
use crate::models::table::{Column, ColumnData, Table};
use crate::staging;

/// Result type for handler operations.
pub type Result<T> = std::result::Result<T, HandlerError>;

/// Provenance column: source file name.
pub const FILE_NAME_COLUMN: &str = "file_name";
/// Provenance column: source size in MiB, three decimals.
pub const FILE_SIZE_COLUMN: &str = "file_mb_size";
/// Provenance column: source modification time.
pub const MODIFIED_TIME_COLUMN: &str = "modified_time";
/// Provenance column: time the table was enriched.
pub const PROCESSING_TIME_COLUMN: &str = "processing_time";

/// All provenance columns, in the order they are appended.
pub const PROVENANCE_COLUMNS: [&str; 4] = [
    FILE_NAME_COLUMN,
    FILE_SIZE_COLUMN,
    MODIFIED_TIME_COLUMN,
    PROCESSING_TIME_COLUMN,
];

/// Trait for file-format handlers.
///
/// Implementors own their read parameters and keep no per-file state, so one
/// instance may process any number of files, from several threads.
pub trait FormatHandler: Send + Sync + std::fmt::Debug {
    /// Format tag this handler is registered under.
    fn format_type(&self) -> &'static str;

    /// Read one file into a table.
    fn extract(&self, path: &Path) -> Result<Table>;

    /// Check the extracted table has the shape expected for this handler.
    fn validate_schema(&self, table: &Table) -> Result<()>;

    /// Check the path exists, is a regular file and is not empty.
    fn validate_file(&self, path: &Path) -> Result<()> {
        debug!("Validating file {}", path.display());

        if !path.exists() {
            return Err(HandlerError::NotFound(path.to_path_buf()));
        }
        if !path.is_file() {
            return Err(HandlerError::NotAFile(path.to_path_buf()));
        }
        if fs::metadata(path)?.len() == 0 {
            return Err(HandlerError::EmptyFile(path.to_path_buf()));
        }
        Ok(())
    }

    /// Append the provenance columns for `path` to `table`.
    fn add_metadata(&self, path: &Path, table: Table) -> Result<Table> {
        add_provenance(path, table, Local::now().naive_local())
    }

    /// Write `table` to `destination_dir/<source stem>.parquet`.
    fn save(&self, table: &Table, source_path: &Path, destination_dir: &Path) -> Result<PathBuf> {
        let output = destination_dir.join(staging::parquet_file_name(source_path)?);
        staging::write_table(table, &output)?;
        Ok(output)
    }

    /// validate_file, extract, validate_schema, add_metadata.
    fn run_flow(&self, path: &Path) -> Result<Table> {
        self.validate_file(path)?;
        let table = self.extract(path)?;
        self.validate_schema(&table)?;
        let table = self.add_metadata(path, table)?;

        info!(
            "Extracted {} rows x {} columns from {}",
            table.num_rows(),
            table.num_columns(),
            path.display()
        );
        Ok(table)
    }
}

/// Append provenance columns using `processed_at` as the processing time.
pub fn add_provenance(path: &Path, mut table: Table, processed_at: NaiveDateTime) -> Result<Table> {
    for name in PROVENANCE_COLUMNS {
        if table.column(name).is_some() {
            return Err(HandlerError::Schema(format!(
                "column '{}' collides with a provenance column",
                name
            )));
        }
    }

    let meta = fs::metadata(path)?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let size_mb = round3(meta.len() as f64 / (1024.0 * 1024.0));
    let modified = DateTime::<Local>::from(meta.modified()?).naive_local();

    let rows = table.num_rows();
    table.push_column(Column::new(
        FILE_NAME_COLUMN,
        ColumnData::Utf8(vec![Some(file_name); rows]),
    ))?;
    table.push_column(Column::new(
        FILE_SIZE_COLUMN,
        ColumnData::Float64(vec![Some(size_mb); rows]),
    ))?;
    table.push_column(Column::new(
        MODIFIED_TIME_COLUMN,
        ColumnData::Timestamp(vec![Some(modified); rows]),
    ))?;
    table.push_column(Column::new(
        PROCESSING_TIME_COLUMN,
        ColumnData::Timestamp(vec![Some(processed_at); rows]),
    ))?;

    debug!("Added provenance columns for {}", path.display());
    Ok(table)
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Shared schema policy: non-empty, and every expected column present.
pub(crate) fn check_expected_columns(table: &Table, expected: &[String]) -> Result<()> {
    if table.is_empty() {
        return Err(HandlerError::EmptyData);
    }

    let missing: Vec<&str> = expected
        .iter()
        .map(String::as_str)
        .filter(|name| table.column(name).is_none())
        .collect();

    if !missing.is_empty() {
        return Err(HandlerError::Schema(format!(
            "missing columns: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
