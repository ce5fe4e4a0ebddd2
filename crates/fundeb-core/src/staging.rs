//! Parquet staging writer.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType as ArrowType, Field, Schema, TimeUnit};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use tracing::debug;

use crate::error::StagingError;
use crate::models::table::{ColumnData, DataType, Table};

/// Extension of staged files.
pub const STAGING_EXTENSION: &str = "parquet";

/// `<stem>.parquet` for a source file.
pub fn parquet_file_name(source: &Path) -> Result<String, StagingError> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| StagingError::InvalidName(source.to_path_buf()))?;
    Ok(format!("{}.{}", stem, STAGING_EXTENSION))
}

/// `<module>_<stem>.parquet` for a source file belonging to a module.
pub fn staging_file_name(module_name: &str, source: &Path) -> Result<String, StagingError> {
    Ok(format!("{}_{}", module_name, parquet_file_name(source)?))
}

/// Write a table to `path` as Parquet, replacing any existing file.
///
/// Parent directories are created. The data goes to a uniquely named temp
/// file in the same directory, which is renamed into place once complete and
/// removed if anything fails.
pub fn write_table(table: &Table, path: &Path) -> Result<(), StagingError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    fs::create_dir_all(parent)?;

    let batch = to_record_batch(table)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut tmp = tempfile::Builder::new()
        .prefix(".staging-")
        .suffix(".tmp")
        .tempfile_in(parent)?;
    let mut writer = ArrowWriter::try_new(tmp.as_file_mut(), batch.schema(), Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    tmp.persist(path).map_err(|e| e.error)?;

    debug!(
        "Wrote {} rows x {} columns to {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(())
}

/// Convert a table into a single Arrow record batch.
pub fn to_record_batch(table: &Table) -> Result<RecordBatch, StagingError> {
    let mut fields = Vec::with_capacity(table.num_columns());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(table.num_columns());

    for column in table.columns() {
        fields.push(Field::new(&column.name, arrow_type(column.data_type()), true));
        arrays.push(to_array(&column.data));
    }

    let schema = Arc::new(Schema::new(fields));
    let options = RecordBatchOptions::new().with_row_count(Some(table.num_rows()));
    Ok(RecordBatch::try_new_with_options(schema, arrays, &options)?)
}

fn arrow_type(data_type: DataType) -> ArrowType {
    match data_type {
        DataType::Int64 => ArrowType::Int64,
        DataType::Float64 => ArrowType::Float64,
        DataType::Utf8 => ArrowType::Utf8,
        DataType::Timestamp => ArrowType::Timestamp(TimeUnit::Microsecond, None),
    }
}

fn to_array(data: &ColumnData) -> ArrayRef {
    match data {
        ColumnData::Int64(values) => Arc::new(Int64Array::from(values.clone())),
        ColumnData::Float64(values) => Arc::new(Float64Array::from(values.clone())),
        ColumnData::Utf8(values) => Arc::new(StringArray::from(values.clone())),
        ColumnData::Timestamp(values) => {
            let micros: Vec<Option<i64>> = values
                .iter()
                .map(|v| v.map(|ts| ts.and_utc().timestamp_micros()))
                .collect();
            Arc::new(TimestampMicrosecondArray::from(micros))
        }
    }
}
