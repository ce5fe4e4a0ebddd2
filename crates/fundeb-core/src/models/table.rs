//! In-memory columnar table produced by format handlers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::HandlerError;

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit float.
    Float64,
    /// UTF-8 text.
    Utf8,
    /// Naive local timestamp (microsecond precision once staged).
    Timestamp,
}

/// Typed, nullable column values.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int64(Vec<Option<i64>>),
    Float64(Vec<Option<f64>>),
    Utf8(Vec<Option<String>>),
    Timestamp(Vec<Option<NaiveDateTime>>),
}

impl ColumnData {
    /// Number of values in the column.
    pub fn len(&self) -> usize {
        match self {
            Self::Int64(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) => v.len(),
            Self::Timestamp(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Logical type of the column.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Timestamp(_) => DataType::Timestamp,
        }
    }

    /// Number of null values in the column.
    pub fn null_count(&self) -> usize {
        match self {
            Self::Int64(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Float64(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Utf8(v) => v.iter().filter(|x| x.is_none()).count(),
            Self::Timestamp(v) => v.iter().filter(|x| x.is_none()).count(),
        }
    }
}

/// A named column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Column name.
    pub name: String,
    /// Column values.
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Rows x columns of typed values.
///
/// All columns have the same length and names are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    num_rows: usize,
}

impl Table {
    /// Create an empty table with no columns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from columns, checking lengths and name uniqueness.
    pub fn try_new(columns: Vec<Column>) -> Result<Self, HandlerError> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Append a column.
    pub fn push_column(&mut self, column: Column) -> Result<(), HandlerError> {
        if self.column(&column.name).is_some() {
            return Err(HandlerError::Schema(format!(
                "duplicate column '{}'",
                column.name
            )));
        }

        if self.columns.is_empty() {
            self.num_rows = column.len();
        } else if column.len() != self.num_rows {
            return Err(HandlerError::Schema(format!(
                "column '{}' has {} values, table has {} rows",
                column.name,
                column.len(),
                self.num_rows
            )));
        }

        self.columns.push(column);
        Ok(())
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_try_new_tracks_rows() {
        let table = Table::try_new(vec![
            Column::new("id", ColumnData::Int64(vec![Some(1), Some(2)])),
            Column::new(
                "nome",
                ColumnData::Utf8(vec![Some("a".to_string()), None]),
            ),
        ])
        .unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_names(), vec!["id", "nome"]);
        assert_eq!(table.column("nome").unwrap().data.null_count(), 1);
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let result = Table::try_new(vec![
            Column::new("a", ColumnData::Int64(vec![Some(1)])),
            Column::new("b", ColumnData::Int64(vec![Some(1), Some(2)])),
        ]);
        assert!(matches!(result, Err(HandlerError::Schema(_))));
    }

    #[test]
    fn test_rejects_duplicate_name() {
        let mut table = Table::new();
        table
            .push_column(Column::new("a", ColumnData::Float64(vec![Some(1.0)])))
            .unwrap();
        let result = table.push_column(Column::new("a", ColumnData::Float64(vec![None])));
        assert!(matches!(result, Err(HandlerError::Schema(_))));
    }
}
