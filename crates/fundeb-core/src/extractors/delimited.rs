//! Delimited-text (CSV/TXT) handler.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use super::{check_expected_columns, FormatHandler, Result};
use crate::error::{ConfigError, HandlerError};
use crate::factory::Params;
use crate::models::table::{Column, ColumnData, Table};

/// Read parameters for delimited files.
///
/// Keys follow the names used in the handler configuration file; unknown
/// keys are rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CsvOptions {
    /// Field separator, a single ASCII character (`"\t"` or `"\\t"` for tab).
    #[serde(alias = "sep")]
    pub separator: String,

    /// Index of the header row after `skip_rows`; `null` means no header.
    pub header: Option<usize>,

    /// Decimal marker used in numeric cells.
    pub decimal: String,

    /// Thousands grouping character stripped before numeric parsing.
    pub thousands: Option<String>,

    /// Text encoding: `utf-8`, `latin-1` or `cp1252`.
    pub encoding: String,

    /// Records skipped before the header row.
    #[serde(alias = "skiprows")]
    pub skip_rows: usize,

    /// Quote character.
    #[serde(alias = "quotechar")]
    pub quote: String,

    /// Columns that must be present for the schema check to pass.
    pub expected_columns: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            header: Some(0),
            decimal: ".".to_string(),
            thousands: None,
            encoding: "utf-8".to_string(),
            skip_rows: 0,
            quote: "\"".to_string(),
            expected_columns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Utf8,
    Latin1,
    Windows1252,
}

/// Handler for delimited text files.
#[derive(Debug, Clone)]
pub struct CsvHandler {
    options: CsvOptions,
    delimiter: u8,
    quote: u8,
    decimal: char,
    thousands: Option<char>,
    encoding: Encoding,
}

impl CsvHandler {
    /// Build a handler from configuration parameters.
    pub fn from_params(params: &Params) -> std::result::Result<Self, ConfigError> {
        let options: CsvOptions = serde_json::from_value(serde_json::Value::Object(params.clone()))
            .map_err(|e| invalid(e.to_string()))?;
        Self::new(options)
    }

    /// Build a handler from typed options.
    pub fn new(options: CsvOptions) -> std::result::Result<Self, ConfigError> {
        let delimiter = match options.separator.as_str() {
            "\\t" => b'\t',
            s => single_byte(s, "separator")?,
        };
        let quote = single_byte(&options.quote, "quote")?;
        let decimal = single_char(&options.decimal, "decimal")?;
        let thousands = options
            .thousands
            .as_deref()
            .map(|t| single_char(t, "thousands"))
            .transpose()?;

        if thousands == Some(decimal) {
            return Err(invalid("decimal and thousands markers must differ"));
        }

        let encoding = match options.encoding.to_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" | "utf-8-sig" => Encoding::Utf8,
            "latin-1" | "latin1" | "iso-8859-1" => Encoding::Latin1,
            "cp1252" | "windows-1252" => Encoding::Windows1252,
            other => return Err(invalid(format!("unsupported encoding '{}'", other))),
        };

        debug!("CsvHandler initialised with {:?}", options);

        Ok(Self {
            options,
            delimiter,
            quote,
            decimal,
            thousands,
            encoding,
        })
    }

    pub fn options(&self) -> &CsvOptions {
        &self.options
    }

    fn decode(&self, path: &Path, bytes: Vec<u8>) -> Result<String> {
        match self.encoding {
            Encoding::Utf8 => {
                let text =
                    String::from_utf8(bytes).map_err(|e| HandlerError::extraction(path, e))?;
                Ok(text.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(text))
            }
            Encoding::Latin1 => Ok(encoding_rs::mem::decode_latin1(&bytes).into_owned()),
            // Every byte has a mapping, so decoding never reports errors.
            Encoding::Windows1252 => Ok(encoding_rs::WINDOWS_1252
                .decode_without_bom_handling(&bytes)
                .0
                .into_owned()),
        }
    }

    fn read_records(&self, path: &Path, text: &str) -> Result<Vec<csv::StringRecord>> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .delimiter(self.delimiter)
            .quote(self.quote)
            .flexible(true)
            .from_reader(text.as_bytes());

        reader
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| HandlerError::extraction(path, e))
    }

    /// Parse a numeric cell honouring the configured decimal and thousands markers.
    fn parse_float(&self, cell: &str) -> Option<f64> {
        let mut normalized: String = cell.trim().to_string();
        if let Some(t) = self.thousands {
            normalized.retain(|c| c != t);
        }
        if self.decimal != '.' {
            if normalized.contains('.') {
                return None;
            }
            normalized = normalized.replace(self.decimal, ".");
        }
        if normalized.is_empty()
            || !normalized
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
        {
            return None;
        }
        normalized.parse().ok()
    }

    fn parse_int(&self, cell: &str) -> Option<i64> {
        let mut normalized: String = cell.trim().to_string();
        if let Some(t) = self.thousands {
            normalized.retain(|c| c != t);
        }
        normalized.parse().ok()
    }

    /// Infer the narrowest column type: integer, float, then text.
    fn build_column(&self, name: String, cells: Vec<Option<String>>) -> Column {
        let present = || cells.iter().flatten();

        if present().all(|c| self.parse_int(c).is_some()) && present().next().is_some() {
            let values = cells
                .iter()
                .map(|c| c.as_deref().and_then(|c| self.parse_int(c)))
                .collect();
            return Column::new(name, ColumnData::Int64(values));
        }

        if present().all(|c| self.parse_float(c).is_some()) && present().next().is_some() {
            let values = cells
                .iter()
                .map(|c| c.as_deref().and_then(|c| self.parse_float(c)))
                .collect();
            return Column::new(name, ColumnData::Float64(values));
        }

        Column::new(name, ColumnData::Utf8(cells))
    }
}

impl FormatHandler for CsvHandler {
    fn format_type(&self) -> &'static str {
        "csv"
    }

    fn extract(&self, path: &Path) -> Result<Table> {
        info!("Extracting {}", path.display());

        let bytes = fs::read(path).map_err(|e| HandlerError::extraction(path, e))?;
        let text = self.decode(path, bytes)?;
        let records = self.read_records(path, &text)?;
        let mut records = records.into_iter().skip(self.options.skip_rows);

        let names: Vec<String> = match self.options.header {
            Some(index) => {
                let header = records.nth(index).ok_or_else(|| {
                    HandlerError::extraction(path, format!("header row {} not found", index))
                })?;
                header_names(&header)
            }
            None => Vec::new(),
        };

        let rows: Vec<csv::StringRecord> = records.collect();
        let width = if self.options.header.is_some() {
            names.len()
        } else {
            rows.first().map(|r| r.len()).unwrap_or(0)
        };
        let names = if self.options.header.is_some() {
            names
        } else {
            (0..width).map(|i| format!("column_{}", i)).collect()
        };

        let mut cells: Vec<Vec<Option<String>>> = vec![Vec::with_capacity(rows.len()); width];
        for (row_index, record) in rows.iter().enumerate() {
            if record.len() != width {
                return Err(HandlerError::extraction(
                    path,
                    format!(
                        "data row {} has {} fields, expected {}",
                        row_index + 1,
                        record.len(),
                        width
                    ),
                ));
            }
            for (column, field) in cells.iter_mut().zip(record.iter()) {
                column.push(if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                });
            }
        }

        let columns = names
            .into_iter()
            .zip(cells)
            .map(|(name, values)| self.build_column(name, values))
            .collect();
        let table = Table::try_new(columns)?;

        debug!(
            "Parsed {} rows, {} columns from {}",
            table.num_rows(),
            table.num_columns(),
            path.display()
        );
        Ok(table)
    }

    fn validate_schema(&self, table: &Table) -> Result<()> {
        check_expected_columns(table, &self.options.expected_columns)
    }
}

/// Trimmed header names; blanks become `column_<i>` and repeats get `.1`, `.2`...
fn header_names(header: &csv::StringRecord) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(header.len());
    for (i, raw) in header.iter().enumerate() {
        let base = match raw.trim() {
            "" => format!("column_{}", i),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut suffix = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(name);
    }
    names
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParams {
        format: "csv".to_string(),
        reason: reason.into(),
    }
}

fn single_byte(value: &str, field: &str) -> std::result::Result<u8, ConfigError> {
    match value.as_bytes() {
        [b] if b.is_ascii() => Ok(*b),
        _ => Err(invalid(format!(
            "{} must be a single ASCII character, got '{}'",
            field, value
        ))),
    }
}

fn single_char(value: &str, field: &str) -> std::result::Result<char, ConfigError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(invalid(format!(
            "{} must be a single character, got '{}'",
            field, value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::table::DataType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn handler(params: serde_json::Value) -> CsvHandler {
        let params = params.as_object().cloned().unwrap_or_default();
        CsvHandler::from_params(&params).unwrap()
    }

    fn write(dir: &tempfile::TempDir, name: &str, content: &[u8]) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_extract_semicolon_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "produtos.csv",
            b"id;nome;valor\n1;produto_a;10.50\n2;produto_b;20.00",
        );

        let h = handler(json!({"sep": ";", "header": 0, "decimal": "."}));
        let table = h.extract(&path).unwrap();

        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.column_names(), vec!["id", "nome", "valor"]);
        assert_eq!(table.column("id").unwrap().data_type(), DataType::Int64);
        assert_eq!(table.column("nome").unwrap().data_type(), DataType::Utf8);
        assert_eq!(
            table.column("valor").unwrap().data,
            ColumnData::Float64(vec![Some(10.5), Some(20.0)])
        );
    }

    #[test]
    fn test_run_flow_adds_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.csv", b"id;valor\n1;2.5\n2;3.5\n3;4.5\n");

        let table = handler(json!({"sep": ";"})).run_flow(&path).unwrap();
        assert_eq!(table.num_rows(), 3);
        assert_eq!(table.num_columns(), 2 + 4);
        assert_eq!(
            table.column_names()[2..].to_vec(),
            vec!["file_name", "file_mb_size", "modified_time", "processing_time"]
        );
    }

    #[test]
    fn test_brazilian_number_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "extrato.csv",
            b"data;historico;valor\n02/01/2025;PIX RECEBIDO;1.234,56\n03/01/2025;TARIFA;-12,00\n",
        );

        let h = handler(json!({"sep": ";", "decimal": ",", "thousands": "."}));
        let table = h.extract(&path).unwrap();

        assert_eq!(
            table.column("valor").unwrap().data,
            ColumnData::Float64(vec![Some(1234.56), Some(-12.0)])
        );
        assert_eq!(table.column("data").unwrap().data_type(), DataType::Utf8);
    }

    #[test]
    fn test_tab_separator_and_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = b"municipio\tvalor\n".to_vec();
        content.extend_from_slice(b"Macap\xe1\t100\n");
        let path = write(&dir, "remessa.txt", &content);

        let h = handler(json!({"sep": "\t", "encoding": "latin-1"}));
        let table = h.extract(&path).unwrap();

        assert_eq!(
            table.column("municipio").unwrap().data,
            ColumnData::Utf8(vec![Some("Macapá".to_string())])
        );
        assert_eq!(
            table.column("valor").unwrap().data,
            ColumnData::Int64(vec![Some(100)])
        );
    }

    #[test]
    fn test_cp1252_differs_from_latin1() {
        let dir = tempfile::tempdir().unwrap();
        let mut content = b"historico;valor\n".to_vec();
        content.extend_from_slice(b"\x93TED\x94 \x96 \x80 Cr\xe9dito;1\n");
        let path = write(&dir, "extrato.csv", &content);

        let table = handler(json!({"sep": ";", "encoding": "cp1252"}))
            .extract(&path)
            .unwrap();
        assert_eq!(
            table.column("historico").unwrap().data,
            ColumnData::Utf8(vec![Some(
                "\u{201c}TED\u{201d} \u{2013} \u{20ac} Crédito".to_string()
            )])
        );

        let table = handler(json!({"sep": ";", "encoding": "windows_1252"}))
            .extract(&path)
            .unwrap();
        assert_eq!(table.num_rows(), 1);

        let table = handler(json!({"sep": ";", "encoding": "latin-1"}))
            .extract(&path)
            .unwrap();
        assert_eq!(
            table.column("historico").unwrap().data,
            ColumnData::Utf8(vec![Some(
                "\u{93}TED\u{94} \u{96} \u{80} Crédito".to_string()
            )])
        );
    }

    #[test]
    fn test_escaped_tab_separator() {
        let h = handler(json!({"sep": "\\t"}));
        assert_eq!(h.delimiter, b'\t');
    }

    #[test]
    fn test_invalid_utf8_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "bad.csv", b"a,b\n\xff\xfe,1\n");

        let result = handler(json!({})).extract(&path);
        assert!(matches!(result, Err(HandlerError::Extraction { .. })));
    }

    #[test]
    fn test_ragged_row_is_extraction_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "ragged.csv", b"a;b\n1;2\n3;4;5\n");

        let err = handler(json!({"sep": ";"})).extract(&path).unwrap_err();
        match err {
            HandlerError::Extraction { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_skip_rows_and_header_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            "invest.csv",
            b"Relatorio mensal\nGerado em 2025\ndescricao,saldo\nCDB,10\n",
        );

        let h = handler(json!({"skip_rows": 1, "header": 1}));
        let table = h.extract(&path).unwrap();
        assert_eq!(table.column_names(), vec!["descricao", "saldo"]);
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn test_no_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "raw.csv", b"1,x\n2,y\n");

        let table = handler(json!({"header": null})).extract(&path).unwrap();
        assert_eq!(table.column_names(), vec!["column_0", "column_1"]);
        assert_eq!(table.num_rows(), 2);
    }

    #[test]
    fn test_empty_cells_are_null_and_duplicate_headers_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "dup.csv", b"v,v,\n1,,a\n,2.5,b\n");

        let table = handler(json!({})).extract(&path).unwrap();
        assert_eq!(table.column_names(), vec!["v", "v.1", "column_2"]);
        assert_eq!(
            table.column("v").unwrap().data,
            ColumnData::Int64(vec![Some(1), None])
        );
        assert_eq!(
            table.column("v.1").unwrap().data,
            ColumnData::Float64(vec![None, Some(2.5)])
        );
    }

    #[test]
    fn test_header_only_fails_schema_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "vazio.csv", b"id;valor\n");

        let h = handler(json!({"sep": ";"}));
        let table = h.extract(&path).unwrap();
        assert!(matches!(h.validate_schema(&table), Err(HandlerError::EmptyData)));
    }

    #[test]
    fn test_expected_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, "a.csv", b"id,nome\n1,x\n");

        let h = handler(json!({"expected_columns": ["id", "valor"]}));
        let table = h.extract(&path).unwrap();
        match h.validate_schema(&table) {
            Err(HandlerError::Schema(msg)) => assert!(msg.contains("valor")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_params() {
        for params in [
            json!({"sep": ";;"}),
            json!({"encoding": "ebcdic"}),
            json!({"unknown_option": true}),
            json!({"decimal": ",", "thousands": ","}),
            json!({"header": "first"}),
        ] {
            let params = params.as_object().cloned().unwrap();
            let result = CsvHandler::from_params(&params);
            assert!(
                matches!(result, Err(ConfigError::InvalidParams { .. })),
                "params should be rejected: {params:?}"
            );
        }
    }
}
