//! PDF statement handler: one row per non-blank text line.

use std::fs;
use std::path::Path;

use lopdf::Document;
use serde::Deserialize;
use tracing::{debug, warn};

use super::{check_expected_columns, FormatHandler, Result};
use crate::error::{ConfigError, HandlerError, PdfError};
use crate::factory::Params;
use crate::models::table::{Column, ColumnData, Table};

/// Read parameters for PDF files.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PdfOptions {
    /// Lines shorter than this (after trimming) are dropped.
    pub min_line_length: usize,

    /// Columns that must be present for the schema check to pass.
    pub expected_columns: Vec<String>,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            min_line_length: 1,
            expected_columns: Vec::new(),
        }
    }
}

/// Handler extracting embedded text from PDF statements.
#[derive(Debug, Clone)]
pub struct PdfHandler {
    options: PdfOptions,
}

impl PdfHandler {
    /// Build a handler from configuration parameters.
    pub fn from_params(params: &Params) -> std::result::Result<Self, ConfigError> {
        let options: PdfOptions = serde_json::from_value(serde_json::Value::Object(params.clone()))
            .map_err(|e| ConfigError::InvalidParams {
                format: "pdf".to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self::new(options))
    }

    pub fn new(options: PdfOptions) -> Self {
        Self { options }
    }

    /// Text of each page, in page order.
    fn load(data: &[u8]) -> std::result::Result<Vec<String>, PdfError> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        // Statements exported by some banks are encrypted with an empty password
        let decrypted;
        let raw = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut buffer = Vec::new();
            doc.save_to(&mut buffer)
                .map_err(|e| PdfError::Parse(format!("failed to save decrypted PDF: {}", e)))?;
            decrypted = buffer;
            decrypted.as_slice()
        } else {
            data
        };

        match pdf_extract::extract_text_from_mem_by_pages(raw) {
            Ok(pages) if pages.len() == page_count => Ok(pages),
            Ok(pages) => {
                warn!(
                    "Layout extraction stopped after {} of {} pages, using raw page text",
                    pages.len(),
                    page_count
                );
                Self::raw_page_text(&doc)
            }
            Err(e) => {
                warn!("Layout extraction failed ({}), using raw page text", e);
                Self::raw_page_text(&doc)
            }
        }
    }

    /// Content-stream text per page; lines positioned with `Td` run together.
    fn raw_page_text(doc: &Document) -> std::result::Result<Vec<String>, PdfError> {
        doc.get_pages()
            .keys()
            .map(|&n| {
                doc.extract_text(&[n])
                    .map_err(|e| PdfError::TextExtraction(e.to_string()))
            })
            .collect()
    }
}

impl FormatHandler for PdfHandler {
    fn format_type(&self) -> &'static str {
        "pdf"
    }

    fn extract(&self, path: &Path) -> Result<Table> {
        let data = fs::read(path).map_err(|e| HandlerError::extraction(path, e))?;
        let pages = Self::load(&data).map_err(|e| HandlerError::extraction(path, e))?;

        let mut page_col = Vec::new();
        let mut line_col = Vec::new();
        let mut text_col = Vec::new();

        for (page_index, page) in pages.iter().enumerate() {
            let mut line_number = 0i64;
            for line in page.lines().map(str::trim) {
                if line.is_empty() || line.chars().count() < self.options.min_line_length {
                    continue;
                }
                line_number += 1;
                page_col.push(Some(page_index as i64 + 1));
                line_col.push(Some(line_number));
                text_col.push(Some(line.to_string()));
            }
        }

        debug!("PDF {} yielded {} text lines", path.display(), text_col.len());

        Table::try_new(vec![
            Column::new("page", ColumnData::Int64(page_col)),
            Column::new("line_number", ColumnData::Int64(line_col)),
            Column::new("text", ColumnData::Utf8(text_col)),
        ])
    }

    fn validate_schema(&self, table: &Table) -> Result<()> {
        check_expected_columns(table, &self.options.expected_columns)
    }
}
