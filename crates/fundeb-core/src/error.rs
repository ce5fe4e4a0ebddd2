//! Error types for the fundeb-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Boxed cause carried by extraction failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for the fundeb library.
#[derive(Error, Debug)]
pub enum FundebError {
    /// Configuration or registry lookup error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Format handler error (file validation, extraction, schema).
    #[error("handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Staging (Parquet) write error.
    #[error("staging error: {0}")]
    Staging(#[from] StagingError),

    /// Downstream transformation error.
    #[error("transform error: {0}")]
    Transform(#[from] TransformError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading handler configuration or resolving a handler.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration source could not be read or parsed.
    #[error("failed to load configuration from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    /// The configuration source parsed but contains no modules.
    #[error("configuration file is empty: {0}")]
    EmptyConfig(PathBuf),

    /// No configuration block for the requested module.
    #[error("no configuration found for module '{0}'")]
    ModuleNotFound(String),

    /// The module exists but has no block for the requested format.
    #[error("format '{format}' is not configured for module '{module}'")]
    FormatNotFound { module: String, format: String },

    /// The format is configured but no handler constructor is registered for it.
    #[error("format '{0}' is configured but has no registered handler")]
    UnregisteredType(String),

    /// The handler rejected its parameters at construction time.
    #[error("invalid parameters for '{format}' handler: {reason}")]
    InvalidParams { format: String, reason: String },
}

/// Errors raised by format handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// Source path does not exist.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// Source path exists but is not a regular file.
    #[error("path is not a file: {0}")]
    NotAFile(PathBuf),

    /// Source file has zero bytes.
    #[error("file is empty: {0}")]
    EmptyFile(PathBuf),

    /// The underlying parser failed.
    #[error("failed to extract {path}: {source}")]
    Extraction {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    /// Extraction produced no rows.
    #[error("extracted data is empty")]
    EmptyData,

    /// The extracted table does not have the expected shape.
    #[error("schema mismatch: {0}")]
    Schema(String),

    /// Writing the staging file failed.
    #[error(transparent)]
    Staging(#[from] StagingError),

    /// I/O error while reading file metadata.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HandlerError {
    /// Wrap a parser failure together with the offending path.
    pub fn extraction(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        Self::Extraction {
            path: path.into(),
            source: source.into(),
        }
    }
}

/// Errors related to PDF loading.
#[cfg(feature = "pdf")]
#[derive(Error, Debug)]
pub enum PdfError {
    /// Failed to open/parse the PDF file.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// Failed to extract text from PDF.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors raised while writing staging files.
#[derive(Error, Debug)]
pub enum StagingError {
    /// Arrow batch construction failed.
    #[error("arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet encoding failed.
    #[error("parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The source path has no usable file stem.
    #[error("cannot derive a staging name from {0}")]
    InvalidName(PathBuf),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the downstream transformation trigger.
#[derive(Error, Debug)]
pub enum TransformError {
    /// The working directory does not exist.
    #[error("transform working directory not found: {0}")]
    MissingWorkingDir(PathBuf),

    /// The command could not be started.
    #[error("failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran and exited unsuccessfully.
    #[error("'{command}' exited with status {code:?}")]
    Failed { command: String, code: Option<i32> },
}

/// Result type for the fundeb library.
pub type Result<T> = std::result::Result<T, FundebError>;
