//! Core library for the FUNDEB financial-file staging pipeline.
//!
//! This crate provides:
//! - File discovery by module directory and glob pattern
//! - Format handlers for delimited text and PDF statements
//! - A handler registry and configuration-driven extraction factory
//! - Provenance enrichment and Parquet staging output
//! - A pipeline orchestrator with per-task failure accounting
//! - A downstream transformation trigger

pub mod discovery;
pub mod error;
pub mod extractors;
pub mod factory;
pub mod models;
pub mod pipeline;
pub mod staging;
pub mod transform;

pub use error::{ConfigError, FundebError, HandlerError, Result, StagingError, TransformError};
pub use extractors::{CsvHandler, CsvOptions, FormatHandler};
#[cfg(feature = "pdf")]
pub use extractors::{PdfHandler, PdfOptions};
pub use factory::{get_factory, ExtractionFactory, HandlerConfig, HandlerRegistry, Params};
pub use models::config::PipelineConfig;
pub use models::table::{Column, ColumnData, DataType, Table};
pub use pipeline::{
    discover_tasks, Pipeline, RunSummary, Task, TaskFailureKind, TaskOutcome, TaskStatus,
};
pub use transform::{run_transform, TransformOutput};
