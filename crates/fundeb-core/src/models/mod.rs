//! Data models: pipeline configuration and extracted tables.

pub mod config;
pub mod table;

pub use config::{DiscoveryRule, ExtensionMap, PathsConfig, PipelineConfig, TransformConfig};
pub use table::{Column, ColumnData, DataType, Table};
