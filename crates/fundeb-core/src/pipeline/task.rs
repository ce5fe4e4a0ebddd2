//! Task discovery.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::discovery::locate;
use crate::models::config::DiscoveryRule;

/// One source file to process, tagged with the module it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    /// Module name used to look up handler configuration.
    pub module_name: String,
    /// Full path to the source file.
    pub file_path: PathBuf,
    /// File name component of `file_path`.
    pub file_name: String,
}

impl Task {
    pub fn new(module_name: impl Into<String>, file_path: impl Into<PathBuf>) -> Self {
        let file_path = file_path.into();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            module_name: module_name.into(),
            file_path,
            file_name,
        }
    }
}

/// Apply every rule against `source_dir`, in rule order then path order.
pub fn discover_tasks(source_dir: &Path, rules: &[DiscoveryRule]) -> Vec<Task> {
    let tasks: Vec<Task> = rules
        .iter()
        .flat_map(|rule| {
            locate(source_dir, &rule.module, &rule.pattern)
                .into_iter()
                .map(move |path| Task::new(rule.module.clone(), path))
        })
        .collect();

    info!(
        "Discovery finished: {} files from {} rules under {}",
        tasks.len(),
        rules.len(),
        source_dir.display()
    );
    tasks
}
