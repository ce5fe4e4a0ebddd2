//! Pipeline orchestrator.
//!
//! Each discovered task moves through classification (extension to format
//! tag), handler construction, the handler flow and the staging write. A
//! failing task is recorded and the run moves on; only building the factory
//! can stop a run, and that happens before the pipeline exists.

pub mod task;

pub use task::{discover_tasks, Task};

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, HandlerError, StagingError};
use crate::factory::{get_factory, ExtractionFactory};
use crate::models::config::{ExtensionMap, PipelineConfig};
use crate::staging;

/// Why a task failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailureKind {
    /// No handler could be built for the module/format pair.
    Configuration,
    /// Missing, non-regular or empty source file.
    File,
    /// Empty extraction or schema mismatch.
    Data,
    /// The parser failed on the file contents.
    Extraction,
    /// The file extension maps to no format.
    Unmapped,
    /// I/O or Parquet failure outside the handler's own checks.
    Unexpected,
}

impl TaskFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::File => "file",
            Self::Data => "data",
            Self::Extraction => "extraction",
            Self::Unmapped => "unmapped",
            Self::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for TaskFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&HandlerError> for TaskFailureKind {
    fn from(err: &HandlerError) -> Self {
        match err {
            HandlerError::NotFound(_) | HandlerError::NotAFile(_) | HandlerError::EmptyFile(_) => {
                Self::File
            }
            HandlerError::EmptyData | HandlerError::Schema(_) => Self::Data,
            HandlerError::Extraction { .. } => Self::Extraction,
            HandlerError::Staging(_) | HandlerError::Io(_) => Self::Unexpected,
        }
    }
}

/// Terminal state of a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    /// Staged successfully.
    Loaded { rows: usize, output: PathBuf },
    /// Stopped at some stage.
    Failed { kind: TaskFailureKind, error: String },
}

/// A task together with how it ended.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub task: Task,
    pub status: TaskStatus,
    pub duration_ms: u64,
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, TaskStatus::Loaded { .. })
    }
}

/// Result of a whole run, outcomes in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<TaskOutcome>,
    pub duration_ms: u64,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.succeeded()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }
}

struct TaskFailure {
    kind: TaskFailureKind,
    error: String,
}

impl TaskFailure {
    fn new(kind: TaskFailureKind, error: impl ToString) -> Self {
        Self {
            kind,
            error: error.to_string(),
        }
    }
}

impl From<HandlerError> for TaskFailure {
    fn from(err: HandlerError) -> Self {
        Self::new(TaskFailureKind::from(&err), err)
    }
}

impl From<ConfigError> for TaskFailure {
    fn from(err: ConfigError) -> Self {
        Self::new(TaskFailureKind::Configuration, err)
    }
}

impl From<StagingError> for TaskFailure {
    fn from(err: StagingError) -> Self {
        Self::new(TaskFailureKind::Unexpected, err)
    }
}

/// Runs tasks through classification, extraction and staging.
#[derive(Debug)]
pub struct Pipeline<'a> {
    factory: &'a ExtractionFactory,
    extensions: &'a ExtensionMap,
    staging_dir: PathBuf,
    jobs: usize,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        factory: &'a ExtractionFactory,
        extensions: &'a ExtensionMap,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            factory,
            extensions,
            staging_dir: staging_dir.into(),
            jobs: 1,
        }
    }

    /// Pipeline for a configuration: creates the source and staging
    /// directories and loads the shared factory from `extractors_config`.
    pub fn from_config(config: &'a PipelineConfig) -> crate::Result<Self> {
        config.ensure_directories()?;
        let factory = get_factory(&config.paths.extractors_config)?;
        Ok(Self::new(factory, &config.extensions, &config.paths.staging_dir))
    }

    pub fn with_staging_dir(mut self, staging_dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = staging_dir.into();
        self
    }

    /// Worker threads to use; values below 1 are treated as 1.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn run(&self, tasks: &[Task]) -> RunSummary {
        self.run_with(tasks, |_| {})
    }

    /// Run every task, calling `on_done` as each one finishes.
    ///
    /// With several jobs `on_done` fires in completion order; the returned
    /// summary is always in task order.
    pub fn run_with<F>(&self, tasks: &[Task], on_done: F) -> RunSummary
    where
        F: Fn(&TaskOutcome) + Sync,
    {
        let start = Instant::now();
        let jobs = self.jobs.min(tasks.len()).max(1);
        info!("Starting run: {} tasks, {} jobs", tasks.len(), jobs);

        let outcomes = if jobs == 1 {
            tasks
                .iter()
                .map(|task| {
                    let outcome = self.process_task(task);
                    on_done(&outcome);
                    outcome
                })
                .collect()
        } else {
            self.run_parallel(tasks, jobs, &on_done)
        };

        let summary = RunSummary {
            outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
        };
        info!(
            "Run finished: {} succeeded, {} failed in {} ms",
            summary.succeeded(),
            summary.failed(),
            summary.duration_ms
        );
        summary
    }

    fn run_parallel<F>(&self, tasks: &[Task], jobs: usize, on_done: &F) -> Vec<TaskOutcome>
    where
        F: Fn(&TaskOutcome) + Sync,
    {
        let next = AtomicUsize::new(0);
        let done = Mutex::new(Vec::with_capacity(tasks.len()));

        thread::scope(|scope| {
            for _ in 0..jobs {
                scope.spawn(|| {
                    loop {
                        let index = next.fetch_add(1, Ordering::Relaxed);
                        let Some(task) = tasks.get(index) else {
                            break;
                        };
                        let outcome = self.process_task(task);
                        on_done(&outcome);
                        done.lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push((index, outcome));
                    }
                });
            }
        });

        let mut done = done.into_inner().unwrap_or_else(PoisonError::into_inner);
        done.sort_by_key(|(index, _)| *index);
        done.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Take one task to a terminal state.
    pub fn process_task(&self, task: &Task) -> TaskOutcome {
        let start = Instant::now();
        info!("Processing {}/{}", task.module_name, task.file_name);

        let status = match self.stage(task) {
            Ok((rows, output)) => {
                info!(
                    "Loaded {}/{}: {} rows -> {}",
                    task.module_name,
                    task.file_name,
                    rows,
                    output.display()
                );
                TaskStatus::Loaded { rows, output }
            }
            Err(failure) => {
                warn!(
                    "Skipping {}/{} ({} failure): {}",
                    task.module_name, task.file_name, failure.kind, failure.error
                );
                TaskStatus::Failed {
                    kind: failure.kind,
                    error: failure.error,
                }
            }
        };

        TaskOutcome {
            task: task.clone(),
            status,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    fn stage(&self, task: &Task) -> Result<(usize, PathBuf), TaskFailure> {
        let format_type = self.extensions.format_for(&task.file_path).ok_or_else(|| {
            TaskFailure::new(
                TaskFailureKind::Unmapped,
                format!("no format mapped for extension of '{}'", task.file_name),
            )
        })?;
        debug!("Classified {} as '{}'", task.file_name, format_type);

        let handler = self.factory.create_extractor(&task.module_name, format_type)?;
        let table = handler.run_flow(&task.file_path)?;

        let output = self
            .staging_dir
            .join(staging::staging_file_name(&task.module_name, &task.file_path)?);
        staging::write_table(&table, &output)?;

        Ok((table.num_rows(), output))
    }
}
