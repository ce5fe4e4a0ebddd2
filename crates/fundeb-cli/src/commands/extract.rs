//! Extract command - stage a single file.

use std::path::PathBuf;

use clap::Args;
use console::style;

use fundeb_core::{Pipeline, Task, TaskStatus};

use super::load_config;

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Module the file belongs to (e.g. conta_corrente)
    #[arg(required = true)]
    module: String,

    /// Source file
    #[arg(required = true)]
    input: PathBuf,

    /// Staging directory (default: from config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut pipeline = Pipeline::from_config(&config)?;
    if let Some(output_dir) = args.output_dir {
        pipeline = pipeline.with_staging_dir(output_dir);
    }

    let outcome = pipeline.process_task(&Task::new(args.module, args.input));
    match outcome.status {
        TaskStatus::Loaded { rows, output } => {
            println!(
                "{} Staged {} rows from {} to {} ({} ms)",
                style("✓").green(),
                rows,
                outcome.task.file_name,
                output.display(),
                outcome.duration_ms
            );
            Ok(())
        }
        TaskStatus::Failed { kind, error } => {
            anyhow::bail!("{} failure for {}: {}", kind, outcome.task.file_name, error)
        }
    }
}
