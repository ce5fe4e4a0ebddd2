//! Downstream transformation trigger.

use std::process::Command;

use tracing::{info, warn};

use crate::error::TransformError;
use crate::models::config::TransformConfig;

/// Captured result of a successful transform run.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run the configured command in its working directory and wait for it.
pub fn run_transform(config: &TransformConfig) -> Result<TransformOutput, TransformError> {
    if !config.working_dir.is_dir() {
        return Err(TransformError::MissingWorkingDir(config.working_dir.clone()));
    }

    let cmdline = std::iter::once(config.command.as_str())
        .chain(config.args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ");
    info!("Running '{}' in {}", cmdline, config.working_dir.display());

    let output = Command::new(&config.command)
        .args(&config.args)
        .current_dir(&config.working_dir)
        .output()
        .map_err(|source| TransformError::Spawn {
            command: cmdline.clone(),
            source,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        warn!("'{}' failed: {}", cmdline, stderr.trim());
        return Err(TransformError::Failed {
            command: cmdline,
            code: output.status.code(),
        });
    }

    Ok(TransformOutput { stdout, stderr })
}
