//! Run command - discover, extract and stage every configured source file.

use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use fundeb_core::{discover_tasks, run_transform, Pipeline, RunSummary, TaskStatus};

use super::load_config;

/// Arguments for the run command.
#[derive(Args)]
pub struct RunArgs {
    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "1")]
    jobs: usize,

    /// Do not trigger the downstream transformation
    #[arg(long)]
    skip_transform: bool,
}

pub async fn run(args: RunArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?.with_jobs(args.jobs);

    let tasks = discover_tasks(&config.paths.source_dir, &config.discovery);
    println!(
        "{} Found {} files to process under {}",
        style("ℹ").blue(),
        tasks.len(),
        config.paths.source_dir.display()
    );

    let pb = ProgressBar::new(tasks.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
            )?
            .progress_chars("=>-"),
    );

    let summary = pipeline.run_with(&tasks, |outcome| {
        pb.set_message(outcome.task.file_name.clone());
        pb.inc(1);
    });

    pb.finish_and_clear();
    print_summary(&summary);

    if config.transform.enabled && !args.skip_transform {
        info!("Triggering downstream transformation");
        match run_transform(&config.transform) {
            Ok(output) => {
                debug!("Transform output:\n{}", output.stdout);
                println!("{} Transformation complete", style("✓").green());
            }
            Err(e) => {
                eprintln!("{} Transformation failed: {}", style("✗").red(), e);
            }
        }
    }

    println!();
    println!(
        "{} Finished in {:.2}s",
        style("✓").green(),
        start.elapsed().as_secs_f64()
    );

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    for outcome in &summary.outcomes {
        match &outcome.status {
            TaskStatus::Loaded { rows, output } => println!(
                "  {} {}/{} ({} rows) -> {}",
                style("✓").green(),
                outcome.task.module_name,
                outcome.task.file_name,
                rows,
                output.display()
            ),
            TaskStatus::Failed { kind, error } => println!(
                "  {} {}/{} [{}] {}",
                style("✗").red(),
                outcome.task.module_name,
                outcome.task.file_name,
                kind,
                error
            ),
        }
    }

    println!();
    println!("{}", style("Summary:").bold());
    println!("  Files:     {}", summary.total());
    println!("  Succeeded: {}", style(summary.succeeded()).green());
    if summary.failed() > 0 {
        println!("  Failed:    {}", style(summary.failed()).red());
    } else {
        println!("  Failed:    0");
    }
}
