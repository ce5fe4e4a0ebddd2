//! Discover command - list the files a run would process.

use std::fs;

use console::style;

use fundeb_core::discover_tasks;
use fundeb_core::discovery::human_size;

use super::load_config;

pub async fn run(config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let tasks = discover_tasks(&config.paths.source_dir, &config.discovery);

    if tasks.is_empty() {
        println!(
            "{} No files found under {}",
            style("ℹ").blue(),
            config.paths.source_dir.display()
        );
        return Ok(());
    }

    println!("{}", style("Discovered files:").bold());
    for task in &tasks {
        let size = fs::metadata(&task.file_path)
            .map(|m| human_size(m.len()))
            .unwrap_or_else(|_| "?".to_string());
        let format = config
            .extensions
            .format_for(&task.file_path)
            .unwrap_or("unmapped");

        println!(
            "  {:<22} {:<40} {:>10}  {}",
            task.module_name,
            task.file_name,
            size,
            style(format).cyan()
        );
    }
    println!();
    println!("{} files", tasks.len());

    Ok(())
}
