//! Task command - run a build task against the project

use anyhow::{Context, Result};
use dualbuild_config::{ConfigLoader, ConfigOverrides};
use dualbuild_tasks::{TaskName, TaskOutput, Tasks};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info};

/// Task command arguments
#[derive(Debug, Clone)]
pub struct RunArgs {
    /// Task to run
    pub task: TaskName,
    /// Where to start looking for dualbuild.toml
    pub project_dir: PathBuf,
    /// Command line overrides
    pub overrides: ConfigOverrides,
}

/// Run the task command
pub async fn run(args: RunArgs) -> Result<()> {
    let loaded = ConfigLoader::new()
        .load_from_directory(&args.project_dir)
        .context("Failed to load configuration")?;

    match loaded.config_file {
        Some(ref file) => debug!("Using {}", file.display()),
        None => debug!("No dualbuild.toml found, using defaults"),
    }

    let config = loaded.build_config(&args.overrides);
    debug!("Project root: {}", config.root.display());

    let tasks = Tasks::external(config);
    let start = Instant::now();

    let output = tasks
        .run(args.task, None)
        .await
        .with_context(|| format!("Task '{}' failed", args.task))?;

    if let TaskOutput::Artifacts(ref artifacts) = output {
        debug!(
            "{} produced {} files in {}",
            args.task,
            artifacts.len(),
            artifacts.directory().display()
        );
    }
    info!(
        "Task '{}' finished in {:.2}s",
        args.task,
        start.elapsed().as_secs_f64()
    );

    Ok(())
}
