//! Project initialization command (dualbuild init)

use anyhow::{Context, Result};
use dualbuild_tasks::{Bootstrap, Overwrite, ResourceSource};
use std::path::PathBuf;
use tracing::info;

/// Package name written to `devDependencies`
pub const PACKAGE_NAME: &str = "dualbuild";

/// Arguments for the init command
#[derive(Debug, Clone)]
pub struct InitArgs {
    /// Project to bootstrap
    pub project_dir: PathBuf,
    /// Starter files, relative to `project_dir`; bundled ones when `None`
    pub resources: Option<PathBuf>,
    /// What to do with files that already exist
    pub overwrite: Overwrite,
}

/// Run the init command
pub async fn run(args: InitArgs) -> Result<()> {
    let source = match args.resources {
        Some(directory) => {
            let directory = args.project_dir.join(directory);
            if !directory.is_dir() {
                anyhow::bail!("Resources directory not found: {}", directory.display());
            }
            ResourceSource::Directory(directory)
        }
        None => ResourceSource::Bundled,
    };

    let copied = Bootstrap::new(&args.project_dir)
        .with_overwrite(args.overwrite)
        .bootstrap(&source, PACKAGE_NAME, env!("CARGO_PKG_VERSION"))
        .await
        .with_context(|| format!("Failed to initialize {}", args.project_dir.display()))?;

    info!(
        "Initialized {} ({} files added)",
        args.project_dir.display(),
        copied.len()
    );
    Ok(())
}
