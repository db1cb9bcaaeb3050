//! Command line configuration flags
//!
//! Flags are the last configuration layer: anything set here wins over
//! `dualbuild.toml` and `DUALBUILD_*` variables.

use clap::Args;
use dualbuild_config::ConfigOverrides;
use std::path::PathBuf;

/// Build flags shared by every task
#[derive(Debug, Clone, Default, Args)]
pub struct BuildFlags {
    /// Output directory for transpiled files
    #[arg(long, value_name = "DIR")]
    pub dest_dir: Option<PathBuf>,
    /// Skip the CommonJS output and tests
    #[arg(long)]
    pub no_cjs: bool,
    /// Skip the ES module output and tests
    #[arg(long)]
    pub no_esm: bool,
    /// Run tests without collecting coverage
    #[arg(long)]
    pub no_coverage: bool,
    /// Run independent tasks concurrently
    #[arg(long)]
    pub parallel: bool,
    /// Glob selecting the modules to export (relative to the output directory)
    #[arg(long, value_name = "GLOB")]
    pub exports_glob: Option<String>,
    /// Write the updated package.json here instead of in place
    #[arg(long, value_name = "FILE")]
    pub output_package_json: Option<PathBuf>,
}

impl BuildFlags {
    /// Only flags actually given become overrides
    pub fn to_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            dest_dir: self.dest_dir.clone(),
            cjs: self.no_cjs.then_some(false),
            esm: self.no_esm.then_some(false),
            coverage: self.no_coverage.then_some(false),
            parallelize: self.parallel.then_some(true),
            exports_glob: self.exports_glob.clone(),
            output_package_json: self.output_package_json.clone(),
            ..Default::default()
        }
    }
}

/// Log level implied by `-v` / `-q`, unless `RUST_LOG` says otherwise
pub fn log_level(verbose: bool, quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    }
}
