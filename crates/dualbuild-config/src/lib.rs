//! dualbuild configuration system
//!
//! Provides the configuration model shared by every build task:
//! - The resolved [`BuildConfig`] (directories, extensions, globs, thresholds, tools)
//! - Partial [`ConfigOverrides`] layered over it with a pure [`BuildConfig::resolve`]
//! - Project configuration files (`dualbuild.toml`)
//! - Environment variable overrides (`DUALBUILD_*`)
//!
//! # Configuration Hierarchy
//!
//! Configuration is resolved in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Project config (`./dualbuild.toml`, searched upwards)
//! 3. Environment variables (`DUALBUILD_*`)
//! 4. CLI flags
//! 5. Per-task overrides
//!
//! # Example
//!
//! ```no_run
//! use dualbuild_config::{ConfigLoader, ConfigOverrides};
//! use std::path::Path;
//!
//! let loaded = ConfigLoader::new().load_from_directory(Path::new(".")).unwrap();
//! let config = loaded.build_config(&ConfigOverrides::default());
//! println!("transpiling into {}", config.dest_path().display());
//! ```

pub mod loader;
pub mod options;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ConfigError {
    /// Create an invalid value error
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{ConfigLoader, LoadedConfig, CONFIG_FILE_NAME};
pub use options::{
    BuildConfig, ConfigOverrides, CoverageThresholds, FindSpec, Format, Sourcemap, ToolCommand,
    ToolsConfig, TranspileOptions,
};
pub use project::ProjectFile;
