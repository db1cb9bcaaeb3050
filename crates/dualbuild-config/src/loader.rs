//! Configuration Loader
//!
//! Handles locating `dualbuild.toml` and layering configuration sources with
//! proper precedence:
//! 1. Built-in defaults - lowest priority
//! 2. Project config (dualbuild.toml) - overrides defaults
//! 3. Environment variables (DUALBUILD_*) - overrides project
//! 4. CLI flags - highest priority (handled by caller)

use crate::options::{BuildConfig, ConfigOverrides};
use crate::project::ProjectFile;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "dualbuild.toml";

/// Configuration loader
pub struct ConfigLoader {
    /// Read `DUALBUILD_*` variables
    use_env: bool,
}

/// Configuration sources found for a project
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Project root (directory holding dualbuild.toml, or the start directory)
    pub project_root: PathBuf,
    /// The project file, when one was found
    pub config_file: Option<PathBuf>,
    /// Project file and environment layers, merged
    pub overrides: ConfigOverrides,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { use_env: true }
    }

    /// Ignore environment variables (useful for tests)
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find dualbuild.toml. Without one, the
    /// start directory becomes the project root and only defaults and the
    /// environment apply.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<LoadedConfig> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                return self.load_from_file(&config_path);
            }

            match current.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    current = parent.to_path_buf();
                }
                _ => break,
            }
        }

        let mut overrides = ConfigOverrides::default();
        if self.use_env {
            overrides.merge(&env_overrides()?);
        }

        Ok(LoadedConfig {
            project_root: start_dir.to_path_buf(),
            config_file: None,
            overrides,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<LoadedConfig> {
        let project = ProjectFile::load_from_file(config_path)?;
        let mut overrides = project.to_overrides();

        if self.use_env {
            overrides.merge(&env_overrides()?);
        }

        let project_root = config_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(LoadedConfig {
            project_root,
            config_file: Some(config_path.to_path_buf()),
            overrides,
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadedConfig {
    /// Resolve the final configuration, with `cli` taking highest precedence
    pub fn build_config(&self, cli: &ConfigOverrides) -> BuildConfig {
        BuildConfig::with_root(&self.project_root)
            .resolve(&self.overrides)
            .resolve(cli)
    }
}

/// Read `DUALBUILD_*` environment overrides
///
/// Supported variables: `DUALBUILD_SOURCE_DIR`, `DUALBUILD_DEST_DIR`,
/// `DUALBUILD_TEST_DIR`, `DUALBUILD_CJS`, `DUALBUILD_ESM`,
/// `DUALBUILD_COVERAGE`, `DUALBUILD_PARALLELIZE`, `DUALBUILD_BANNERS`.
pub fn env_overrides() -> ConfigResult<ConfigOverrides> {
    Ok(ConfigOverrides {
        source_dir: env::var_os("DUALBUILD_SOURCE_DIR").map(PathBuf::from),
        dest_dir: env::var_os("DUALBUILD_DEST_DIR").map(PathBuf::from),
        test_dir: env::var_os("DUALBUILD_TEST_DIR").map(PathBuf::from),
        cjs: env_bool("DUALBUILD_CJS")?,
        esm: env_bool("DUALBUILD_ESM")?,
        coverage: env_bool("DUALBUILD_COVERAGE")?,
        parallelize: env_bool("DUALBUILD_PARALLELIZE")?,
        banners: env_bool("DUALBUILD_BANNERS")?,
        ..Default::default()
    })
}

fn env_bool(name: &str) -> ConfigResult<Option<bool>> {
    match env::var(name) {
        Ok(value) => parse_bool(&value)
            .map(Some)
            .ok_or_else(|| ConfigError::invalid(name, format!("'{}' is not a boolean", value))),
        Err(_) => Ok(None),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("1"), Some(true));
        assert_eq!(parse_bool(" Yes "), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
