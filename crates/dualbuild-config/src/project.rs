//! Project Configuration (dualbuild.toml)
//!
//! Handles project-level configuration stored in `dualbuild.toml` at the
//! project root. Every key is optional; the file only records departures
//! from the built-in defaults.

use crate::options::{ConfigOverrides, FindSpec, Sourcemap, ToolCommand};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from dualbuild.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    /// Directories, formats and composite behaviour
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build: Option<BuildSection>,

    /// Transpiler options
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transpile: Option<TranspileSection>,

    /// Test discovery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<TestSection>,

    /// Coverage collection and thresholds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coverage: Option<CoverageSection>,

    /// Linting inputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lint: Option<LintSection>,

    /// Manifest export map
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exports: Option<ExportsSection>,

    /// External tool commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsSection>,
}

/// `[build]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BuildSection {
    pub source_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub extra_types_dir: Option<PathBuf>,
    pub tsconfig: Option<PathBuf>,
    pub cjs: Option<bool>,
    pub esm: Option<bool>,
    pub cjs_extension: Option<String>,
    pub esm_extension: Option<String>,
    pub parallelize: Option<bool>,
    pub banners: Option<bool>,
}

/// `[transpile]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TranspileSection {
    pub platform: Option<String>,
    pub sourcemap: Option<Sourcemap>,
    pub sources_content: Option<bool>,
}

/// `[test]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct TestSection {
    pub dir: Option<PathBuf>,
    pub glob: Option<String>,
}

/// `[coverage]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct CoverageSection {
    pub enabled: Option<bool>,
    pub dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub minimum: Option<f64>,
    pub minimum_file: Option<f64>,
    pub optimal: Option<f64>,
    pub optimal_file: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<FindSpec>,
}

/// `[lint]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LintSection {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<FindSpec>,
}

/// `[exports]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ExportsSection {
    pub glob: Option<String>,
    pub globs: Option<Vec<String>>,
    pub index_name: Option<String>,
    pub package_json: Option<PathBuf>,
    pub output_package_json: Option<PathBuf>,
}

/// `[tools]` section, one optional command per collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ToolsSection {
    pub esbuild: Option<ToolCommand>,
    pub tsc: Option<ToolCommand>,
    pub test_runner: Option<ToolCommand>,
    pub coverage: Option<ToolCommand>,
    pub eslint: Option<ToolCommand>,
}

impl ProjectFile {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content, path)
    }

    /// Parse project configuration; `path` is only used in error messages
    pub fn parse(content: &str, path: &Path) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }

    /// Flatten the sections into configuration overrides
    pub fn to_overrides(&self) -> ConfigOverrides {
        let mut overrides = ConfigOverrides::default();

        if let Some(build) = &self.build {
            overrides.source_dir = build.source_dir.clone();
            overrides.dest_dir = build.dest_dir.clone();
            overrides.extra_types_dir = build.extra_types_dir.clone();
            overrides.tsconfig_json = build.tsconfig.clone();
            overrides.cjs = build.cjs;
            overrides.esm = build.esm;
            overrides.cjs_extension = build.cjs_extension.clone();
            overrides.esm_extension = build.esm_extension.clone();
            overrides.parallelize = build.parallelize;
            overrides.banners = build.banners;
        }

        if let Some(transpile) = &self.transpile {
            overrides.platform = transpile.platform.clone();
            overrides.sourcemap = transpile.sourcemap;
            overrides.sources_content = transpile.sources_content;
        }

        if let Some(test) = &self.test {
            overrides.test_dir = test.dir.clone();
            overrides.test_glob = test.glob.clone();
        }

        if let Some(coverage) = &self.coverage {
            overrides.coverage = coverage.enabled;
            overrides.coverage_dir = coverage.dir.clone();
            overrides.coverage_data_dir = coverage.data_dir.clone();
            overrides.minimum_coverage = coverage.minimum;
            overrides.minimum_file_coverage = coverage.minimum_file;
            overrides.optimal_coverage = coverage.optimal;
            overrides.optimal_file_coverage = coverage.optimal_file;
            if !coverage.extra.is_empty() {
                overrides.extra_coverage = Some(coverage.extra.clone());
            }
        }

        if let Some(lint) = &self.lint {
            if !lint.extra.is_empty() {
                overrides.extra_lint = Some(lint.extra.clone());
            }
        }

        if let Some(exports) = &self.exports {
            overrides.exports_glob = exports.glob.clone();
            overrides.exports_globs = exports.globs.clone();
            overrides.index_name = exports.index_name.clone();
            overrides.package_json = exports.package_json.clone();
            overrides.output_package_json = exports.output_package_json.clone();
        }

        if let Some(tools) = &self.tools {
            overrides.esbuild = tools.esbuild.clone();
            overrides.tsc = tools.tsc.clone();
            overrides.test_runner = tools.test_runner.clone();
            overrides.coverage_reporter = tools.coverage.clone();
            overrides.eslint = tools.eslint.clone();
        }

        overrides
    }
}
