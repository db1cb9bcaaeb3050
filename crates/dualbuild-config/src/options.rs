//! Resolved build configuration and per-call overrides
//!
//! A [`BuildConfig`] is never mutated once handed to the task registry.
//! Every layer (project file, environment, CLI flags, per-task options) is a
//! [`ConfigOverrides`] value and [`BuildConfig::resolve`] produces a new
//! configuration with the overridden keys taking precedence.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Module format a library is published under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// CommonJS, loaded synchronously through `require`
    Cjs,
    /// ECMAScript modules, loaded asynchronously through `import`
    Esm,
}

impl Format {
    /// Both formats, in export-map branch order
    pub const ALL: [Format; 2] = [Format::Cjs, Format::Esm];

    /// Short name, as understood by esbuild's `--format`
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cjs => "cjs",
            Self::Esm => "esm",
        }
    }

    /// Human readable name used in banners
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Cjs => "CommonJS",
            Self::Esm => "ES Modules",
        }
    }

    /// Module kind forced onto the test runner
    pub fn module_kind(&self) -> &'static str {
        match self {
            Self::Cjs => "commonjs",
            Self::Esm => "module",
        }
    }

    /// Export map condition name
    pub fn condition(&self) -> &'static str {
        match self {
            Self::Cjs => "require",
            Self::Esm => "import",
        }
    }

    /// Glob selecting the sources compiled into this format.
    ///
    /// Plain `.ts` files are dual-format, `.cts` and `.mts` are format-specific.
    pub fn source_glob(&self) -> &'static str {
        match self {
            Self::Cjs => "**/*.{ts,cts}",
            Self::Esm => "**/*.{ts,mts}",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Source map emission mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sourcemap {
    /// Separate `.map` file referenced by a trailing comment
    Linked,
    /// Map embedded in the emitted file
    Inline,
    /// Separate `.map` file without a reference comment
    External,
    /// No source maps
    None,
}

impl Sourcemap {
    /// Value for esbuild's `--sourcemap=` flag, `None` when disabled
    pub fn esbuild_value(&self) -> Option<&'static str> {
        match self {
            Self::Linked => Some("linked"),
            Self::Inline => Some("inline"),
            Self::External => Some("external"),
            Self::None => None,
        }
    }

    /// Whether a `.map` file is written next to each output
    pub fn emits_map_file(&self) -> bool {
        matches!(self, Self::Linked | Self::External)
    }
}

/// Options forwarded to the transpiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranspileOptions {
    /// Target platform (default: `node`)
    pub platform: String,
    /// Source map mode (default: `linked`)
    pub sourcemap: Sourcemap,
    /// Embed original sources in source maps (default: `false`)
    pub sources_content: bool,
}

impl Default for TranspileOptions {
    fn default() -> Self {
        Self {
            platform: "node".to_string(),
            sourcemap: Sourcemap::Linked,
            sources_content: false,
        }
    }
}

/// An external command: program plus leading arguments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToolCommand {
    /// Program to execute, looked up in `PATH`
    pub program: String,
    /// Arguments placed before the ones generated by the task
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Create a new tool command
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// A tool resolved through `npx`, never installing on the fly
    fn npx(tool: &str) -> Self {
        Self::new("npx", ["--no", tool])
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Commands used for every external collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub esbuild: ToolCommand,
    pub tsc: ToolCommand,
    pub test_runner: ToolCommand,
    pub coverage: ToolCommand,
    pub eslint: ToolCommand,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            esbuild: ToolCommand::npx("esbuild"),
            tsc: ToolCommand::npx("tsc"),
            test_runner: ToolCommand::new("npx", ["--no", "tsx", "--test"]),
            coverage: ToolCommand::new("npx", ["--no", "c8", "report"]),
            eslint: ToolCommand::npx("eslint"),
        }
    }
}

/// Extra file discovery: globs under a directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FindSpec {
    /// Glob patterns, relative to `directory`
    pub globs: Vec<String>,
    /// Directory to search (relative to the project root)
    pub directory: PathBuf,
    /// Glob patterns to exclude
    #[serde(default)]
    pub ignore: Vec<String>,
}

/// Coverage thresholds, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageThresholds {
    /// Minimum overall coverage (default: 100)
    pub minimum: f64,
    /// Minimum per-file coverage (default: 100)
    pub minimum_file: f64,
    /// Optimal overall coverage, warns when missed (default: none)
    pub optimal: Option<f64>,
    /// Optimal per-file coverage, warns when missed (default: none)
    pub optimal_file: Option<f64>,
}

impl Default for CoverageThresholds {
    fn default() -> Self {
        Self {
            minimum: 100.0,
            minimum_file: 100.0,
            optimal: None,
            optimal_file: None,
        }
    }
}

/// Fully resolved build configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Project root, every relative directory is resolved against it
    pub root: PathBuf,
    /// Original sources (default: `src`)
    pub source_dir: PathBuf,
    /// Transpiled output (default: `dist`)
    pub dest_dir: PathBuf,
    /// Test files (default: `test`)
    pub test_dir: PathBuf,
    /// Coverage report (default: `coverage`)
    pub coverage_dir: PathBuf,
    /// Raw coverage data (default: `.coverage-data`)
    pub coverage_data_dir: PathBuf,
    /// Extra declarations used while type-checking (default: `types`)
    pub extra_types_dir: PathBuf,
    /// `tsconfig.json` used for declarations (default: `tsconfig.json`)
    pub tsconfig_json: PathBuf,
    /// Source manifest (default: `package.json`)
    pub package_json: PathBuf,
    /// Output manifest (default: same as `package_json`)
    pub output_package_json: Option<PathBuf>,
    /// Extension of CommonJS outputs (default: `.cjs`)
    pub cjs_extension: String,
    /// Extension of ES module outputs (default: `.mjs`)
    pub esm_extension: String,
    /// Emit CommonJS (default: `true`)
    pub cjs: bool,
    /// Emit ES modules (default: `true`)
    pub esm: bool,
    /// Run composite tasks in parallel (default: `false`)
    pub parallelize: bool,
    /// Print banners (default: `!parallelize`)
    pub banners: Option<bool>,
    /// Test files, relative to `test_dir` (default: `**/*.test.{ts,cts,mts}`)
    pub test_glob: String,
    /// Files exported in the manifest, relative to `dest_dir` (default: `index.*`)
    pub exports_glob: String,
    /// Additional exported files
    pub exports_globs: Vec<String>,
    /// Basename collapsed into its directory in export keys (default: `index`)
    pub index_name: String,
    /// Collect coverage while testing (default: `true`)
    pub coverage: bool,
    /// Coverage thresholds
    pub thresholds: CoverageThresholds,
    /// Extra files to lint
    pub extra_lint: Vec<FindSpec>,
    /// Extra files to include in coverage reports
    pub extra_coverage: Vec<FindSpec>,
    /// Transpiler options
    pub transpile: TranspileOptions,
    /// External tool commands
    pub tools: ToolsConfig,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            source_dir: PathBuf::from("src"),
            dest_dir: PathBuf::from("dist"),
            test_dir: PathBuf::from("test"),
            coverage_dir: PathBuf::from("coverage"),
            coverage_data_dir: PathBuf::from(".coverage-data"),
            extra_types_dir: PathBuf::from("types"),
            tsconfig_json: PathBuf::from("tsconfig.json"),
            package_json: PathBuf::from("package.json"),
            output_package_json: None,
            cjs_extension: ".cjs".to_string(),
            esm_extension: ".mjs".to_string(),
            cjs: true,
            esm: true,
            parallelize: false,
            banners: None,
            test_glob: "**/*.test.{ts,cts,mts}".to_string(),
            exports_glob: "index.*".to_string(),
            exports_globs: Vec::new(),
            index_name: "index".to_string(),
            coverage: true,
            thresholds: CoverageThresholds::default(),
            extra_lint: Vec::new(),
            extra_coverage: Vec::new(),
            transpile: TranspileOptions::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl BuildConfig {
    /// Default configuration rooted at `root`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Produce a new configuration with `overrides` applied.
    ///
    /// `self` is left untouched, so the same base can be resolved concurrently
    /// with different overrides.
    pub fn resolve(&self, overrides: &ConfigOverrides) -> BuildConfig {
        let mut config = self.clone();

        macro_rules! apply {
            ($($field:ident),* $(,)?) => {
                $(
                    if let Some(value) = &overrides.$field {
                        config.$field = value.clone();
                    }
                )*
            };
        }

        apply!(
            root,
            source_dir,
            dest_dir,
            test_dir,
            coverage_dir,
            coverage_data_dir,
            extra_types_dir,
            tsconfig_json,
            package_json,
            cjs_extension,
            esm_extension,
            cjs,
            esm,
            parallelize,
            test_glob,
            exports_glob,
            exports_globs,
            index_name,
            coverage,
            extra_lint,
            extra_coverage,
        );

        if let Some(path) = &overrides.output_package_json {
            config.output_package_json = Some(path.clone());
        }
        if let Some(banners) = overrides.banners {
            config.banners = Some(banners);
        }

        if let Some(value) = overrides.minimum_coverage {
            config.thresholds.minimum = value;
        }
        if let Some(value) = overrides.minimum_file_coverage {
            config.thresholds.minimum_file = value;
        }
        if let Some(value) = overrides.optimal_coverage {
            config.thresholds.optimal = Some(value);
        }
        if let Some(value) = overrides.optimal_file_coverage {
            config.thresholds.optimal_file = Some(value);
        }

        if let Some(platform) = &overrides.platform {
            config.transpile.platform = platform.clone();
        }
        if let Some(sourcemap) = overrides.sourcemap {
            config.transpile.sourcemap = sourcemap;
        }
        if let Some(sources_content) = overrides.sources_content {
            config.transpile.sources_content = sources_content;
        }

        if let Some(command) = &overrides.esbuild {
            config.tools.esbuild = command.clone();
        }
        if let Some(command) = &overrides.tsc {
            config.tools.tsc = command.clone();
        }
        if let Some(command) = &overrides.test_runner {
            config.tools.test_runner = command.clone();
        }
        if let Some(command) = &overrides.coverage_reporter {
            config.tools.coverage = command.clone();
        }
        if let Some(command) = &overrides.eslint {
            config.tools.eslint = command.clone();
        }

        config
    }

    /// Validate values that would otherwise fail deep inside a task
    pub fn validate(&self) -> ConfigResult<()> {
        for (field, extension) in [
            ("cjs_extension", &self.cjs_extension),
            ("esm_extension", &self.esm_extension),
        ] {
            if extension.len() < 2 || !extension.starts_with('.') {
                return Err(ConfigError::invalid(
                    field,
                    format!("'{}' must start with '.' and name an extension", extension),
                ));
            }
        }

        if self.cjs_extension == self.esm_extension {
            return Err(ConfigError::invalid(
                "esm_extension",
                "CommonJS and ES module extensions must differ",
            ));
        }

        if self.index_name.is_empty() || self.index_name.contains('/') {
            return Err(ConfigError::invalid(
                "index_name",
                "must be a plain file basename",
            ));
        }

        for (field, value) in [
            ("minimum_coverage", Some(self.thresholds.minimum)),
            ("minimum_file_coverage", Some(self.thresholds.minimum_file)),
            ("optimal_coverage", self.thresholds.optimal),
            ("optimal_file_coverage", self.thresholds.optimal_file),
        ] {
            if let Some(value) = value {
                if !(0.0..=100.0).contains(&value) {
                    return Err(ConfigError::invalid(
                        field,
                        format!("{} is not a percentage", value),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolve a path against the project root (absolute paths are kept)
    pub fn path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    pub fn source_path(&self) -> PathBuf {
        self.path(&self.source_dir)
    }

    pub fn dest_path(&self) -> PathBuf {
        self.path(&self.dest_dir)
    }

    pub fn test_path(&self) -> PathBuf {
        self.path(&self.test_dir)
    }

    pub fn coverage_path(&self) -> PathBuf {
        self.path(&self.coverage_dir)
    }

    pub fn coverage_data_path(&self) -> PathBuf {
        self.path(&self.coverage_data_dir)
    }

    pub fn extra_types_path(&self) -> PathBuf {
        self.path(&self.extra_types_dir)
    }

    pub fn tsconfig_path(&self) -> PathBuf {
        self.path(&self.tsconfig_json)
    }

    pub fn package_json_path(&self) -> PathBuf {
        self.path(&self.package_json)
    }

    /// Output manifest, falling back to the source manifest
    pub fn output_package_json_path(&self) -> PathBuf {
        match &self.output_package_json {
            Some(path) => self.path(path),
            None => self.package_json_path(),
        }
    }

    /// Whether banners are printed (defaults to off when parallelized)
    pub fn banners_enabled(&self) -> bool {
        self.banners.unwrap_or(!self.parallelize)
    }

    /// Whether the given format is enabled
    pub fn is_enabled(&self, format: Format) -> bool {
        match format {
            Format::Cjs => self.cjs,
            Format::Esm => self.esm,
        }
    }

    /// Runtime extension of the given format
    pub fn extension(&self, format: Format) -> &str {
        match format {
            Format::Cjs => &self.cjs_extension,
            Format::Esm => &self.esm_extension,
        }
    }

    /// Enabled formats, in branch order
    pub fn formats(&self) -> impl Iterator<Item = Format> + '_ {
        Format::ALL.into_iter().filter(|f| self.is_enabled(*f))
    }
}

/// A partial configuration; `None` keeps the base value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub root: Option<PathBuf>,
    pub source_dir: Option<PathBuf>,
    pub dest_dir: Option<PathBuf>,
    pub test_dir: Option<PathBuf>,
    pub coverage_dir: Option<PathBuf>,
    pub coverage_data_dir: Option<PathBuf>,
    pub extra_types_dir: Option<PathBuf>,
    pub tsconfig_json: Option<PathBuf>,
    pub package_json: Option<PathBuf>,
    pub output_package_json: Option<PathBuf>,
    pub cjs_extension: Option<String>,
    pub esm_extension: Option<String>,
    pub cjs: Option<bool>,
    pub esm: Option<bool>,
    pub parallelize: Option<bool>,
    pub banners: Option<bool>,
    pub test_glob: Option<String>,
    pub exports_glob: Option<String>,
    pub exports_globs: Option<Vec<String>>,
    pub index_name: Option<String>,
    pub coverage: Option<bool>,
    pub minimum_coverage: Option<f64>,
    pub minimum_file_coverage: Option<f64>,
    pub optimal_coverage: Option<f64>,
    pub optimal_file_coverage: Option<f64>,
    pub extra_lint: Option<Vec<FindSpec>>,
    pub extra_coverage: Option<Vec<FindSpec>>,
    pub platform: Option<String>,
    pub sourcemap: Option<Sourcemap>,
    pub sources_content: Option<bool>,
    pub esbuild: Option<ToolCommand>,
    pub tsc: Option<ToolCommand>,
    pub test_runner: Option<ToolCommand>,
    pub coverage_reporter: Option<ToolCommand>,
    pub eslint: Option<ToolCommand>,
}

impl ConfigOverrides {
    /// Layer `other` on top of `self`; values set in `other` win
    pub fn merge(&mut self, other: &ConfigOverrides) {
        macro_rules! take {
            ($($field:ident),* $(,)?) => {
                $(
                    if other.$field.is_some() {
                        self.$field = other.$field.clone();
                    }
                )*
            };
        }

        take!(
            root,
            source_dir,
            dest_dir,
            test_dir,
            coverage_dir,
            coverage_data_dir,
            extra_types_dir,
            tsconfig_json,
            package_json,
            output_package_json,
            cjs_extension,
            esm_extension,
            cjs,
            esm,
            parallelize,
            banners,
            test_glob,
            exports_glob,
            exports_globs,
            index_name,
            coverage,
            minimum_coverage,
            minimum_file_coverage,
            optimal_coverage,
            optimal_file_coverage,
            extra_lint,
            extra_coverage,
            platform,
            sourcemap,
            sources_content,
            esbuild,
            tsc,
            test_runner,
            coverage_reporter,
            eslint,
        );
    }

    /// Whether no value is overridden
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
