//! External collaborators
//!
//! The build tasks never spawn tools directly. They call one of the traits
//! below through a [`Toolchain`], which by default binds each trait to a
//! process-spawning implementation ([`external`]) and can be swapped for
//! in-process fakes.

pub mod extensions;
pub mod external;
pub mod process;

use crate::artifacts::ArtifactSet;
use crate::error::BuildResult;
use async_trait::async_trait;
use dualbuild_config::{CoverageThresholds, Format, ToolsConfig, TranspileOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use process::{ToolInvocation, ToolOutcome};

/// Compile a set of sources into one module format
#[derive(Debug, Clone)]
pub struct TranspileRequest<'a> {
    /// Project root, the working directory of the tool
    pub root: &'a Path,
    /// Sources, relative to `sources.directory()`
    pub sources: &'a ArtifactSet,
    pub format: Format,
    pub out_dir: &'a Path,
    /// Extension replacing `.js` on every output
    pub out_extension: &'a str,
    pub options: &'a TranspileOptions,
}

/// Whether the type checker writes declarations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeCheckMode {
    /// Emit declarations only, into `out_dir`, mirroring paths under `root_dir`
    Emit { out_dir: PathBuf, root_dir: PathBuf },
    /// Check without writing anything
    NoEmit,
}

#[derive(Debug, Clone)]
pub struct TypeCheckRequest<'a> {
    pub root: &'a Path,
    pub files: &'a ArtifactSet,
    /// Configuration extended by the check (may not exist)
    pub tsconfig: &'a Path,
    pub mode: TypeCheckMode,
    /// Extra declarations to include, when the directory exists
    pub extra_types_dir: Option<&'a Path>,
}

#[derive(Debug, Clone)]
pub struct TestRequest<'a> {
    pub root: &'a Path,
    pub files: &'a ArtifactSet,
    /// Module convention forced onto the runner
    pub format: Format,
    /// Where raw coverage data is collected, when enabled
    pub coverage_dir: Option<&'a Path>,
}

#[derive(Debug, Clone)]
pub struct CoverageRequest<'a> {
    pub root: &'a Path,
    /// Files the report covers
    pub sources: &'a ArtifactSet,
    pub data_dir: &'a Path,
    pub report_dir: &'a Path,
    pub thresholds: &'a CoverageThresholds,
}

#[derive(Debug, Clone)]
pub struct LintRequest<'a> {
    pub root: &'a Path,
    pub files: &'a ArtifactSet,
}

/// Compiles TypeScript into JavaScript
#[async_trait]
pub trait Transpiler: Send + Sync {
    /// Returns the emitted files, based at `out_dir`
    async fn transpile(&self, request: TranspileRequest<'_>) -> BuildResult<ArtifactSet>;
}

/// Checks types and emits declarations
#[async_trait]
pub trait TypeChecker: Send + Sync {
    /// Returns emitted declarations (empty in [`TypeCheckMode::NoEmit`])
    async fn check(&self, request: TypeCheckRequest<'_>) -> BuildResult<ArtifactSet>;
}

/// Runs test files
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(&self, request: TestRequest<'_>) -> BuildResult<()>;
}

/// Turns collected coverage data into a report and checks thresholds
#[async_trait]
pub trait CoverageReporter: Send + Sync {
    /// Returns the report files, based at `report_dir`
    async fn report(&self, request: CoverageRequest<'_>) -> BuildResult<ArtifactSet>;
}

/// Lints source files
#[async_trait]
pub trait Linter: Send + Sync {
    async fn lint(&self, request: LintRequest<'_>) -> BuildResult<()>;
}

/// The set of collaborators used by the build tasks
#[derive(Clone)]
pub struct Toolchain {
    pub transpiler: Arc<dyn Transpiler>,
    pub type_checker: Arc<dyn TypeChecker>,
    pub test_runner: Arc<dyn TestRunner>,
    pub coverage_reporter: Arc<dyn CoverageReporter>,
    pub linter: Arc<dyn Linter>,
}

impl Toolchain {
    /// Process-spawning collaborators using the configured commands
    pub fn external(tools: &ToolsConfig) -> Self {
        Self {
            transpiler: Arc::new(external::Esbuild::new(tools.esbuild.clone())),
            type_checker: Arc::new(external::Tsc::new(tools.tsc.clone())),
            test_runner: Arc::new(external::NodeTestRunner::new(tools.test_runner.clone())),
            coverage_reporter: Arc::new(external::C8::new(tools.coverage.clone())),
            linter: Arc::new(external::Eslint::new(tools.eslint.clone())),
        }
    }

    pub fn with_transpiler(mut self, transpiler: impl Transpiler + 'static) -> Self {
        self.transpiler = Arc::new(transpiler);
        self
    }

    pub fn with_type_checker(mut self, type_checker: impl TypeChecker + 'static) -> Self {
        self.type_checker = Arc::new(type_checker);
        self
    }

    pub fn with_test_runner(mut self, test_runner: impl TestRunner + 'static) -> Self {
        self.test_runner = Arc::new(test_runner);
        self
    }

    pub fn with_coverage_reporter(mut self, reporter: impl CoverageReporter + 'static) -> Self {
        self.coverage_reporter = Arc::new(reporter);
        self
    }

    pub fn with_linter(mut self, linter: impl Linter + 'static) -> Self {
        self.linter = Arc::new(linter);
        self
    }
}

impl std::fmt::Debug for Toolchain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolchain").finish_non_exhaustive()
    }
}

/// TypeScript source extensions and the JavaScript extension each compiles to
const SOURCE_EXTENSIONS: [(&str, &str); 3] = [(".cts", ".cjs"), (".mts", ".mjs"), (".ts", ".js")];

/// Output path for a TypeScript source with the given replacement extension.
///
/// `extension` receives the JavaScript extension the source would naturally
/// compile to (`.js`, `.cjs` or `.mjs`).
pub fn output_path(source: &Path, extension: impl Fn(&str) -> String) -> PathBuf {
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    for (ts, js) in SOURCE_EXTENSIONS {
        if let Some(stem) = name.strip_suffix(ts) {
            return source.with_file_name(format!("{}{}", stem, extension(js)));
        }
    }
    source.to_path_buf()
}

/// Declaration file emitted by the type checker for a source
pub fn declaration_path(source: &Path) -> PathBuf {
    output_path(source, |js| match js {
        ".cjs" => ".d.cts".to_string(),
        ".mjs" => ".d.mts".to_string(),
        _ => ".d.ts".to_string(),
    })
}
