//! Process-spawning collaborators
//!
//! Each binding turns a request into a command line for the configured
//! [`ToolCommand`] and reports the files the tool is expected to produce.

use super::extensions::fix_extensions;
use super::process::ToolInvocation;
use super::{
    declaration_path, output_path, CoverageReporter, CoverageRequest, LintRequest, Linter,
    TestRequest, TestRunner, TranspileRequest, Transpiler, TypeCheckMode, TypeCheckRequest,
    TypeChecker,
};
use crate::artifacts::{to_slash, ArtifactSet, FindOptions};
use crate::coverage::{CoverageSummary, SUMMARY_FILE_NAME};
use crate::error::{BuildError, BuildResult};
use async_trait::async_trait;
use dualbuild_config::{Format, ToolCommand};
use serde_json::{json, Map, Value};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable receiving the forced module convention
pub const FORCE_MODULE_ENV: &str = "DUALBUILD_FORCE_MODULE";

/// Environment variable receiving the V8 coverage directory
pub const NODE_V8_COVERAGE_ENV: &str = "NODE_V8_COVERAGE";

/// Environment variable carrying Node.js command line options
pub const NODE_OPTIONS_ENV: &str = "NODE_OPTIONS";

/// Node.js flag choosing the module convention of ambiguous files
pub const DEFAULT_TYPE_FLAG: &str = "--experimental-default-type";

/// `NODE_OPTIONS` forcing `format`, after any inherited options
pub fn node_options(format: Format, inherited: Option<&OsStr>) -> OsString {
    let mut options = OsString::new();
    if let Some(inherited) = inherited.filter(|options| !options.is_empty()) {
        options.push(inherited);
        options.push(" ");
    }
    options.push(format!("{}={}", DEFAULT_TYPE_FLAG, format.module_kind()));
    options
}

/// Keep only the paths that exist on disk
fn existing(directory: &Path, candidates: Vec<PathBuf>) -> ArtifactSet {
    ArtifactSet::from_files(
        directory,
        candidates
            .into_iter()
            .filter(|relative| directory.join(relative).is_file()),
    )
}

/// esbuild, one invocation per format
#[derive(Debug, Clone)]
pub struct Esbuild {
    command: ToolCommand,
}

impl Esbuild {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }

    fn arguments(request: &TranspileRequest<'_>) -> Vec<OsString> {
        let options = request.options;
        let mut args: Vec<OsString> = vec![
            format!("--format={}", request.format.name()).into(),
            format!("--platform={}", options.platform).into(),
            prefixed("--outdir=", request.out_dir),
            prefixed("--outbase=", request.sources.directory()),
            format!("--out-extension:.js={}", request.out_extension).into(),
        ];

        if let Some(sourcemap) = options.sourcemap.esbuild_value() {
            args.push(format!("--sourcemap={}", sourcemap).into());
            args.push(format!("--sources-content={}", options.sources_content).into());
        }

        args.extend(request.sources.absolute_paths().map(PathBuf::into_os_string));
        args
    }
}

#[async_trait]
impl Transpiler for Esbuild {
    async fn transpile(&self, request: TranspileRequest<'_>) -> BuildResult<ArtifactSet> {
        if request.sources.is_empty() {
            debug!("No {} sources to transpile", request.format.display_name());
            return Ok(ArtifactSet::empty(request.out_dir));
        }

        ToolInvocation::new("esbuild", &self.command, request.root)
            .args(Self::arguments(&request))
            .run()
            .await?;

        let mut expected = Vec::new();
        for source in request.sources {
            let output = output_path(source, |_| request.out_extension.to_string());
            if request.options.sourcemap.emits_map_file() {
                let mut map = output.clone().into_os_string();
                map.push(".map");
                expected.push(output);
                expected.push(PathBuf::from(map));
            } else {
                expected.push(output);
            }
        }

        let outputs = existing(request.out_dir, expected);
        let fixed = fix_extensions(
            &outputs,
            request.sources.directory(),
            request.format,
            request.out_extension,
        )
        .await?;
        debug!("Fixed import extensions in {} files", fixed);

        Ok(outputs)
    }
}

/// tsc, driven through a temporary project file
#[derive(Debug, Clone)]
pub struct Tsc {
    command: ToolCommand,
}

impl Tsc {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }

    /// Content of the temporary project file
    pub fn project(request: &TypeCheckRequest<'_>) -> BuildResult<Value> {
        let mut files: Vec<String> = request
            .files
            .absolute_paths()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();

        if let Some(extra) = request.extra_types_dir {
            let types = ArtifactSet::find(&["**/*.d.{ts,cts,mts}"], &FindOptions::new(extra))?;
            files.extend(types.absolute_paths().map(|p| p.to_string_lossy().into_owned()));
        }

        let compiler_options = match &request.mode {
            TypeCheckMode::Emit { out_dir, root_dir } => json!({
                "noEmit": false,
                "declaration": true,
                "emitDeclarationOnly": true,
                "outDir": out_dir,
                "rootDir": root_dir,
            }),
            TypeCheckMode::NoEmit => json!({
                "noEmit": true,
                "declaration": false,
                "emitDeclarationOnly": false,
            }),
        };

        let mut project = Map::new();
        if request.tsconfig.is_file() {
            project.insert(
                "extends".to_string(),
                Value::String(request.tsconfig.to_string_lossy().into_owned()),
            );
        } else {
            warn!(
                "{} not found, type checking with compiler defaults",
                request.tsconfig.display()
            );
        }
        project.insert("compilerOptions".to_string(), compiler_options);
        project.insert("files".to_string(), json!(files));

        Ok(Value::Object(project))
    }
}

#[async_trait]
impl TypeChecker for Tsc {
    async fn check(&self, request: TypeCheckRequest<'_>) -> BuildResult<ArtifactSet> {
        let base = match &request.mode {
            TypeCheckMode::Emit { out_dir, .. } => out_dir.clone(),
            TypeCheckMode::NoEmit => request.root.to_path_buf(),
        };

        if request.files.is_empty() {
            debug!("No files to type check");
            return Ok(ArtifactSet::empty(base));
        }

        let project = Self::project(&request)?;
        let content = serde_json::to_string_pretty(&project)
            .map_err(|e| BuildError::BuildFailed(e.to_string()))?;

        let temp = tempfile::Builder::new()
            .prefix(".tsconfig-dualbuild-")
            .suffix(".json")
            .tempfile_in(request.root)
            .map_err(|e| BuildError::io(request.root, e))?;
        tokio::fs::write(temp.path(), content)
            .await
            .map_err(|e| BuildError::io(temp.path(), e))?;

        ToolInvocation::new("tsc", &self.command, request.root)
            .arg("-p")
            .arg(temp.path())
            .run()
            .await?;

        let TypeCheckMode::Emit { out_dir, root_dir } = &request.mode else {
            return Ok(ArtifactSet::empty(base));
        };

        let expected = request
            .files
            .absolute_paths()
            .filter_map(|path| path.strip_prefix(root_dir).ok().map(Path::to_path_buf))
            .filter(|relative| !is_declaration(relative))
            .map(|relative| declaration_path(&relative))
            .collect();

        Ok(existing(out_dir, expected))
    }
}

/// Node.js test runner, one invocation per module convention
#[derive(Debug, Clone)]
pub struct NodeTestRunner {
    command: ToolCommand,
}

impl NodeTestRunner {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl TestRunner for NodeTestRunner {
    async fn run(&self, request: TestRequest<'_>) -> BuildResult<()> {
        if request.files.is_empty() {
            warn!("No test files found in {}", request.files.directory().display());
            return Ok(());
        }

        let inherited = std::env::var_os(NODE_OPTIONS_ENV);
        let mut invocation = ToolInvocation::new("tests", &self.command, request.root)
            .env(NODE_OPTIONS_ENV, node_options(request.format, inherited.as_deref()))
            .env(FORCE_MODULE_ENV, request.format.module_kind())
            .args(request.files.absolute_paths().map(PathBuf::into_os_string));

        if let Some(coverage_dir) = request.coverage_dir {
            invocation = invocation.env(NODE_V8_COVERAGE_ENV, coverage_dir.as_os_str());
        }

        invocation.run().await?;
        Ok(())
    }
}

/// c8 reporting over previously collected V8 coverage
#[derive(Debug, Clone)]
pub struct C8 {
    command: ToolCommand,
}

impl C8 {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl CoverageReporter for C8 {
    async fn report(&self, request: CoverageRequest<'_>) -> BuildResult<ArtifactSet> {
        let mut invocation = ToolInvocation::new("coverage", &self.command, request.root)
            .arg("--temp-directory")
            .arg(request.data_dir)
            .arg("--reports-dir")
            .arg(request.report_dir)
            .args(["--reporter", "html", "--reporter", "json-summary", "--reporter", "text"])
            .arg("--all");

        for source in request.sources.absolute_paths() {
            let include = pathdiff::diff_paths(&source, request.root).unwrap_or(source);
            invocation = invocation.arg("--include").arg(to_slash(&include));
        }

        invocation.run().await?;

        let summary = CoverageSummary::load(&request.report_dir.join(SUMMARY_FILE_NAME)).await?;
        summary.check(request.thresholds, request.root)?;

        ArtifactSet::find(&["**/*"], &FindOptions::new(request.report_dir))
    }
}

/// eslint over an explicit file list
#[derive(Debug, Clone)]
pub struct Eslint {
    command: ToolCommand,
}

impl Eslint {
    pub fn new(command: ToolCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl Linter for Eslint {
    async fn lint(&self, request: LintRequest<'_>) -> BuildResult<()> {
        if request.files.is_empty() {
            warn!("No files to lint");
            return Ok(());
        }

        ToolInvocation::new("eslint", &self.command, request.root)
            .args(request.files.absolute_paths().map(PathBuf::into_os_string))
            .run()
            .await?;
        Ok(())
    }
}

fn prefixed(flag: &str, path: &Path) -> OsString {
    let mut arg = OsString::from(flag);
    arg.push(path.as_os_str());
    arg
}

fn is_declaration(path: &Path) -> bool {
    let name = path.to_string_lossy();
    [".d.ts", ".d.cts", ".d.mts"]
        .iter()
        .any(|suffix| name.ends_with(suffix))
}
