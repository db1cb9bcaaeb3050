//! Shared fixtures: a sample project and an in-process toolchain
//!
//! The fake toolchain writes predictable outputs (one file per expected
//! tool output) and fails on demand, so orchestration can be tested without
//! Node.js.

#![allow(dead_code)]

use async_trait::async_trait;
use dualbuild_tasks::toolchain::{declaration_path, output_path};
use dualbuild_tasks::{
    ArtifactSet, BuildConfig, BuildError, BuildResult, CoverageReporter, CoverageRequest,
    FindOptions, LintRequest, Linter, TestRequest, TestRunner, Toolchain,
    TranspileRequest, Transpiler, TypeCheckMode, TypeCheckRequest, TypeChecker, Tasks,
};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Create the sample project used across tests
///
/// ```text
/// src/index.ts              dual-format root module
/// src/my_cts.cts            CommonJS only
/// src/my_mts.mts            ES module only
/// src/my_ts.ts              dual-format
/// src/my_xts.cts/.mts       separate source per format
/// src/my_dts.d.ts           hand-written declarations
/// src/my_subpath/index.ts   directory index
/// src/data.json             resource
/// test/*.test.ts            tests
/// package.json
/// ```
pub fn create_sample_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    for file in [
        "src/index.ts",
        "src/my_cts.cts",
        "src/my_mts.mts",
        "src/my_ts.ts",
        "src/my_xts.cts",
        "src/my_xts.mts",
        "src/my_dts.d.ts",
        "src/my_subpath/index.ts",
        "src/data.json",
        "test/index.test.ts",
        "test/my_cts.test.cts",
        "test/tsconfig.json",
    ] {
        write(root, file, "// sample\n");
    }

    write(
        root,
        "package.json",
        "{\n  \"name\": \"a-test-project\",\n  \"version\": \"1.2.3\",\n  \"private\": true\n}\n",
    );

    temp_dir
}

pub fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Sorted relative paths of every file under `directory`
pub fn files_in(directory: &Path) -> Vec<String> {
    let mut found = ArtifactSet::find(&["**/*"], &FindOptions::new(directory))
        .unwrap()
        .relative_strings();
    found.sort();
    found
}

/// Sorted relative paths of a set
pub fn sorted(set: &ArtifactSet) -> Vec<String> {
    let mut files = set.relative_strings();
    files.sort();
    files
}

/// Records every call and fails the tools named in `failing`
#[derive(Debug, Default)]
pub struct FakeTools {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<String>>,
}

impl FakeTools {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every call to `tool` fail
    pub fn fail(&self, tool: &str) {
        self.failing.lock().unwrap().insert(tool.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, tool: &str, call: String) -> BuildResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.failing.lock().unwrap().contains(tool) {
            return Err(BuildError::tool_failed(tool, Some(1)));
        }
        Ok(())
    }
}

/// Toolchain backed entirely by `fake`
pub fn toolchain(fake: &Arc<FakeTools>) -> Toolchain {
    Toolchain {
        transpiler: fake.clone(),
        type_checker: fake.clone(),
        test_runner: fake.clone(),
        coverage_reporter: fake.clone(),
        linter: fake.clone(),
    }
}

/// Tasks for `root` with banners off and the fake toolchain
pub fn tasks(root: &Path, fake: &Arc<FakeTools>) -> Tasks {
    let mut config = BuildConfig::with_root(root);
    config.banners = Some(false);
    Tasks::new(config, toolchain(fake))
}

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, "// generated\n").unwrap();
}

#[async_trait]
impl Transpiler for FakeTools {
    async fn transpile(&self, request: TranspileRequest<'_>) -> BuildResult<ArtifactSet> {
        self.record("esbuild", format!("esbuild {}", request.format))?;

        let mut outputs = Vec::new();
        for source in request.sources {
            let output = output_path(source, |_| request.out_extension.to_string());
            let map = format!("{}.map", output.display());
            touch(&request.out_dir.join(&output));
            touch(&request.out_dir.join(&map));
            outputs.push(output);
            outputs.push(map.into());
        }
        Ok(ArtifactSet::from_files(request.out_dir, outputs))
    }
}

#[async_trait]
impl TypeChecker for FakeTools {
    async fn check(&self, request: TypeCheckRequest<'_>) -> BuildResult<ArtifactSet> {
        let mode = match request.mode {
            TypeCheckMode::Emit { .. } => "emit",
            TypeCheckMode::NoEmit => "noEmit",
        };
        self.record(
            "tsc",
            format!(
                "tsc {} {} extra={}",
                mode,
                request.files.len(),
                request.extra_types_dir.is_some()
            ),
        )?;

        let TypeCheckMode::Emit { out_dir, root_dir } = &request.mode else {
            return Ok(ArtifactSet::empty(request.root));
        };

        let mut outputs = Vec::new();
        for file in request.files.absolute_paths() {
            let relative = file.strip_prefix(root_dir).unwrap().to_path_buf();
            if relative.to_string_lossy().contains(".d.") {
                continue;
            }
            let declaration = declaration_path(&relative);
            touch(&out_dir.join(&declaration));
            outputs.push(declaration);
        }
        Ok(ArtifactSet::from_files(out_dir, outputs))
    }
}

#[async_trait]
impl TestRunner for FakeTools {
    async fn run(&self, request: TestRequest<'_>) -> BuildResult<()> {
        if let Some(coverage_dir) = request.coverage_dir {
            touch(&coverage_dir.join(format!("coverage-{}.json", request.format)));
        }
        self.record(
            "tests",
            format!(
                "tests {} {} coverage={}",
                request.format.module_kind(),
                request.files.len(),
                request.coverage_dir.is_some()
            ),
        )
    }
}

#[async_trait]
impl CoverageReporter for FakeTools {
    async fn report(&self, request: CoverageRequest<'_>) -> BuildResult<ArtifactSet> {
        let data = ArtifactSet::find(&["*.json"], &FindOptions::new(request.data_dir))?;
        touch(&request.report_dir.join("index.html"));
        touch(&request.report_dir.join("coverage-summary.json"));
        self.record(
            "coverage",
            format!("coverage {} sources {} data", request.sources.len(), data.len()),
        )?;

        ArtifactSet::find(&["**/*"], &FindOptions::new(request.report_dir))
    }
}

#[async_trait]
impl Linter for FakeTools {
    async fn lint(&self, request: LintRequest<'_>) -> BuildResult<()> {
        self.record("eslint", format!("eslint {}", request.files.len()))
    }
}
