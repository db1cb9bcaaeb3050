//! Task registry
//!
//! [`Tasks`] is an immutable view over a resolved [`BuildConfig`] and a
//! [`Toolchain`]. Per-call overrides produce a new view; the base view and
//! its configuration are never modified, so views can be used concurrently.

use crate::artifacts::{ArtifactSet, FindOptions};
use crate::error::{BuildError, BuildResult};
use crate::toolchain::Toolchain;
use dualbuild_config::{BuildConfig, ConfigOverrides, FindSpec, Format};
use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::error;

/// Every TypeScript source or declaration
pub(crate) const TYPESCRIPT_GLOB: &str = "**/*.{ts,cts,mts}";
/// Every JavaScript file
pub(crate) const JAVASCRIPT_GLOB: &str = "**/*.{js,cjs,mjs}";
/// Hand-written declarations
pub(crate) const DECLARATIONS_GLOB: &str = "**/*.d.{ts,cts,mts}";

/// Named build tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskName {
    Transpile,
    TranspileCjs,
    TranspileEsm,
    TranspileTypes,
    CopyResources,
    TestTypes,
    TestCjs,
    TestEsm,
    Test,
    Coverage,
    Lint,
    Exports,
    All,
    Default,
}

impl TaskName {
    /// Every task, in display order
    pub const ALL: [TaskName; 14] = [
        Self::Transpile,
        Self::TranspileCjs,
        Self::TranspileEsm,
        Self::TranspileTypes,
        Self::CopyResources,
        Self::TestTypes,
        Self::TestCjs,
        Self::TestEsm,
        Self::Test,
        Self::Coverage,
        Self::Lint,
        Self::Exports,
        Self::All,
        Self::Default,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Transpile => "transpile",
            Self::TranspileCjs => "transpile-cjs",
            Self::TranspileEsm => "transpile-esm",
            Self::TranspileTypes => "transpile-types",
            Self::CopyResources => "copy-resources",
            Self::TestTypes => "test-types",
            Self::TestCjs => "test-cjs",
            Self::TestEsm => "test-esm",
            Self::Test => "test",
            Self::Coverage => "coverage",
            Self::Lint => "lint",
            Self::Exports => "exports",
            Self::All => "all",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for TaskName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TaskName {
    type Err = BuildError;

    /// Accepts `test-types` as well as `test_types`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|task| task.name() == normalized)
            .ok_or_else(|| BuildError::UnknownTask(s.to_string()))
    }
}

/// What a task produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    /// Files written by the task
    Artifacts(ArtifactSet),
    /// The task completed without producing files
    Done,
}

impl TaskOutput {
    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        match self {
            Self::Artifacts(set) => Some(set),
            Self::Done => None,
        }
    }
}

impl From<ArtifactSet> for TaskOutput {
    fn from(set: ArtifactSet) -> Self {
        Self::Artifacts(set)
    }
}

impl From<()> for TaskOutput {
    fn from(_: ()) -> Self {
        Self::Done
    }
}

/// Build tasks over one resolved configuration
#[derive(Debug, Clone)]
pub struct Tasks {
    pub(crate) config: Arc<BuildConfig>,
    pub(crate) tools: Toolchain,
}

impl Tasks {
    pub fn new(config: BuildConfig, tools: Toolchain) -> Self {
        Self {
            config: Arc::new(config),
            tools,
        }
    }

    /// Tasks using the external tools named in the configuration
    pub fn external(config: BuildConfig) -> Self {
        let tools = Toolchain::external(&config.tools);
        Self::new(config, tools)
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn toolchain(&self) -> &Toolchain {
        &self.tools
    }

    /// A new view with `overrides` applied; `self` is unchanged.
    ///
    /// Tool commands are bound when the toolchain is built, so overriding
    /// them here has no effect on an existing toolchain.
    pub fn with_overrides(&self, overrides: &ConfigOverrides) -> Tasks {
        if overrides.is_empty() {
            return self.clone();
        }
        Tasks {
            config: Arc::new(self.config.resolve(overrides)),
            tools: self.tools.clone(),
        }
    }

    /// Run a task by name, with optional per-call overrides
    pub async fn run(
        &self,
        task: TaskName,
        overrides: Option<&ConfigOverrides>,
    ) -> BuildResult<TaskOutput> {
        let view = match overrides {
            Some(overrides) => self.with_overrides(overrides),
            None => self.clone(),
        };
        view.config.validate()?;

        let output: TaskOutput = match task {
            TaskName::Transpile => view.transpile().await?.into(),
            TaskName::TranspileCjs => view.transpile_format(Format::Cjs).await?.into(),
            TaskName::TranspileEsm => view.transpile_format(Format::Esm).await?.into(),
            TaskName::TranspileTypes => view.transpile_types().await?.into(),
            TaskName::CopyResources => view.copy_resources().await?.into(),
            TaskName::TestTypes => view.test_types().await?.into(),
            TaskName::TestCjs => view.test_format(Format::Cjs).await?.into(),
            TaskName::TestEsm => view.test_format(Format::Esm).await?.into(),
            TaskName::Test => view.test().await?.into(),
            TaskName::Coverage => view.coverage().await?.into(),
            TaskName::Lint => view.lint().await?.into(),
            TaskName::Exports => view.exports().await?.into(),
            TaskName::All => view.all().await?.into(),
            TaskName::Default => view.default_task().await?.into(),
        };

        Ok(output)
    }

    /// Transpile, check test types, test (with coverage when enabled), lint.
    ///
    /// Sequentially, the first failure stops the chain. In parallel every
    /// branch runs to completion and all failures are reported together.
    pub async fn all(&self) -> BuildResult<()> {
        if !self.config.parallelize {
            self.transpile().await?;
            self.test_types().await?;
            if self.config.coverage {
                self.coverage().await?;
            } else {
                self.test().await?;
            }
            return self.lint().await;
        }

        let testing: BoxFuture<'_, BuildResult<()>> = if self.config.coverage {
            self.coverage().map(|result| result.map(drop)).boxed()
        } else {
            self.test().boxed()
        };

        let branches: Vec<BoxFuture<'_, BuildResult<()>>> = vec![
            self.transpile().map(|result| result.map(drop)).boxed(),
            self.test_types().boxed(),
            testing,
            self.lint().boxed(),
        ];

        let results = join_all(branches).await;
        for failure in results.iter().filter_map(|result| result.as_ref().err()) {
            error!("{}", failure);
        }
        BuildError::settle(results)
    }

    /// The task run when none is named
    pub async fn default_task(&self) -> BuildResult<()> {
        self.all().await
    }

    fn find_in(&self, globs: &[&str], directory: impl Into<std::path::PathBuf>, ignore: &[&str]) -> BuildResult<ArtifactSet> {
        let options = FindOptions {
            directory: directory.into(),
            ignore: ignore.iter().map(|glob| glob.to_string()).collect(),
        };
        ArtifactSet::find(globs, &options)
    }

    fn find_spec(&self, spec: &FindSpec) -> BuildResult<ArtifactSet> {
        let options = FindOptions {
            directory: self.config.path(&spec.directory),
            ignore: spec.ignore.clone(),
        };
        ArtifactSet::find(&spec.globs, &options)
    }

    /// Sources compiled into `format`: `.ts` plus the format-specific extension
    pub fn find_sources(&self, format: Format) -> BuildResult<ArtifactSet> {
        self.find_in(
            &[format.source_glob()],
            self.config.source_path(),
            &[DECLARATIONS_GLOB],
        )
    }

    /// Sources of every enabled format
    pub fn find_all_sources(&self) -> BuildResult<ArtifactSet> {
        let sets = self
            .config
            .formats()
            .map(|format| self.find_sources(format))
            .collect::<BuildResult<Vec<_>>>()?;
        Ok(merge_at(self.config.source_path(), sets))
    }

    /// Hand-written declarations among the sources
    pub fn find_types(&self) -> BuildResult<ArtifactSet> {
        self.find_in(&[DECLARATIONS_GLOB], self.config.source_path(), &[])
    }

    /// Every non-TypeScript file among the sources
    pub fn find_resources(&self) -> BuildResult<ArtifactSet> {
        self.find_in(&["**/*"], self.config.source_path(), &[TYPESCRIPT_GLOB])
    }

    pub fn find_tests(&self) -> BuildResult<ArtifactSet> {
        self.find_in(
            &[self.config.test_glob.as_str()],
            self.config.test_path(),
            &[DECLARATIONS_GLOB],
        )
    }

    /// Sources, tests, extra types (when present) and `extra_lint`
    pub fn find_lint_sources(&self) -> BuildResult<ArtifactSet> {
        let globs = [TYPESCRIPT_GLOB, JAVASCRIPT_GLOB];
        let mut sets = vec![
            self.find_in(&globs, self.config.source_path(), &[])?,
            self.find_in(&globs, self.config.test_path(), &[])?,
        ];

        let extra_types = self.config.extra_types_path();
        if extra_types.is_dir() {
            sets.push(self.find_in(&globs, extra_types, &[])?);
        }

        for spec in &self.config.extra_lint {
            sets.push(self.find_spec(spec)?);
        }

        Ok(merge_at(self.config.root.clone(), sets))
    }

    /// Sources (without declarations) and `extra_coverage`
    pub fn find_coverage_sources(&self) -> BuildResult<ArtifactSet> {
        let mut sets = vec![self.find_in(
            &[TYPESCRIPT_GLOB, JAVASCRIPT_GLOB],
            self.config.source_path(),
            &[DECLARATIONS_GLOB],
        )?];

        for spec in &self.config.extra_coverage {
            sets.push(self.find_spec(spec)?);
        }

        Ok(merge_at(self.config.root.clone(), sets))
    }

    /// Extra types directory, when it exists
    pub(crate) fn extra_types_dir(&self) -> Option<std::path::PathBuf> {
        let path = self.config.extra_types_path();
        path.is_dir().then_some(path)
    }
}

/// Merge, falling back to `directory` when every set is empty
fn merge_at(directory: std::path::PathBuf, sets: Vec<ArtifactSet>) -> ArtifactSet {
    ArtifactSet::merge(std::iter::once(ArtifactSet::empty(directory)).chain(sets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    fn touch(root: &Path, files: &[&str]) {
        for file in files {
            let path = root.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
    }

    fn tasks(root: &Path) -> Tasks {
        Tasks::external(BuildConfig::with_root(root))
    }

    #[rstest]
    #[case("transpile", TaskName::Transpile)]
    #[case("test-types", TaskName::TestTypes)]
    #[case("test_types", TaskName::TestTypes)]
    #[case("copy_resources", TaskName::CopyResources)]
    #[case("all", TaskName::All)]
    fn test_task_name_parse(#[case] input: &str, #[case] expected: TaskName) {
        assert_eq!(input.parse::<TaskName>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_task() {
        let err = "deploy".parse::<TaskName>().unwrap_err();
        assert!(matches!(err, BuildError::UnknownTask(name) if name == "deploy"));
    }

    #[test]
    fn test_source_partitioning() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &[
                "src/index.ts",
                "src/cjs.cts",
                "src/esm.mts",
                "src/types.d.ts",
                "src/data.json",
            ],
        );
        let tasks = tasks(dir.path());

        assert_eq!(
            tasks.find_sources(Format::Cjs).unwrap().relative_strings(),
            vec!["cjs.cts", "index.ts"]
        );
        assert_eq!(
            tasks.find_sources(Format::Esm).unwrap().relative_strings(),
            vec!["esm.mts", "index.ts"]
        );
        assert_eq!(
            tasks.find_all_sources().unwrap().relative_strings(),
            vec!["cjs.cts", "index.ts", "esm.mts"]
        );
        assert_eq!(tasks.find_types().unwrap().relative_strings(), vec!["types.d.ts"]);
        assert_eq!(tasks.find_resources().unwrap().relative_strings(), vec!["data.json"]);
    }

    #[test]
    fn test_find_tests_ignores_declarations() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &["test/a.test.ts", "test/b.test.mts", "test/c.test.d.ts", "test/helper.ts"],
        );

        let found = tasks(dir.path()).find_tests().unwrap();
        assert_eq!(found.relative_strings(), vec!["a.test.ts", "b.test.mts"]);
    }

    #[test]
    fn test_lint_sources_include_extras() {
        let dir = TempDir::new().unwrap();
        touch(
            dir.path(),
            &["src/index.ts", "test/a.test.ts", "types/g.d.ts", "build.mjs"],
        );

        let config = BuildConfig::with_root(dir.path()).resolve(&ConfigOverrides {
            extra_lint: Some(vec![FindSpec {
                globs: vec!["*.mjs".to_string()],
                directory: PathBuf::from("."),
                ignore: Vec::new(),
            }]),
            ..Default::default()
        });
        let found = Tasks::external(config).find_lint_sources().unwrap();

        assert_eq!(found.directory(), dir.path());
        assert_eq!(
            found.relative_strings(),
            vec!["src/index.ts", "test/a.test.ts", "types/g.d.ts", "build.mjs"]
        );
    }

    #[test]
    fn test_with_overrides_keeps_base() {
        let base = tasks(Path::new("/project"));
        let view = base.with_overrides(&ConfigOverrides {
            dest_dir: Some(PathBuf::from("out")),
            ..Default::default()
        });

        assert_eq!(view.config().dest_path(), PathBuf::from("/project/out"));
        assert_eq!(base.config().dest_path(), PathBuf::from("/project/dist"));
    }
}
