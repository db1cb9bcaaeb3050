//! Test, type-check and coverage tasks

use crate::artifacts::{remove_dir_if_exists, ArtifactSet};
use crate::error::BuildResult;
use crate::output::banner;
use crate::tasks::Tasks;
use crate::toolchain::{CoverageRequest, TestRequest, TypeCheckMode, TypeCheckRequest};
use dualbuild_config::Format;
use tracing::error;

/// Project file used to type-check tests, inside the test directory
pub const TEST_TSCONFIG: &str = "tsconfig.json";

impl Tasks {
    /// Type-check the test files without emitting
    pub async fn test_types(&self) -> BuildResult<()> {
        let config = &self.config;
        banner(config.banners_enabled(), "Checking test types");

        let files = self.find_tests()?;
        let tsconfig = config.test_path().join(TEST_TSCONFIG);
        let extra_types = self.extra_types_dir();

        self.tools
            .type_checker
            .check(TypeCheckRequest {
                root: &config.root,
                files: &files,
                tsconfig: &tsconfig,
                mode: TypeCheckMode::NoEmit,
                extra_types_dir: extra_types.as_deref(),
            })
            .await?;
        Ok(())
    }

    /// Run the tests under one module convention
    pub async fn test_format(&self, format: Format) -> BuildResult<()> {
        let config = &self.config;
        banner(
            config.banners_enabled(),
            &format!("Running tests ({})", format.display_name()),
        );

        let files = self.find_tests()?;
        let coverage_dir = config.coverage.then(|| config.coverage_data_path());

        self.tools
            .test_runner
            .run(TestRequest {
                root: &config.root,
                files: &files,
                format,
                coverage_dir: coverage_dir.as_deref(),
            })
            .await
    }

    /// Run the tests for every enabled format, in order.
    ///
    /// Stale coverage data is removed first when coverage is enabled.
    pub async fn test(&self) -> BuildResult<()> {
        if self.config.coverage {
            remove_dir_if_exists(&self.config.coverage_data_path()).await?;
        }

        for format in self.config.formats() {
            self.test_format(format).await?;
        }
        Ok(())
    }

    /// Run the tests, then always produce the coverage report.
    ///
    /// A test failure is returned after the report is written; otherwise the
    /// reporter's own result (including threshold failures) is returned.
    pub async fn coverage(&self) -> BuildResult<ArtifactSet> {
        let tested = self.test().await;

        let config = &self.config;
        banner(config.banners_enabled(), "Preparing coverage report");

        let report = match self.find_coverage_sources() {
            Ok(sources) => {
                let data_dir = config.coverage_data_path();
                let report_dir = config.coverage_path();
                self.tools
                    .coverage_reporter
                    .report(CoverageRequest {
                        root: &config.root,
                        sources: &sources,
                        data_dir: &data_dir,
                        report_dir: &report_dir,
                        thresholds: &config.thresholds,
                    })
                    .await
            }
            Err(e) => Err(e),
        };

        if let (Err(_), Err(e)) = (&tested, &report) {
            error!("Coverage report failed: {}", e);
        }
        tested?;
        report
    }
}
