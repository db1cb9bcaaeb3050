//! Lint task

use crate::error::BuildResult;
use crate::output::banner;
use crate::tasks::Tasks;
use crate::toolchain::LintRequest;

impl Tasks {
    /// Lint sources, tests, extra types and `extra_lint` files
    pub async fn lint(&self) -> BuildResult<()> {
        banner(self.config.banners_enabled(), "Linting sources");

        let files = self.find_lint_sources()?;
        self.tools
            .linter
            .lint(LintRequest {
                root: &self.config.root,
                files: &files,
            })
            .await
    }
}
