//! dualbuild build tasks
//!
//! Build orchestration for TypeScript packages published as both CommonJS
//! and ES modules:
//! - Artifact sets (file discovery, filtering, copying, merging)
//! - Transpilation into both formats, declaration emission, resource copying
//! - Tests under each module convention, coverage reports with thresholds
//! - Linting
//! - `exports` synthesis into `package.json`
//! - Project bootstrap
//!
//! External tools (esbuild, tsc, the test runner, c8, eslint) are reached
//! through the [`Toolchain`] traits.

pub mod artifacts;
pub mod bootstrap;
pub mod coverage;
pub mod error;
pub mod exports;
mod lint;
pub mod output;
pub mod tasks;
mod testing;
pub mod toolchain;
mod transpile;

// Re-export main types
pub use artifacts::{ArtifactSet, CopyOptions, FilterOptions, FindOptions, Overwrite};
pub use bootstrap::{Bootstrap, ResourceSource};
pub use coverage::{CoverageSummary, Evaluation};
pub use error::{BuildError, BuildResult};
pub use exports::{synthesize, ExportEntry, ExportMap, ExportOptions};
pub use tasks::{TaskName, TaskOutput, Tasks};
pub use toolchain::{
    CoverageReporter, CoverageRequest, LintRequest, Linter, TestRequest, TestRunner, Toolchain,
    TranspileRequest, Transpiler, TypeCheckMode, TypeCheckRequest, TypeChecker,
};

// Re-export configuration types for convenience
pub use dualbuild_config::{BuildConfig, ConfigOverrides, Format};
