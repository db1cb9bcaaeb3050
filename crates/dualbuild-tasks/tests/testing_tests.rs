//! Test, coverage, lint and composite task tests

mod common;

use common::{create_sample_project, files_in, tasks, FakeTools};
use dualbuild_tasks::{BuildError, ConfigOverrides, TaskName};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn no_coverage() -> ConfigOverrides {
    ConfigOverrides {
        coverage: Some(false),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_runs_both_conventions_in_order() {
    let project = create_sample_project();
    let fake = FakeTools::new();

    tasks(project.path(), &fake)
        .run(TaskName::Test, Some(&no_coverage()))
        .await
        .unwrap();

    assert_eq!(
        fake.calls(),
        vec!["tests commonjs 2 coverage=false", "tests module 2 coverage=false"]
    );
}

#[tokio::test]
async fn test_only_esm_tests() {
    let project = create_sample_project();
    let fake = FakeTools::new();

    let overrides = ConfigOverrides {
        cjs: Some(false),
        ..no_coverage()
    };
    tasks(project.path(), &fake)
        .run(TaskName::Test, Some(&overrides))
        .await
        .unwrap();

    assert_eq!(fake.calls(), vec!["tests module 2 coverage=false"]);
}

#[tokio::test]
async fn test_failure_stops_later_passes() {
    let project = create_sample_project();
    let fake = FakeTools::new();
    fake.fail("tests");

    let err = tasks(project.path(), &fake)
        .run(TaskName::Test, Some(&no_coverage()))
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::ToolFailed { .. }));
    assert_eq!(fake.calls().len(), 1);
}

#[tokio::test]
async fn test_stale_coverage_data_is_removed() {
    let project = create_sample_project();
    let fake = FakeTools::new();
    common::write(project.path(), ".coverage-data/stale.json", "{}");

    tasks(project.path(), &fake).test().await.unwrap();

    assert_eq!(
        files_in(&project.path().join(".coverage-data")),
        vec!["coverage-cjs.json", "coverage-esm.json"]
    );
}

#[tokio::test]
async fn test_coverage_report() {
    let project = create_sample_project();
    let report_dir = TempDir::new().unwrap();
    let fake = FakeTools::new();

    let overrides = ConfigOverrides {
        coverage_dir: Some(report_dir.path().to_path_buf()),
        ..Default::default()
    };
    let report = tasks(project.path(), &fake)
        .run(TaskName::Coverage, Some(&overrides))
        .await
        .unwrap();

    let report = report.artifacts().unwrap();
    assert_eq!(report.directory(), report_dir.path());
    assert_eq!(
        common::sorted(report),
        vec!["coverage-summary.json", "index.html"]
    );
    // Seven sources (declarations excluded), data from both passes
    assert_eq!(fake.calls().last().unwrap(), "coverage 7 sources 2 data");
}

#[tokio::test]
async fn test_coverage_report_produced_when_tests_fail() {
    let project = create_sample_project();
    let report_dir = TempDir::new().unwrap();
    let fake = FakeTools::new();
    fake.fail("tests");

    let overrides = ConfigOverrides {
        coverage_dir: Some(report_dir.path().to_path_buf()),
        ..Default::default()
    };
    let coverage_err = tasks(project.path(), &fake)
        .run(TaskName::Coverage, Some(&overrides))
        .await
        .unwrap_err();
    let test_err = tasks(project.path(), &fake).test().await.unwrap_err();

    assert!(matches!(coverage_err, BuildError::ToolFailed { ref tool, .. } if tool == "tests"));
    assert_eq!(
        std::mem::discriminant(&coverage_err),
        std::mem::discriminant(&test_err)
    );
    assert!(report_dir.path().join("index.html").is_file());
}

#[tokio::test]
async fn test_coverage_reporter_failure_is_returned() {
    let project = create_sample_project();
    let fake = FakeTools::new();
    fake.fail("coverage");

    let err = tasks(project.path(), &fake).coverage().await.unwrap_err();
    assert!(matches!(err, BuildError::ToolFailed { ref tool, .. } if tool == "coverage"));
}

#[tokio::test]
async fn test_test_failure_wins_over_reporter_failure() {
    let project = create_sample_project();
    let fake = FakeTools::new();
    fake.fail("tests");
    fake.fail("coverage");

    let err = tasks(project.path(), &fake).coverage().await.unwrap_err();

    assert!(matches!(err, BuildError::ToolFailed { ref tool, .. } if tool == "tests"));
    assert!(fake.calls().last().unwrap().starts_with("coverage "));
}

#[tokio::test]
async fn test_test_types_uses_test_tsconfig() {
    let project = create_sample_project();
    let fake = FakeTools::new();

    tasks(project.path(), &fake).test_types().await.unwrap();
    assert_eq!(fake.calls(), vec!["tsc noEmit 2 extra=false"]);
}

#[tokio::test]
async fn test_lint_sources() {
    let project = create_sample_project();
    let fake = FakeTools::new();

    tasks(project.path(), &fake).lint().await.unwrap();
    assert_eq!(fake.calls(), vec!["eslint 10"]);
}

#[tokio::test]
async fn test_all_sequential_order() {
    let project = create_sample_project();
    let fake = FakeTools::new();

    tasks(project.path(), &fake).all().await.unwrap();

    let calls = fake.calls();
    let tools: Vec<&str> = calls
        .iter()
        .map(|call| call.split(' ').next().unwrap())
        .collect();
    assert_eq!(
        tools,
        vec!["esbuild", "esbuild", "tsc", "tsc", "tests", "tests", "coverage", "eslint"]
    );
    assert!(project.path().join("coverage/index.html").is_file());
}

#[tokio::test]
async fn test_all_without_coverage_runs_plain_tests() {
    let project = create_sample_project();
    let fake = FakeTools::new();

    tasks(project.path(), &fake)
        .run(TaskName::Default, Some(&no_coverage()))
        .await
        .unwrap();

    let calls = fake.calls();
    assert!(!calls.iter().any(|call| call.starts_with("coverage")));
    assert_eq!(calls.last().unwrap(), "eslint 10");
}

#[tokio::test]
async fn test_all_sequential_stops_at_first_failure() {
    let project = create_sample_project();
    let fake = FakeTools::new();
    fake.fail("tsc");

    let err = tasks(project.path(), &fake).all().await.unwrap_err();

    assert!(matches!(err, BuildError::ToolFailed { ref tool, .. } if tool == "tsc"));
    assert!(!fake.calls().iter().any(|call| call.starts_with("eslint")));
    assert!(!fake.calls().iter().any(|call| call.starts_with("tests")));
}

#[tokio::test]
async fn test_all_parallel_reports_every_failure() {
    let project = create_sample_project();
    let fake = FakeTools::new();
    fake.fail("eslint");
    fake.fail("tests");

    let overrides = ConfigOverrides {
        parallelize: Some(true),
        ..no_coverage()
    };
    let err = tasks(project.path(), &fake)
        .run(TaskName::All, Some(&overrides))
        .await
        .unwrap_err();

    let failed: Vec<String> = err
        .failures()
        .iter()
        .map(|failure| match failure {
            BuildError::ToolFailed { tool, .. } => tool.clone(),
            other => other.to_string(),
        })
        .collect();
    assert_eq!(failed, vec!["tests", "eslint"]);

    // Every branch ran to completion
    let calls = fake.calls();
    assert!(calls.iter().any(|call| call.starts_with("esbuild")));
    assert!(calls.iter().any(|call| call.starts_with("tsc noEmit")));
}
