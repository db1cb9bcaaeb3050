//! End-to-end tests for the `dualbuild` binary
//!
//! External tools are replaced through `[tools.*]` in dualbuild.toml with
//! `true` / `false`, so these run without Node.js.

use predicates::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

fn dualbuild() -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("dualbuild");
    for name in [
        "DUALBUILD_DEST_DIR",
        "DUALBUILD_CJS",
        "DUALBUILD_ESM",
        "DUALBUILD_COVERAGE",
        "DUALBUILD_PARALLELIZE",
        "DUALBUILD_BANNERS",
        "RUST_LOG",
    ] {
        cmd.env_remove(name);
    }
    cmd.env("NO_COLOR", "1");
    cmd
}

/// A project whose tools all succeed, except `failing` which exits 1
fn create_project(failing: &[&str]) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();

    fs::create_dir_all(root.join("src")).unwrap();
    fs::create_dir_all(root.join("test")).unwrap();
    fs::write(root.join("src/index.ts"), "export const a = 1;\n").unwrap();
    fs::write(root.join("src/data.json"), "{}\n").unwrap();
    fs::write(root.join("test/index.test.ts"), "// test\n").unwrap();
    fs::write(root.join("package.json"), "{ \"name\": \"pkg\" }\n").unwrap();

    let mut config = String::from("[build]\nbanners = false\n\n");
    for tool in ["esbuild", "tsc", "test_runner", "coverage", "eslint"] {
        let program = if failing.contains(&tool) { "false" } else { "true" };
        config.push_str(&format!("[tools.{}]\nprogram = \"{}\"\n\n", tool, program));
    }
    fs::write(root.join("dualbuild.toml"), config).unwrap();

    temp_dir
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

// ============================================================================
// Arguments
// ============================================================================

#[test]
fn test_help_lists_tasks() {
    dualbuild()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("transpile"))
        .stdout(predicate::str::contains("--no-coverage"))
        .stdout(predicate::str::contains("init"));
}

#[test]
fn test_version() {
    dualbuild()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_unknown_task_rejected() {
    dualbuild()
        .arg("deploy")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown task: deploy"));
}

#[test]
fn test_completions() {
    dualbuild()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("dualbuild"));
}

#[test]
fn test_invalid_configuration() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("dualbuild.toml"), "[build]\nbogus = 1\n").unwrap();

    dualbuild()
        .arg("-C")
        .arg(project.path())
        .arg("lint")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

// ============================================================================
// Tasks
// ============================================================================

#[cfg(unix)]
#[test]
fn test_transpile_copies_resources() {
    let project = create_project(&[]);

    dualbuild()
        .current_dir(project.path())
        .arg("transpile")
        .assert()
        .success()
        .stderr(predicate::str::contains("Task 'transpile' finished"));

    assert!(project.path().join("dist/data.json").is_file());
}

#[cfg(unix)]
#[test]
fn test_dest_dir_flag() {
    let project = create_project(&[]);

    dualbuild()
        .arg("-C")
        .arg(project.path())
        .args(["transpile", "--dest-dir", "out", "--no-esm"])
        .assert()
        .success();

    assert!(project.path().join("out/data.json").is_file());
    assert!(!project.path().join("dist").exists());
}

#[cfg(unix)]
#[test]
fn test_failing_tool_exits_non_zero() {
    let project = create_project(&["eslint"]);

    dualbuild()
        .current_dir(project.path())
        .arg("lint")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task 'lint' failed"))
        .stderr(predicate::str::contains("eslint failed"));
}

#[cfg(unix)]
#[test]
fn test_all_without_coverage() {
    let project = create_project(&["coverage"]);

    dualbuild()
        .current_dir(project.path())
        .arg("--no-coverage")
        .assert()
        .success()
        .stderr(predicate::str::contains("Task 'default' finished"));
}

#[cfg(unix)]
#[test]
fn test_parallel_reports_every_failure() {
    let project = create_project(&["eslint", "test_runner"]);

    dualbuild()
        .current_dir(project.path())
        .args(["all", "--parallel", "--no-coverage"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("2 tasks failed"));
}

#[cfg(unix)]
#[test]
fn test_exports_writes_manifest() {
    let project = create_project(&[]);
    fs::create_dir_all(project.path().join("dist")).unwrap();

    dualbuild()
        .current_dir(project.path())
        .args(["exports", "--output-package-json", "dist/package.json"])
        .assert()
        .success();

    let manifest = read_json(&project.path().join("dist/package.json"));
    assert_eq!(manifest["name"], "pkg");
    assert!(manifest["exports"].is_object());
}

// ============================================================================
// dualbuild init
// ============================================================================

#[test]
fn test_init_bootstraps_project() {
    let project = TempDir::new().unwrap();

    dualbuild()
        .arg("-C")
        .arg(project.path())
        .arg("init")
        .assert()
        .success();

    for file in [".gitignore", "tsconfig.json", "test/tsconfig.json", "eslint.config.mjs"] {
        assert!(project.path().join(file).is_file(), "missing {}", file);
    }

    let manifest = read_json(&project.path().join("package.json"));
    assert_eq!(
        manifest["devDependencies"]["dualbuild"],
        format!("^{}", env!("CARGO_PKG_VERSION"))
    );
    assert_eq!(manifest["scripts"]["build"], "dualbuild");
}

#[test]
fn test_init_keeps_existing_files() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("tsconfig.json"), "{}").unwrap();

    dualbuild()
        .current_dir(project.path())
        .arg("init")
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(project.path().join("tsconfig.json")).unwrap(),
        "{}"
    );
}

#[test]
fn test_init_fail_policy() {
    let project = TempDir::new().unwrap();
    fs::write(project.path().join("tsconfig.json"), "{}").unwrap();

    dualbuild()
        .current_dir(project.path())
        .args(["init", "--overwrite", "fail"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to initialize"));
}

#[test]
fn test_init_rejects_unknown_policy() {
    dualbuild()
        .args(["init", "--overwrite", "sometimes"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown overwrite policy"));
}

#[test]
fn test_init_missing_resources_directory() {
    let project = TempDir::new().unwrap();

    dualbuild()
        .arg("-C")
        .arg(project.path())
        .args(["init", "--resources", "does-not-exist"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Resources directory not found"));
}

#[test]
fn test_init_resources_relative_to_project() {
    let project = TempDir::new().unwrap();
    let starter = project.path().join("starter");
    fs::create_dir_all(&starter).unwrap();
    fs::write(starter.join("tsconfig.json"), "{ \"custom\": true }").unwrap();

    dualbuild()
        .arg("-C")
        .arg(project.path())
        .args(["init", "--resources", "starter"])
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(project.path().join("tsconfig.json")).unwrap(),
        "{ \"custom\": true }"
    );
}
