//! Project bootstrap tests

use dualbuild_tasks::{Bootstrap, Overwrite, ResourceSource};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

#[tokio::test]
async fn test_bundled_resources_become_dotfiles() {
    let project = TempDir::new().unwrap();

    let copied = Bootstrap::new(project.path())
        .resources(&ResourceSource::Bundled)
        .await
        .unwrap();

    let mut files = copied.relative_strings();
    files.sort();
    assert_eq!(
        files,
        vec![
            ".gitignore",
            "dualbuild.toml",
            "eslint.config.mjs",
            "test/tsconfig.json",
            "tsconfig.json",
        ]
    );
    assert!(project.path().join(".gitignore").is_file());
    assert!(!project.path().join("__dot_gitignore").exists());
}

#[tokio::test]
async fn test_existing_files_are_kept_unless_overwriting() {
    let project = TempDir::new().unwrap();
    let resources = TempDir::new().unwrap();
    fs::write(resources.path().join("tsconfig.json"), "{ \"new\": true }").unwrap();
    fs::write(resources.path().join("__dot_npmrc"), "fund=false").unwrap();
    fs::write(project.path().join("tsconfig.json"), "{ \"old\": true }").unwrap();

    let source = ResourceSource::Directory(resources.path().to_path_buf());
    let copied = Bootstrap::new(project.path())
        .resources(&source)
        .await
        .unwrap();

    assert_eq!(copied.relative_strings(), vec![".npmrc"]);
    assert_eq!(
        fs::read_to_string(project.path().join("tsconfig.json")).unwrap(),
        "{ \"old\": true }"
    );

    let copied = Bootstrap::new(project.path())
        .with_overwrite(Overwrite::Overwrite)
        .resources(&source)
        .await
        .unwrap();

    assert_eq!(copied.len(), 2);
    assert_eq!(
        fs::read_to_string(project.path().join("tsconfig.json")).unwrap(),
        "{ \"new\": true }"
    );
}

#[tokio::test]
async fn test_packages_updates_manifest() {
    let project = TempDir::new().unwrap();
    fs::write(
        project.path().join("package.json"),
        r#"{ "name": "pkg", "version": "1.0.0", "scripts": { "build": "make" } }"#,
    )
    .unwrap();

    Bootstrap::new(project.path())
        .packages("dualbuild", "0.1.0")
        .await
        .unwrap();

    let content = fs::read_to_string(project.path().join("package.json")).unwrap();
    assert!(content.ends_with("}\n"));

    let data: Value = serde_json::from_str(&content).unwrap();
    assert_eq!(data["scripts"]["build"], json!("make"));
    assert_eq!(data["scripts"]["lint"], json!("dualbuild lint"));
    assert_eq!(data["files"], json!(["*.md", "dist/", "src/"]));
    assert_eq!(data["devDependencies"], json!({ "dualbuild": "^0.1.0" }));
    assert_eq!(
        data.as_object().unwrap().keys().collect::<Vec<_>>(),
        vec!["name", "version", "scripts", "files", "devDependencies"]
    );
}

#[tokio::test]
async fn test_bootstrap_empty_directory() {
    let project = TempDir::new().unwrap();

    Bootstrap::new(project.path())
        .bootstrap(&ResourceSource::Bundled, "dualbuild", "0.1.0")
        .await
        .unwrap();

    assert!(project.path().join("package.json").is_file());
    assert!(project.path().join("eslint.config.mjs").is_file());
}
