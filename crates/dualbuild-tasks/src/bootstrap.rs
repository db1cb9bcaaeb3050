//! Project bootstrap
//!
//! Copies the starter files (`resources`) into a project and wires the
//! project's `package.json` for dualbuild (`packages`).

use crate::artifacts::{ArtifactSet, CopyOptions, FindOptions, Overwrite};
use crate::error::{BuildError, BuildResult};
use crate::exports::{read_manifest, write_manifest};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::info;

/// Starter files shipped with dualbuild, as `(relative path, content)`
pub const BUNDLED_RESOURCES: &[(&str, &str)] = &[
    ("__dot_gitignore", include_str!("../resources/__dot_gitignore")),
    ("dualbuild.toml", include_str!("../resources/dualbuild.toml")),
    ("eslint.config.mjs", include_str!("../resources/eslint.config.mjs")),
    ("test/tsconfig.json", include_str!("../resources/test/tsconfig.json")),
    ("tsconfig.json", include_str!("../resources/tsconfig.json")),
];

/// Scripts added to `package.json`; existing entries win
pub const DEFAULT_SCRIPTS: &[(&str, &str)] = &[
    ("build", "dualbuild"),
    ("coverage", "dualbuild coverage"),
    ("dev", "dualbuild --parallel"),
    ("lint", "dualbuild lint"),
    ("test", "dualbuild test"),
    ("transpile", "dualbuild transpile"),
];

/// Entries always present in `files`
pub const DEFAULT_FILES: &[&str] = &["*.md", "dist/", "src/"];

const DOT_PREFIX: &str = "__dot_";

/// Where starter files come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    /// The files compiled into dualbuild
    Bundled,
    Directory(PathBuf),
}

/// Bootstraps one project directory
#[derive(Debug, Clone)]
pub struct Bootstrap {
    pub project_dir: PathBuf,
    pub overwrite: Overwrite,
}

impl Bootstrap {
    /// Bootstrap `project_dir`, keeping existing files
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            overwrite: Overwrite::Skip,
        }
    }

    pub fn with_overwrite(mut self, overwrite: Overwrite) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Copy starter files into the project, turning `__dot_` segments into dots
    pub async fn resources(&self, source: &ResourceSource) -> BuildResult<ArtifactSet> {
        match source {
            ResourceSource::Directory(directory) => self.copy_resources(directory).await,
            ResourceSource::Bundled => {
                let staging = tempfile::tempdir()
                    .map_err(|e| BuildError::io(std::env::temp_dir(), e))?;
                for (relative, content) in BUNDLED_RESOURCES {
                    let path = staging.path().join(relative);
                    if let Some(parent) = path.parent() {
                        tokio::fs::create_dir_all(parent)
                            .await
                            .map_err(|e| BuildError::io(parent, e))?;
                    }
                    tokio::fs::write(&path, content)
                        .await
                        .map_err(|e| BuildError::io(&path, e))?;
                }
                self.copy_resources(staging.path()).await
            }
        }
    }

    async fn copy_resources(&self, directory: &Path) -> BuildResult<ArtifactSet> {
        let sources = ArtifactSet::find(&["**/*"], &FindOptions::new(directory))?;
        let rename = dotfile_rename;
        let targets = sources
            .copy(
                &self.project_dir,
                &CopyOptions {
                    rename: Some(&rename),
                    overwrite: self.overwrite,
                },
            )
            .await?;

        info!("Bootstrapped {} of {} files", targets.len(), sources.len());
        for file in targets.absolute_paths() {
            info!("    {}", file.display());
        }
        Ok(targets)
    }

    /// Merge dualbuild's scripts, files and dev dependency into `package.json`
    pub async fn packages(&self, tool_name: &str, tool_version: &str) -> BuildResult<()> {
        let path = self.project_dir.join("package.json");
        let mut manifest = read_manifest(&path).await?;

        update_manifest(&mut manifest, tool_name, tool_version);

        info!("Writing {}", path.display());
        write_manifest(&path, &manifest).await
    }

    /// `resources`, then `packages`
    pub async fn bootstrap(
        &self,
        source: &ResourceSource,
        tool_name: &str,
        tool_version: &str,
    ) -> BuildResult<ArtifactSet> {
        info!("Bootstrapping {}", self.project_dir.display());
        let copied = self.resources(source).await?;
        self.packages(tool_name, tool_version).await?;
        Ok(copied)
    }
}

/// `__dot_gitignore` → `.gitignore`, for every path segment
pub fn dotfile_rename(relative: &str) -> String {
    relative
        .split('/')
        .map(|segment| match segment.strip_prefix(DOT_PREFIX) {
            Some(rest) => format!(".{}", rest),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Apply dualbuild's defaults to a manifest
pub fn update_manifest(manifest: &mut Map<String, Value>, tool_name: &str, tool_version: &str) {
    let mut scripts: Map<String, Value> = DEFAULT_SCRIPTS
        .iter()
        .map(|(name, command)| (name.to_string(), Value::String(command.to_string())))
        .collect();
    if let Some(Value::Object(existing)) = manifest.get("scripts") {
        for (name, command) in existing {
            scripts.insert(name.clone(), command.clone());
        }
    }
    manifest.insert("scripts".to_string(), Value::Object(sort_by_key(scripts)));

    let mut files: BTreeSet<String> = DEFAULT_FILES.iter().map(|f| f.to_string()).collect();
    if let Some(Value::Array(existing)) = manifest.get("files") {
        files.extend(existing.iter().filter_map(Value::as_str).map(str::to_string));
    }
    manifest.insert(
        "files".to_string(),
        Value::Array(files.into_iter().map(Value::String).collect()),
    );

    let mut dev_dependencies = match manifest.get("devDependencies") {
        Some(Value::Object(existing)) => existing.clone(),
        _ => Map::new(),
    };
    dev_dependencies.insert(
        tool_name.to_string(),
        Value::String(format!("^{}", tool_version)),
    );
    manifest.insert(
        "devDependencies".to_string(),
        Value::Object(sort_by_key(dev_dependencies)),
    );
}

fn sort_by_key(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map.into_iter().collect();
    entries.sort_by(|(a, _), (b, _)| a.cmp(b));
    entries.into_iter().collect()
}
