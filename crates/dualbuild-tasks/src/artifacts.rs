//! Artifact sets: ordered, deduplicated relative paths under one directory
//!
//! Every discovery and transform step produces an [`ArtifactSet`]. Paths are
//! kept in the order they were discovered or emitted; consumers that need a
//! stable presentation sort explicitly.

use crate::error::{BuildError, BuildResult};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Options for [`ArtifactSet::find`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindOptions {
    /// Directory to search; results are relative to it
    pub directory: PathBuf,
    /// Glob patterns excluded from the result
    pub ignore: Vec<String>,
}

impl FindOptions {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            ignore: Vec::new(),
        }
    }

    /// Add an ignore pattern
    pub fn ignore(mut self, glob: impl Into<String>) -> Self {
        self.ignore.push(glob.into());
        self
    }
}

/// Options for [`ArtifactSet::filter`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOptions {
    /// Directory globs are matched against (default: the set's own directory)
    pub directory: Option<PathBuf>,
    /// Glob patterns excluded from the result
    pub ignore: Vec<String>,
}

/// What to do when a copy target already exists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Overwrite {
    /// Replace the existing file
    #[default]
    Overwrite,
    /// Keep the existing file and leave it out of the result
    Skip,
    /// Fail the copy
    Fail,
}

impl std::str::FromStr for Overwrite {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "overwrite" => Ok(Self::Overwrite),
            "skip" => Ok(Self::Skip),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown overwrite policy '{}'", other)),
        }
    }
}

/// Options for [`ArtifactSet::copy`]
#[derive(Clone, Copy, Default)]
pub struct CopyOptions<'a> {
    /// Rewrites each relative path (with `/` separators) before copying
    pub rename: Option<&'a (dyn Fn(&str) -> String + Sync)>,
    /// Policy for existing targets
    pub overwrite: Overwrite,
}

/// Ordered, deduplicated set of relative paths under one base directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    directory: PathBuf,
    files: Vec<PathBuf>,
    seen: HashSet<PathBuf>,
}

impl ArtifactSet {
    /// An empty set rooted at `directory`
    pub fn empty(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            files: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Build a set from relative paths, dropping duplicates
    pub fn from_files<I, P>(directory: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let mut set = Self::empty(directory);
        for file in files {
            set.push(file.into());
        }
        set
    }

    /// Find files matching any of `globs` under `options.directory`.
    ///
    /// A missing directory yields an empty set.
    pub fn find<S: AsRef<str>>(globs: &[S], options: &FindOptions) -> BuildResult<Self> {
        let matcher = compile_globs(globs)?;
        let ignore = compile_globs(&options.ignore)?;
        let mut set = Self::empty(&options.directory);

        if !options.directory.is_dir() {
            debug!("Directory {} not found, nothing to find", options.directory.display());
            return Ok(set);
        }

        for entry in WalkDir::new(&options.directory)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&options.directory).to_path_buf();
                BuildError::io(path, std::io::Error::other(e.to_string()))
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&options.directory) else {
                continue;
            };

            let slashed = to_slash(relative);
            if matcher.is_match(&slashed) && !ignore.is_match(&slashed) {
                set.push(relative.to_path_buf());
            }
        }

        Ok(set)
    }

    /// Base directory of the set
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Relative paths, in insertion order
    pub fn iter(&self) -> std::slice::Iter<'_, PathBuf> {
        self.files.iter()
    }

    /// Whether the relative path is part of the set
    pub fn contains(&self, relative: impl AsRef<Path>) -> bool {
        self.seen.contains(relative.as_ref())
    }

    /// Absolute (directory-joined) paths, in insertion order
    pub fn absolute_paths(&self) -> impl Iterator<Item = PathBuf> + '_ {
        self.files.iter().map(|file| self.directory.join(file))
    }

    /// Relative paths with `/` separators
    pub fn relative_strings(&self) -> Vec<String> {
        self.files.iter().map(|file| to_slash(file)).collect()
    }

    /// Keep files matching any of `globs`, relative to `options.directory`.
    ///
    /// The result is rooted at `options.directory` (or the set's directory);
    /// files outside of it are dropped.
    pub fn filter<S: AsRef<str>>(&self, globs: &[S], options: &FilterOptions) -> BuildResult<Self> {
        let matcher = compile_globs(globs)?;
        let ignore = compile_globs(&options.ignore)?;
        let directory = options
            .directory
            .clone()
            .unwrap_or_else(|| self.directory.clone());

        let mut set = Self::empty(&directory);
        for absolute in self.absolute_paths() {
            let Ok(relative) = absolute.strip_prefix(&directory) else {
                continue;
            };

            let slashed = to_slash(relative);
            if matcher.is_match(&slashed) && !ignore.is_match(&slashed) {
                set.push(relative.to_path_buf());
            }
        }

        Ok(set)
    }

    /// Copy every file into `dest`, preserving relative paths (or renaming them)
    pub async fn copy(&self, dest: &Path, options: &CopyOptions<'_>) -> BuildResult<Self> {
        let mut copied = Self::empty(dest);

        for file in &self.files {
            let target_relative = match options.rename {
                Some(rename) => PathBuf::from(rename(&to_slash(file))),
                None => file.clone(),
            };

            let source = self.directory.join(file);
            let target = dest.join(&target_relative);

            if tokio::fs::try_exists(&target)
                .await
                .map_err(|e| BuildError::io(&target, e))?
            {
                match options.overwrite {
                    Overwrite::Overwrite => {}
                    Overwrite::Skip => {
                        debug!("Skipping existing {}", target.display());
                        continue;
                    }
                    Overwrite::Fail => return Err(BuildError::AlreadyExists(target)),
                }
            }

            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| BuildError::io(parent, e))?;
            }

            tokio::fs::copy(&source, &target)
                .await
                .map_err(|e| BuildError::io(&source, e))?;
            copied.push(target_relative);
        }

        Ok(copied)
    }

    /// Merge sets, rebasing every path onto the common ancestor directory.
    ///
    /// Empty sets do not influence the base directory; when every set is
    /// empty the first set's directory is kept.
    pub fn merge(sets: impl IntoIterator<Item = ArtifactSet>) -> Self {
        let sets: Vec<ArtifactSet> = sets.into_iter().collect();

        let directory = sets
            .iter()
            .filter(|set| !set.is_empty())
            .map(|set| set.directory.clone())
            .reduce(|a, b| common_ancestor(&a, &b))
            .or_else(|| sets.first().map(|set| set.directory.clone()))
            .unwrap_or_else(|| PathBuf::from("."));

        let mut merged = Self::empty(&directory);
        for set in &sets {
            for absolute in set.absolute_paths() {
                if let Ok(relative) = absolute.strip_prefix(&directory) {
                    merged.push(relative.to_path_buf());
                }
            }
        }

        merged
    }

    fn push(&mut self, file: PathBuf) {
        if self.seen.insert(file.clone()) {
            self.files.push(file);
        }
    }
}

impl<'a> IntoIterator for &'a ArtifactSet {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

/// Remove a directory tree if it exists
pub async fn remove_dir_if_exists(path: &Path) -> BuildResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(BuildError::io(path, e)),
    }
}

/// Compile glob patterns; `*` never crosses a `/`, `**` does
pub fn compile_globs<S: AsRef<str>>(globs: &[S]) -> BuildResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in globs {
        let pattern = pattern.as_ref();
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| BuildError::InvalidGlob {
                pattern: pattern.to_string(),
                error: e.to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| BuildError::InvalidGlob {
        pattern: globs
            .iter()
            .map(|g| g.as_ref())
            .collect::<Vec<_>>()
            .join(", "),
        error: e.to_string(),
    })
}

/// Render a relative path with `/` separators
pub fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            Component::ParentDir => Some("..".into()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn common_ancestor(a: &Path, b: &Path) -> PathBuf {
    a.components()
        .zip(b.components())
        .take_while(|(x, y)| x == y)
        .map(|(x, _)| x)
        .collect()
}
