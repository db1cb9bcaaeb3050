//! Relative specifier rewriting for transpiled output
//!
//! esbuild does not bundle here, so `import "./mod"` reaches the output
//! unchanged. Node resolves neither `require("./mod")` to `mod.cjs` nor
//! `import "./mod"` to `mod.mjs`, therefore every relative specifier naming
//! a transpiled source is rewritten to that source's output file.

use crate::artifacts::ArtifactSet;
use crate::error::{BuildError, BuildResult};
use dualbuild_config::Format;
use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

/// `require(...)`, `import(...)`, `import "..."` and `from "..."`
const SPECIFIER_PATTERN: &str =
    r#"(\brequire\s*\(\s*|\bimport\s*\(\s*|\bfrom\s*|\bimport\s+)(["'])(\.\.?(?:/[^"'\r\n]*)?)(["'])"#;

static SPECIFIER: OnceLock<Regex> = OnceLock::new();

/// Extensions a specifier may carry for a TypeScript source
const SCRIPT_EXTENSIONS: &[&str] = &[".js", ".cjs", ".mjs", ".ts", ".cts", ".mts"];

fn specifier_pattern() -> BuildResult<&'static Regex> {
    if let Some(regex) = SPECIFIER.get() {
        return Ok(regex);
    }
    let regex = Regex::new(SPECIFIER_PATTERN)
        .map_err(|e| BuildError::BuildFailed(format!("invalid specifier pattern: {}", e)))?;
    Ok(SPECIFIER.get_or_init(|| regex))
}

/// Replace every relative specifier for which `resolve` has a replacement
pub fn rewrite_specifiers<'a>(
    code: &'a str,
    resolve: impl Fn(&str) -> Option<String>,
) -> BuildResult<Cow<'a, str>> {
    let pattern = specifier_pattern()?;
    Ok(pattern.replace_all(code, |caps: &Captures<'_>| match resolve(&caps[3]) {
        Some(fixed) => format!("{}{}{}{}", &caps[1], &caps[2], fixed, &caps[4]),
        None => caps[0].to_string(),
    }))
}

/// Resolves specifiers written in one source directory
#[derive(Debug, Clone)]
pub struct SpecifierResolver<'a> {
    /// Directory of the importing source file
    pub directory: PathBuf,
    pub format: Format,
    /// Extension every output of this format receives
    pub out_extension: &'a str,
}

impl SpecifierResolver<'_> {
    /// Source extensions compiled into this format, in lookup order
    fn source_extensions(&self) -> [&'static str; 2] {
        match self.format {
            Format::Cjs => [".ts", ".cts"],
            Format::Esm => [".ts", ".mts"],
        }
    }

    /// The output specifier for `specifier`, when it names a source
    ///
    /// `./mod` and `./mod.js` both resolve through `mod.ts` (or the
    /// format-specific source), then `mod/index.ts`.
    pub fn resolve(&self, specifier: &str) -> Option<String> {
        let stem = SCRIPT_EXTENSIONS
            .iter()
            .find_map(|extension| specifier.strip_suffix(extension))
            .filter(|stem| !stem.ends_with('/'))
            .unwrap_or(specifier);

        let bare = stem.trim_end_matches('/');
        let mut candidates = Vec::new();
        if !matches!(bare, "." | "..") {
            candidates.push(bare.to_string());
        }
        candidates.push(format!("{}/index", bare));

        for candidate in candidates {
            for extension in self.source_extensions() {
                let source = self.directory.join(format!("{}{}", candidate, extension));
                if source.is_file() {
                    return Some(format!("{}{}", candidate, self.out_extension));
                }
            }
        }
        None
    }
}

/// Rewrite the specifiers of every emitted script in `outputs`
///
/// `source_dir` is the esbuild `outbase`, so an output's parent directory
/// relative to `outputs` is its source's parent relative to `source_dir`.
pub async fn fix_extensions(
    outputs: &ArtifactSet,
    source_dir: &Path,
    format: Format,
    out_extension: &str,
) -> BuildResult<usize> {
    let mut fixed = 0;

    for relative in outputs.iter() {
        if !relative.to_string_lossy().ends_with(out_extension) {
            continue;
        }

        let resolver = SpecifierResolver {
            directory: source_dir.join(relative.parent().unwrap_or_else(|| Path::new(""))),
            format,
            out_extension,
        };

        let path = outputs.directory().join(relative);
        let code = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| BuildError::io(&path, e))?;

        let rewritten = rewrite_specifiers(&code, |specifier| resolver.resolve(specifier))?;
        if rewritten != code {
            tokio::fs::write(&path, rewritten.as_bytes())
                .await
                .map_err(|e| BuildError::io(&path, e))?;
            debug!("Fixed import extensions in {}", path.display());
            fixed += 1;
        }
    }

    Ok(fixed)
}
