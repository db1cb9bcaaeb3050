//! File role classification by suffix

use dualbuild_config::Format;

/// What an exported file contributes to its module's entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileRole {
    /// Not part of an export entry
    None,
    RuntimeCjs,
    RuntimeEsm,
    /// Declarations for the CommonJS runtime (`.d.cts`)
    DeclCjs,
    /// Declarations for the ES module runtime (`.d.mts`)
    DeclEsm,
    /// Declarations shared by both runtimes (`.d.ts`)
    DeclGeneric,
}

impl FileRole {
    pub fn is_runtime(&self) -> bool {
        matches!(self, Self::RuntimeCjs | Self::RuntimeEsm)
    }
}

/// Suffix table built from the configured runtime extensions.
///
/// Entries are ordered longest suffix first so that `.d.cts` wins over
/// `.cts` and `.d.ts` wins over `.ts`.
#[derive(Debug, Clone)]
pub struct Classifier {
    suffixes: Vec<(String, FileRole)>,
}

impl Classifier {
    pub fn new(cjs_extension: &str, esm_extension: &str) -> Self {
        let mut suffixes = vec![
            (".map".to_string(), FileRole::None),
            (".d.ts".to_string(), FileRole::DeclGeneric),
            (cjs_extension.to_string(), FileRole::RuntimeCjs),
            (esm_extension.to_string(), FileRole::RuntimeEsm),
        ];

        for (extension, role) in [
            (cjs_extension, FileRole::DeclCjs),
            (esm_extension, FileRole::DeclEsm),
        ] {
            if let Some(declaration) = declaration_suffix(extension) {
                if declaration != ".d.ts" {
                    suffixes.push((declaration, role));
                }
            }
        }

        suffixes.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        Self { suffixes }
    }

    /// Role and logical name (path with the suffix stripped)
    pub fn classify<'a>(&self, path: &'a str) -> (FileRole, &'a str) {
        for (suffix, role) in &self.suffixes {
            if let Some(stem) = path.strip_suffix(suffix.as_str()) {
                if !stem.is_empty() && !stem.ends_with('/') {
                    return (*role, stem);
                }
            }
        }
        (FileRole::None, path)
    }

    /// Runtime role for a format
    pub fn runtime_role(format: Format) -> FileRole {
        match format {
            Format::Cjs => FileRole::RuntimeCjs,
            Format::Esm => FileRole::RuntimeEsm,
        }
    }

    /// Format-specific declaration role for a format
    pub fn declaration_role(format: Format) -> FileRole {
        match format {
            Format::Cjs => FileRole::DeclCjs,
            Format::Esm => FileRole::DeclEsm,
        }
    }
}

/// Declaration suffix paired with a runtime extension: `.cjs` → `.d.cts`,
/// `.mjs` → `.d.mts`, `.js` → `.d.ts`
fn declaration_suffix(extension: &str) -> Option<String> {
    let base = extension.strip_prefix('.')?;
    let stem = base.strip_suffix("js")?;
    Some(format!(".d.{}ts", stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("index.cjs", FileRole::RuntimeCjs, "index")]
    #[case("index.mjs", FileRole::RuntimeEsm, "index")]
    #[case("index.d.cts", FileRole::DeclCjs, "index")]
    #[case("index.d.mts", FileRole::DeclEsm, "index")]
    #[case("sub/index.d.ts", FileRole::DeclGeneric, "sub/index")]
    #[case("index.cjs.map", FileRole::None, "index.cjs")]
    #[case("data.json", FileRole::None, "data.json")]
    fn test_classify_default_extensions(
        #[case] path: &str,
        #[case] role: FileRole,
        #[case] name: &str,
    ) {
        let classifier = Classifier::new(".cjs", ".mjs");
        assert_eq!(classifier.classify(path), (role, name));
    }

    #[test]
    fn test_classify_js_extension_keeps_generic_declarations() {
        let classifier = Classifier::new(".js", ".mjs");
        assert_eq!(classifier.classify("a.js"), (FileRole::RuntimeCjs, "a"));
        assert_eq!(classifier.classify("a.d.ts"), (FileRole::DeclGeneric, "a"));
        assert_eq!(classifier.classify("a.d.mts"), (FileRole::DeclEsm, "a"));
    }

    #[test]
    fn test_declaration_suffix() {
        assert_eq!(declaration_suffix(".cjs").as_deref(), Some(".d.cts"));
        assert_eq!(declaration_suffix(".js").as_deref(), Some(".d.ts"));
        assert_eq!(declaration_suffix(".bundle"), None);
    }
}
