//! Export map synthesis
//!
//! Turns the transpiled files selected for export into the `exports` field
//! of a package manifest, plus the `main`, `module` and `types` convenience
//! fields.
//!
//! # Layout
//!
//! - Every file is classified by suffix ([`classify`]); maps and unrelated
//!   files are ignored.
//! - Files sharing a logical name (path without suffix, a trailing
//!   `/<index>` collapsed to its directory) form one module.
//! - A module gets one branch per format with a runtime file, `require`
//!   before `import`, each `{ types?, default }`.
//! - The root module's key is `"."`, every other key is `"./<name>"`.

pub mod classify;
pub mod manifest;
mod task;

use crate::artifacts::{to_slash, ArtifactSet};
use classify::{Classifier, FileRole};
use dualbuild_config::Format;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use manifest::{apply_exports, read_manifest, write_manifest};

/// Parameters of the synthesis
#[derive(Debug, Clone)]
pub struct ExportOptions<'a> {
    pub cjs_extension: &'a str,
    pub esm_extension: &'a str,
    /// Basename collapsed into its directory (`index`)
    pub index_name: &'a str,
    /// Directory of the manifest receiving the map; references are relative to it
    pub manifest_dir: &'a Path,
}

/// One condition branch of an entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Branch {
    pub types: Option<String>,
    pub default: String,
}

/// Export entry for one module
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportEntry {
    pub require: Option<Branch>,
    pub import: Option<Branch>,
}

impl ExportEntry {
    pub fn branch(&self, format: Format) -> Option<&Branch> {
        match format {
            Format::Cjs => self.require.as_ref(),
            Format::Esm => self.import.as_ref(),
        }
    }

    fn to_json(&self) -> Value {
        let mut conditions = Map::new();
        for format in Format::ALL {
            if let Some(branch) = self.branch(format) {
                let mut fields = Map::new();
                if let Some(types) = &branch.types {
                    fields.insert("types".to_string(), Value::String(types.clone()));
                }
                fields.insert("default".to_string(), Value::String(branch.default.clone()));
                conditions.insert(format.condition().to_string(), Value::Object(fields));
            }
        }
        Value::Object(conditions)
    }
}

/// Synthesized export map, keyed by export path
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportMap {
    entries: BTreeMap<String, ExportEntry>,
}

impl ExportMap {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, key: &str) -> Option<&ExportEntry> {
        self.entries.get(key)
    }

    /// Keys in output order: `"."` first, then sorted
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entry exported as `"."`
    pub fn root(&self) -> Option<&ExportEntry> {
        self.entries.get(".")
    }

    /// CommonJS runtime of the root module
    pub fn main(&self) -> Option<&str> {
        self.root()?.require.as_ref().map(|b| b.default.as_str())
    }

    /// ES module runtime of the root module
    pub fn module(&self) -> Option<&str> {
        self.root()?.import.as_ref().map(|b| b.default.as_str())
    }

    /// Declarations of the root module, CommonJS first
    pub fn types(&self) -> Option<&str> {
        let root = self.root()?;
        Format::ALL
            .iter()
            .filter_map(|format| root.branch(*format)?.types.as_deref())
            .next()
    }

    /// The `exports` field value
    pub fn to_json(&self) -> Value {
        // BTreeMap order already puts "." before every "./" key
        let entries = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.to_json()))
            .collect::<Map<String, Value>>();
        Value::Object(entries)
    }
}

/// A file claiming a role in a module
#[derive(Debug, Clone)]
struct Slot {
    path: String,
    from_index: bool,
}

#[derive(Debug, Default)]
struct ModuleGroup {
    slots: BTreeMap<FileRole, Slot>,
}

impl ModuleGroup {
    fn claim(&mut self, name: &str, role: FileRole, slot: Slot) {
        match self.slots.get(&role) {
            None => {
                self.slots.insert(role, slot);
            }
            Some(existing) if slot.from_index && !existing.from_index => {
                warn!(
                    "Export '{}': {} shadows {}, using the directory index",
                    name, slot.path, existing.path
                );
                self.slots.insert(role, slot);
            }
            Some(existing) => {
                warn!(
                    "Export '{}': {} shadows {}, using {}",
                    name, existing.path, slot.path, existing.path
                );
            }
        }
    }

    /// A directory index owns its module: plain files of the same name go
    fn prefer_index(&mut self, name: &str) {
        let Some(index) = self.slots.values().find(|slot| slot.from_index).cloned() else {
            return;
        };
        self.slots.retain(|_, slot| {
            if !slot.from_index {
                warn!(
                    "Export '{}': {} shadows {}, using the directory index",
                    name, index.path, slot.path
                );
            }
            slot.from_index
        });
    }

    fn get(&self, role: FileRole) -> Option<&Slot> {
        self.slots.get(&role)
    }

    fn entry(&self, reference: impl Fn(&str) -> String) -> ExportEntry {
        let branch = |format: Format| {
            let runtime = self.get(Classifier::runtime_role(format))?;
            let types = self
                .get(Classifier::declaration_role(format))
                .or_else(|| self.get(FileRole::DeclGeneric));
            Some(Branch {
                types: types.map(|slot| reference(&slot.path)),
                default: reference(&runtime.path),
            })
        };

        ExportEntry {
            require: branch(Format::Cjs),
            import: branch(Format::Esm),
        }
    }
}

/// Build the export map for `files`, whose paths are relative to their
/// set's directory (normally the destination directory).
pub fn synthesize(files: &ArtifactSet, options: &ExportOptions<'_>) -> ExportMap {
    let classifier = Classifier::new(options.cjs_extension, options.esm_extension);
    let index_suffix = format!("/{}", options.index_name);
    let mut groups: BTreeMap<String, ModuleGroup> = BTreeMap::new();

    for relative in files.relative_strings() {
        let (role, stem) = classifier.classify(&relative);
        if role == FileRole::None {
            debug!("Not exported: {}", relative);
            continue;
        }

        let (name, from_index) = if stem == options.index_name {
            (String::new(), true)
        } else if let Some(directory) = stem.strip_suffix(&index_suffix) {
            (directory.to_string(), true)
        } else {
            (stem.to_string(), false)
        };

        groups.entry(name.clone()).or_default().claim(
            &name,
            role,
            Slot {
                path: relative.clone(),
                from_index,
            },
        );
    }

    let reference = |path: &str| -> String {
        let absolute = files.directory().join(path);
        let relative = pathdiff::diff_paths(&absolute, options.manifest_dir)
            .unwrap_or_else(|| PathBuf::from(path));
        format!("./{}", to_slash(&relative))
    };

    let mut map = ExportMap::default();
    for (name, group) in &mut groups {
        group.prefer_index(name);
        let entry = group.entry(&reference);
        if entry.require.is_none() && entry.import.is_none() {
            debug!("No runtime files for '{}', not exported", name);
            continue;
        }

        let key = if name.is_empty() {
            ".".to_string()
        } else {
            format!("./{}", name)
        };
        map.entries.insert(key, entry);
    }

    map
}
