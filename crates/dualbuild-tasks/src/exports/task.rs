//! Exports task: transpile, then rewrite the package manifest

use super::{apply_exports, read_manifest, synthesize, write_manifest, ExportOptions};
use crate::artifacts::{ArtifactSet, FilterOptions};
use crate::error::{BuildError, BuildResult};
use crate::output::banner;
use crate::tasks::Tasks;
use std::path::Path;
use tracing::info;

impl Tasks {
    /// Transpile, then inject the synthesized `exports` into the manifest.
    ///
    /// Returns the written manifest.
    pub async fn exports(&self) -> BuildResult<ArtifactSet> {
        let files = self.transpile().await?;

        let config = &self.config;
        banner(config.banners_enabled(), "Updating exports in \"package.json\"");

        let mut globs = vec![config.exports_glob.clone()];
        globs.extend(config.exports_globs.iter().cloned());

        let exported = files.filter(
            &globs,
            &FilterOptions {
                directory: Some(config.dest_path()),
                ignore: vec!["**/*.map".to_string()],
            },
        )?;

        let output = config.output_package_json_path();
        let manifest_dir = output.parent().unwrap_or_else(|| Path::new("."));
        let file_name = output
            .file_name()
            .ok_or_else(|| BuildError::invalid_manifest(&output, "not a file path"))?;

        let map = synthesize(
            &exported,
            &ExportOptions {
                cjs_extension: &config.cjs_extension,
                esm_extension: &config.esm_extension,
                index_name: &config.index_name,
                manifest_dir,
            },
        );

        let mut manifest = read_manifest(&config.package_json_path()).await?;
        apply_exports(&mut manifest, &map);
        write_manifest(&output, &manifest).await?;

        info!("Wrote {} exports to {}", map.len(), output.display());
        Ok(ArtifactSet::from_files(manifest_dir, [file_name]))
    }
}
