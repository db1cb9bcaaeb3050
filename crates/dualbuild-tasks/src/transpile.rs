//! Transpile tasks

use crate::artifacts::{remove_dir_if_exists, ArtifactSet, CopyOptions};
use crate::error::{BuildError, BuildResult};
use crate::output::banner;
use crate::tasks::Tasks;
use crate::toolchain::{TranspileRequest, TypeCheckMode, TypeCheckRequest};
use dualbuild_config::Format;
use futures_util::future::join4;
use tracing::info;

impl Tasks {
    /// Compile the sources of one format into the destination
    pub async fn transpile_format(&self, format: Format) -> BuildResult<ArtifactSet> {
        let config = &self.config;
        let sources = self.find_sources(format)?;
        let out_dir = config.dest_path();

        self.tools
            .transpiler
            .transpile(TranspileRequest {
                root: &config.root,
                sources: &sources,
                format,
                out_dir: &out_dir,
                out_extension: config.extension(format),
                options: &config.transpile,
            })
            .await
    }

    /// Emit declarations for the sources of every enabled format
    pub async fn transpile_types(&self) -> BuildResult<ArtifactSet> {
        let config = &self.config;
        let files = ArtifactSet::merge([self.find_all_sources()?, self.find_types()?]);
        let extra_types = self.extra_types_dir();
        let tsconfig = config.tsconfig_path();

        self.tools
            .type_checker
            .check(TypeCheckRequest {
                root: &config.root,
                files: &files,
                tsconfig: &tsconfig,
                mode: TypeCheckMode::Emit {
                    out_dir: config.dest_path(),
                    root_dir: config.source_path(),
                },
                extra_types_dir: extra_types.as_deref(),
            })
            .await
    }

    /// Copy resources and hand-written declarations to the destination
    pub async fn copy_resources(&self) -> BuildResult<ArtifactSet> {
        let files = ArtifactSet::merge([self.find_resources()?, self.find_types()?]);
        files
            .copy(&self.config.dest_path(), &CopyOptions::default())
            .await
    }

    /// Clean the destination, then compile both formats, emit declarations
    /// and copy resources concurrently.
    pub async fn transpile(&self) -> BuildResult<ArtifactSet> {
        let config = &self.config;
        banner(config.banners_enabled(), "Transpiling source files");

        let dest = config.dest_path();
        remove_dir_if_exists(&dest).await?;

        let compile = |format: Format| async move {
            if config.is_enabled(format) {
                self.transpile_format(format).await
            } else {
                Ok(ArtifactSet::empty(config.dest_path()))
            }
        };

        let (cjs, esm, types, resources) = join4(
            compile(Format::Cjs),
            compile(Format::Esm),
            self.transpile_types(),
            self.copy_resources(),
        )
        .await;

        let sets = BuildError::collect([cjs, esm, types, resources])?;
        let result = ArtifactSet::merge(std::iter::once(ArtifactSet::empty(&dest)).chain(sets));

        info!("Transpiled {} files into {}", result.len(), dest.display());
        Ok(result)
    }
}
