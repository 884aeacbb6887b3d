use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use tokio::io::AsyncWrite;
use uuid::Uuid;

use crate::domains::core::asset_fetcher::AssetFetcher;
use crate::domains::export::archive::{self, ExportAttachment};
use crate::domains::export::bundle::BundleAssembler;
use crate::domains::export::normalizer::build_export_document;
use crate::domains::export::templates::TemplateSet;
use crate::domains::export::types::{ExportDocument, ExportOptions};
use crate::domains::export::workspace::Workspace;
use crate::domains::project::repository::ProjectRepository;
use crate::errors::ServiceResult;
use crate::validation::Validate;

/// Process-level configuration for the exporter, injected at construction.
#[derive(Debug, Clone, Default)]
pub struct ExportConfig {
    /// Directory overriding the embedded page templates.
    pub templates_dir: Option<PathBuf>,
    /// Local browser-library cache probed before CDN fallback.
    pub libs_cache_dir: Option<PathBuf>,
}

/// A fully assembled bundle, ready to stream. Holds the workspace; dropping
/// the bundle without streaming still removes it.
#[derive(Debug)]
pub struct ExportBundle {
    pub document: ExportDocument,
    pub attachment: ExportAttachment,
    workspace: Workspace,
}

impl ExportBundle {
    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Stream the bundle as a ZIP into `sink` and remove the workspace.
    ///
    /// Cleanup fires on every terminating path: explicitly here once
    /// streaming returns (success or fatal archive/sink error), and via the
    /// workspace's `Drop` when the future is cancelled mid-stream.
    pub async fn stream_into<W>(mut self, sink: W) -> ServiceResult<()>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let result = archive::stream_workspace(self.workspace.path(), sink).await;
        self.workspace.cleanup();
        if let Err(e) = &result {
            warn!("Export stream for {} aborted: {e}", self.attachment.filename);
        }
        result.map_err(Into::into)
    }
}

/// Orchestrates one export call: fetch, normalize, assemble, stream.
pub struct ProjectExportService {
    projects: Arc<dyn ProjectRepository>,
    assets: Arc<dyn AssetFetcher>,
    config: ExportConfig,
}

impl ProjectExportService {
    pub fn new(
        projects: Arc<dyn ProjectRepository>,
        assets: Arc<dyn AssetFetcher>,
        config: ExportConfig,
    ) -> Self {
        Self {
            projects,
            assets,
            config,
        }
    }

    /// Build the export document and materialize the workspace. Caller
    /// errors (missing project or principal) surface before any I/O.
    pub async fn prepare_export(
        &self,
        project_id: Uuid,
        options: &ExportOptions,
    ) -> ServiceResult<ExportBundle> {
        let record = self.projects.find_by_id(project_id).await?;

        if let Some(record) = &record {
            // Upstream enforces coordinate ranges and the single-media rule;
            // re-check defensively and keep going.
            if let Err(e) = record.validate() {
                warn!("Project {project_id} fails validation ({e}); exporting anyway");
            }
        }

        let mut document = build_export_document(record, options)?;

        let templates = TemplateSet::resolve(self.config.templates_dir.as_deref()).await?;
        let assembler = BundleAssembler::new(
            self.assets.as_ref(),
            &templates,
            self.config.libs_cache_dir.as_deref(),
        );
        let workspace = assembler.assemble(&mut document, options).await?;

        let attachment = ExportAttachment::new(
            &document.project.title,
            document.project.id,
            document.generated_at,
        );
        info!(
            "Prepared export {} at {}",
            attachment.filename,
            workspace.path().display()
        );

        Ok(ExportBundle {
            document,
            attachment,
            workspace,
        })
    }

    /// Convenience wrapper: prepare and stream in one call. HTTP layers that
    /// need headers before bytes use [`prepare_export`] and
    /// [`ExportBundle::stream_into`] separately.
    ///
    /// [`prepare_export`]: ProjectExportService::prepare_export
    pub async fn export_project<W>(
        &self,
        project_id: Uuid,
        options: &ExportOptions,
        sink: W,
    ) -> ServiceResult<ExportAttachment>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let bundle = self.prepare_export(project_id, options).await?;
        let attachment = bundle.attachment.clone();
        bundle.stream_into(sink).await?;
        Ok(attachment)
    }
}
