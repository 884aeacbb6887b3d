use std::path::Path;

use log::{debug, info, warn};

use crate::domains::core::asset_fetcher::AssetFetcher;
use crate::domains::export::libs;
use crate::domains::export::slug::slugify;
use crate::domains::export::templates::{PageContext, TemplateSet};
use crate::domains::export::types::{
    ExportDocument, ExportError, ExportOptions, SATELLITE_STYLE_SENTINEL,
};
use crate::domains::export::workspace::Workspace;

/// Public default vector basemap, used when the built-in raster style cannot
/// be materialized.
const DEFAULT_VECTOR_STYLE_URL: &str = "https://demotiles.maplibre.org/style.json";

/// Built-in raster basemap the `"satellite"` sentinel expands into.
const SATELLITE_STYLE_JSON: &str = r#"{
  "version": 8,
  "name": "Satellite",
  "sources": {
    "satellite": {
      "type": "raster",
      "tiles": [
        "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}"
      ],
      "tileSize": 256,
      "attribution": "Imagery &copy; Esri"
    }
  },
  "layers": [
    { "id": "satellite", "type": "raster", "source": "satellite" }
  ]
}
"#;

/// Materializes a self-contained static site into a fresh [`Workspace`].
///
/// Asset localization is best-effort throughout: a failed download keeps the
/// remote reference and the export carries on. Only filesystem and
/// serialization failures inside the workspace itself are fatal, and the
/// workspace's own `Drop` covers cleanup on those paths.
pub struct BundleAssembler<'a> {
    fetcher: &'a dyn AssetFetcher,
    templates: &'a TemplateSet,
    libs_cache_dir: Option<&'a Path>,
}

impl<'a> BundleAssembler<'a> {
    pub fn new(
        fetcher: &'a dyn AssetFetcher,
        templates: &'a TemplateSet,
        libs_cache_dir: Option<&'a Path>,
    ) -> Self {
        Self {
            fetcher,
            templates,
            libs_cache_dir,
        }
    }

    /// Write the full bundle for `document`, mutating it so localized assets
    /// and the expanded style are what gets serialized.
    pub async fn assemble(
        &self,
        document: &mut ExportDocument,
        options: &ExportOptions,
    ) -> Result<Workspace, ExportError> {
        let with_models = document.has_models();
        let workspace = Workspace::create(with_models, !options.inline_data).await?;

        self.expand_style(&workspace, document).await;

        if options.inline_assets {
            self.localize_logo(&workspace, document).await;
            self.localize_models(&workspace, document).await;
        }
        // Panorama and tour URLs are deliberately never localized: duplicating
        // large immersive imagery into every bundle is a cost policy, not an
        // oversight.

        if !options.inline_data {
            let json = serde_json::to_vec_pretty(document)?;
            tokio::fs::write(workspace.join("data/project.json"), json).await?;
        }

        let mut resolved = libs::probe_cache(
            self.libs_cache_dir,
            options.include_local_libs,
            with_models,
        );
        if let Some(cache_dir) = self.libs_cache_dir {
            libs::materialize_local(&mut resolved, cache_dir, &workspace).await?;
        }
        let tags = libs::render_tags(&resolved, with_models);

        let inline_data = if options.inline_data {
            format!(
                "<script>window.__PROJECT__ = {};</script>",
                serde_json::to_string(document)?
            )
        } else {
            String::new()
        };
        let header_logo = header_logo_markup(document);

        let html = self.templates.render_shell(&PageContext {
            title: &document.project.title,
            lib_styles: &tags.styles,
            lib_scripts: &tags.scripts,
            inline_data: &inline_data,
            header_logo: &header_logo,
        });
        tokio::fs::write(workspace.join("map.html"), html).await?;
        tokio::fs::write(
            workspace.join("assets/js/app.js"),
            &self.templates.bootstrap,
        )
        .await?;
        tokio::fs::write(
            workspace.join("assets/css/styles.css"),
            &self.templates.stylesheet,
        )
        .await?;

        Ok(workspace)
    }

    async fn expand_style(&self, workspace: &Workspace, document: &mut ExportDocument) {
        if document.project.style_url != SATELLITE_STYLE_SENTINEL {
            return;
        }
        let rel = "assets/satellite-style.json";
        match tokio::fs::write(workspace.join(rel), SATELLITE_STYLE_JSON).await {
            Ok(()) => document.project.style_url = format!("./{rel}"),
            Err(e) => {
                warn!("Could not write built-in satellite style ({e}); using default vector basemap");
                document.project.style_url = DEFAULT_VECTOR_STYLE_URL.to_string();
            }
        }
    }

    /// Localize the project logo, opportunistically picking up a retina
    /// variant. Never fails the export: a failed download keeps the remote
    /// URL and the srcset hint reflects whatever exists.
    async fn localize_logo(&self, workspace: &Workspace, document: &mut ExportDocument) {
        let Some(logo) = document.project.logo.as_mut() else {
            return;
        };
        let remote = logo.src.clone();
        let ext = url_extension(&remote).unwrap_or_else(|| "png".to_string());
        let base_rel = format!("images/logo.{ext}");

        match self.fetcher.download(&remote, &workspace.join(&base_rel)).await {
            Ok(_) => {
                logo.src = format!("./{base_rel}");
                let mut variants = vec![format!("./{base_rel} 1x")];
                if let Some(retina_url) = retina_variant(&remote) {
                    let retina_rel = format!("images/logo@2x.{ext}");
                    match self
                        .fetcher
                        .download(&retina_url, &workspace.join(&retina_rel))
                        .await
                    {
                        Ok(_) => variants.push(format!("./{retina_rel} 2x")),
                        Err(e) => debug!("No retina logo variant at {retina_url}: {e}"),
                    }
                }
                logo.srcset = Some(variants.join(", "));
            }
            Err(e) => {
                warn!("Logo download failed, keeping remote reference: {e}");
                logo.srcset = Some(format!("{remote} 1x"));
            }
        }
    }

    /// Localize 3D models into `assets/models`, one per place, named by a
    /// slug of the place id. Per-model failures stay local to that place.
    async fn localize_models(&self, workspace: &Workspace, document: &mut ExportDocument) {
        for place in document.places_mut() {
            let place_id = place.id.clone();
            let Some(model) = place.model3d.as_mut() else {
                continue;
            };
            let remote = model.url.clone();
            let ext = url_extension(&remote).unwrap_or_else(|| "glb".to_string());
            let name = match slugify(&place_id) {
                s if s.is_empty() => "model".to_string(),
                s => s,
            };
            let rel = format!("assets/models/{name}.{ext}");

            match self.fetcher.download(&remote, &workspace.join(&rel)).await {
                Ok(asset) => {
                    info!(
                        "Localized model for place '{}' ({} bytes)",
                        place_id, asset.bytes_written
                    );
                    model.url = format!("./{rel}");
                }
                Err(e) => warn!(
                    "Model download failed for place '{}', keeping remote reference: {e}",
                    place_id
                ),
            }
        }
    }
}

/// File extension from a URL path, when it looks like one.
fn url_extension(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let path = parsed.path();
    let (_, ext) = path.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Derive the conventional `@2x` sibling URL for a raster asset.
fn retina_variant(url: &str) -> Option<String> {
    let mut parsed = reqwest::Url::parse(url).ok()?;
    let path = parsed.path().to_string();
    let (stem, ext) = path.rsplit_once('.')?;
    parsed.set_path(&format!("{stem}@2x.{ext}"));
    Some(parsed.to_string())
}

fn header_logo_markup(document: &ExportDocument) -> String {
    let title = escape_html(&document.project.title);
    match &document.project.logo {
        Some(logo) => {
            let srcset = logo
                .srcset
                .as_deref()
                .map(|s| format!(" srcset=\"{}\"", escape_html(s)))
                .unwrap_or_default();
            format!(
                "<img src=\"{}\"{} alt=\"{}\" class=\"logo-img\" /> <span class=\"logo-text\">{}</span>",
                escape_html(&logo.src),
                srcset,
                title,
                title
            )
        }
        None => format!("<span class=\"logo-text\">{title}</span>"),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
