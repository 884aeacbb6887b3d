use std::path::Path;

use log::{info, warn};
use walkdir::WalkDir;

use crate::domains::export::types::ExportError;
use crate::domains::export::workspace::Workspace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Stylesheet,
    Script,
}

/// One file a browser library ships. `tag` is `None` for support assets that
/// are referenced by configuration rather than a tag (the DRACO decoder
/// directory).
pub struct LibraryFile {
    pub cache_path: &'static str,
    pub bundle_path: &'static str,
    pub cdn_url: &'static str,
    pub tag: Option<TagKind>,
    pub directory: bool,
}

/// A pinned browser library. Local availability is all-or-nothing across
/// `files`: partial presence means a mismatched install and falls back to
/// the CDN pins wholesale.
pub struct BrowserLibrary {
    pub name: &'static str,
    pub files: &'static [LibraryFile],
}

pub static MAP_RENDERER: BrowserLibrary = BrowserLibrary {
    name: "maplibre-gl",
    files: &[
        LibraryFile {
            cache_path: "maplibre-gl/dist/maplibre-gl.css",
            bundle_path: "libs/maplibre-gl.css",
            cdn_url: "https://unpkg.com/maplibre-gl@3.6.1/dist/maplibre-gl.css",
            tag: Some(TagKind::Stylesheet),
            directory: false,
        },
        LibraryFile {
            cache_path: "maplibre-gl/dist/maplibre-gl.js",
            bundle_path: "libs/maplibre-gl.js",
            cdn_url: "https://unpkg.com/maplibre-gl@3.6.1/dist/maplibre-gl.js",
            tag: Some(TagKind::Script),
            directory: false,
        },
    ],
};

pub static PANORAMA_VIEWER: BrowserLibrary = BrowserLibrary {
    name: "pannellum",
    files: &[
        LibraryFile {
            cache_path: "pannellum/build/pannellum.css",
            bundle_path: "libs/pannellum.css",
            cdn_url: "https://cdn.jsdelivr.net/npm/pannellum@2.5.6/build/pannellum.css",
            tag: Some(TagKind::Stylesheet),
            directory: false,
        },
        LibraryFile {
            cache_path: "pannellum/build/pannellum.js",
            bundle_path: "libs/pannellum.js",
            cdn_url: "https://cdn.jsdelivr.net/npm/pannellum@2.5.6/build/pannellum.js",
            tag: Some(TagKind::Script),
            directory: false,
        },
    ],
};

pub static MODEL_RENDERER: BrowserLibrary = BrowserLibrary {
    name: "three",
    files: &[LibraryFile {
        cache_path: "three/build/three.min.js",
        bundle_path: "libs/three.min.js",
        cdn_url: "https://unpkg.com/three@0.147.0/build/three.min.js",
        tag: Some(TagKind::Script),
        directory: false,
    }],
};

pub static MODEL_LOADER: BrowserLibrary = BrowserLibrary {
    name: "gltf-loader",
    files: &[LibraryFile {
        cache_path: "three/examples/js/loaders/GLTFLoader.js",
        bundle_path: "libs/GLTFLoader.js",
        cdn_url: "https://unpkg.com/three@0.147.0/examples/js/loaders/GLTFLoader.js",
        tag: Some(TagKind::Script),
        directory: false,
    }],
};

pub static MESH_DECOMPRESSOR: BrowserLibrary = BrowserLibrary {
    name: "draco",
    files: &[
        LibraryFile {
            cache_path: "three/examples/js/loaders/DRACOLoader.js",
            bundle_path: "libs/DRACOLoader.js",
            cdn_url: "https://unpkg.com/three@0.147.0/examples/js/loaders/DRACOLoader.js",
            tag: Some(TagKind::Script),
            directory: false,
        },
        LibraryFile {
            cache_path: "three/examples/js/libs/draco",
            bundle_path: "libs/draco",
            cdn_url: "https://www.gstatic.com/draco/versioned/decoders/1.5.6/",
            tag: None,
            directory: true,
        },
    ],
};

/// The libraries a bundle needs: map renderer and panorama viewer always,
/// the 3D pipeline only when a model rides along.
pub fn required_libraries(with_models: bool) -> Vec<&'static BrowserLibrary> {
    let mut libs = vec![&MAP_RENDERER, &PANORAMA_VIEWER];
    if with_models {
        libs.push(&MODEL_RENDERER);
        libs.push(&MODEL_LOADER);
        libs.push(&MESH_DECOMPRESSOR);
    }
    libs
}

pub struct ResolvedLibrary {
    pub library: &'static BrowserLibrary,
    pub local: bool,
}

/// Probe the local cache for each required library.
pub fn probe_cache(
    cache_dir: Option<&Path>,
    include_local: bool,
    with_models: bool,
) -> Vec<ResolvedLibrary> {
    required_libraries(with_models)
        .into_iter()
        .map(|library| {
            let local = include_local
                && cache_dir.is_some_and(|dir| library.files.iter().all(|f| cached(dir, f)));
            ResolvedLibrary { library, local }
        })
        .collect()
}

fn cached(cache_dir: &Path, file: &LibraryFile) -> bool {
    let path = cache_dir.join(file.cache_path);
    if file.directory {
        path.is_dir()
    } else {
        path.is_file()
    }
}

/// Copy locally resolved libraries into the workspace `libs/` directory.
/// A copy failure degrades that library to its CDN pins; it never fails the
/// export.
pub async fn materialize_local(
    resolved: &mut [ResolvedLibrary],
    cache_dir: &Path,
    workspace: &Workspace,
) -> Result<(), ExportError> {
    if resolved.iter().any(|r| r.local) {
        tokio::fs::create_dir_all(workspace.join("libs")).await?;
    }
    for entry in resolved.iter_mut().filter(|r| r.local) {
        if let Err(e) = copy_library(entry.library, cache_dir, workspace).await {
            warn!(
                "Failed to copy local library '{}' ({}); falling back to CDN",
                entry.library.name, e
            );
            entry.local = false;
        } else {
            info!("Bundled local library '{}'", entry.library.name);
        }
    }
    Ok(())
}

async fn copy_library(
    library: &BrowserLibrary,
    cache_dir: &Path,
    workspace: &Workspace,
) -> std::io::Result<()> {
    for file in library.files {
        let src = cache_dir.join(file.cache_path);
        let dest = workspace.join(file.bundle_path);
        if file.directory {
            copy_dir(&src, &dest).await?;
        } else {
            tokio::fs::copy(&src, &dest).await?;
        }
    }
    Ok(())
}

async fn copy_dir(src: &Path, dest: &Path) -> std::io::Result<()> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::other)?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(std::io::Error::other)?;
        let target = dest.join(rel);
        if entry.file_type().is_dir() {
            tokio::fs::create_dir_all(&target).await?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::copy(entry.path(), &target).await?;
        }
    }
    Ok(())
}

pub struct LibraryTags {
    pub styles: String,
    pub scripts: String,
}

/// Render the stylesheet and script tags the page shell embeds. When models
/// are present a decoder-path assignment rides with the scripts so the
/// bootstrap can point the DRACO loader at the right place.
pub fn render_tags(resolved: &[ResolvedLibrary], with_models: bool) -> LibraryTags {
    let mut styles = Vec::new();
    let mut scripts = Vec::new();

    for entry in resolved {
        for file in entry.library.files {
            let href;
            let url = if entry.local {
                href = format!("./{}", file.bundle_path);
                href.as_str()
            } else {
                file.cdn_url
            };
            match file.tag {
                Some(TagKind::Stylesheet) => {
                    styles.push(format!("<link rel=\"stylesheet\" href=\"{url}\" />"));
                }
                Some(TagKind::Script) => {
                    scripts.push(format!("<script src=\"{url}\"></script>"));
                }
                None => {}
            }
        }
    }

    if with_models {
        let decoder_path = resolved
            .iter()
            .find(|r| std::ptr::eq(r.library, &MESH_DECOMPRESSOR))
            .map(|r| {
                if r.local {
                    "./libs/draco/".to_string()
                } else {
                    MESH_DECOMPRESSOR.files[1].cdn_url.to_string()
                }
            })
            .unwrap_or_else(|| MESH_DECOMPRESSOR.files[1].cdn_url.to_string());
        scripts.push(format!(
            "<script>window.__DRACO_DECODER_PATH__ = '{decoder_path}';</script>"
        ));
    }

    LibraryTags {
        styles: styles.join("\n  "),
        scripts: scripts.join("\n  "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_cache(root: &Path, paths: &[&str]) {
        for p in paths {
            let path = root.join(p);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"// stub").unwrap();
        }
    }

    #[test]
    fn test_probe_requires_every_file() {
        let cache = tempfile::tempdir().unwrap();
        seed_cache(
            cache.path(),
            &[
                "maplibre-gl/dist/maplibre-gl.js",
                "maplibre-gl/dist/maplibre-gl.css",
                // pannellum css missing: partial install
                "pannellum/build/pannellum.js",
            ],
        );

        let resolved = probe_cache(Some(cache.path()), true, false);
        assert!(resolved[0].local, "complete maplibre install is local");
        assert!(!resolved[1].local, "partial pannellum install is not");
    }

    #[test]
    fn test_probe_disabled_or_absent_cache() {
        let cache = tempfile::tempdir().unwrap();
        seed_cache(
            cache.path(),
            &[
                "maplibre-gl/dist/maplibre-gl.js",
                "maplibre-gl/dist/maplibre-gl.css",
            ],
        );
        assert!(probe_cache(Some(cache.path()), false, false).iter().all(|r| !r.local));
        assert!(probe_cache(None, true, false).iter().all(|r| !r.local));
    }

    #[test]
    fn test_model_pipeline_needs_decoder_directory() {
        let cache = tempfile::tempdir().unwrap();
        seed_cache(
            cache.path(),
            &[
                "three/build/three.min.js",
                "three/examples/js/loaders/GLTFLoader.js",
                "three/examples/js/loaders/DRACOLoader.js",
            ],
        );
        let resolved = probe_cache(Some(cache.path()), true, true);
        let draco = resolved
            .iter()
            .find(|r| r.library.name == "draco")
            .unwrap();
        assert!(!draco.local, "decoder directory missing");

        std::fs::create_dir_all(cache.path().join("three/examples/js/libs/draco")).unwrap();
        let resolved = probe_cache(Some(cache.path()), true, true);
        let draco = resolved
            .iter()
            .find(|r| r.library.name == "draco")
            .unwrap();
        assert!(draco.local);
    }

    #[test]
    fn test_cdn_tags_carry_pins() {
        let resolved = probe_cache(None, true, true);
        let tags = render_tags(&resolved, true);
        assert!(tags.styles.contains("maplibre-gl@3.6.1"));
        assert!(tags.styles.contains("pannellum@2.5.6"));
        assert!(tags.scripts.contains("three@0.147.0/build/three.min.js"));
        assert!(tags.scripts.contains("__DRACO_DECODER_PATH__"));
        assert!(tags.scripts.contains("gstatic.com/draco"));
    }

    #[tokio::test]
    async fn test_materialize_copies_and_rewrites_tags() {
        let cache = tempfile::tempdir().unwrap();
        seed_cache(
            cache.path(),
            &[
                "maplibre-gl/dist/maplibre-gl.js",
                "maplibre-gl/dist/maplibre-gl.css",
                "pannellum/build/pannellum.js",
                "pannellum/build/pannellum.css",
            ],
        );
        let workspace = Workspace::create(false, false).await.unwrap();
        let mut resolved = probe_cache(Some(cache.path()), true, false);
        materialize_local(&mut resolved, cache.path(), &workspace)
            .await
            .unwrap();

        assert!(workspace.join("libs/maplibre-gl.js").is_file());
        assert!(workspace.join("libs/pannellum.css").is_file());
        let tags = render_tags(&resolved, false);
        assert!(tags.scripts.contains("./libs/maplibre-gl.js"));
        assert!(!tags.scripts.contains("unpkg.com"));
    }
}
