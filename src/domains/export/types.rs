use std::io;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domains::export::geometry::PolylinePrecision;
use crate::domains::project::types::PlaceCategory;

/// Export-specific errors.
///
/// `MissingProject` and `MissingPrincipal` are caller errors raised before
/// any I/O; the rest surface from workspace assembly and archive streaming.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Project not found")]
    MissingProject,

    #[error("Project has no principal place")]
    MissingPrincipal,

    #[error("Template '{name}' could not be read: {source}")]
    Template {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] async_zip::error::ZipError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Validated per-call export options.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Embed the export document into the page instead of `data/project.json`.
    pub inline_data: bool,
    /// Localize logo and model assets into the bundle.
    pub inline_assets: bool,
    /// Probe the local library cache before falling back to CDN tags.
    pub include_local_libs: bool,
    /// Per-call style override, ahead of the project-stored reference.
    #[serde(rename = "styleURL")]
    pub style_url: Option<String>,
    /// Routing profile tags applied positionally to each decoded route.
    pub profiles: Vec<String>,
    /// Out-of-band polyline precision, for callers that know their encoder.
    pub precision_hint: Option<PolylinePrecision>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            inline_data: false,
            inline_assets: true,
            include_local_libs: true,
            style_url: None,
            profiles: vec![DEFAULT_PROFILE.to_string()],
            precision_hint: None,
        }
    }
}

pub const DEFAULT_PROFILE: &str = "driving";

/// Sentinel style reference expanded by the bundle assembler into the
/// built-in raster basemap.
pub const SATELLITE_STYLE_SENTINEL: &str = "satellite";

// ---------------------------------------------------------------------------
// The public export schema. Synthesized fresh per call, never persisted.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub project: ProjectMeta,
    pub principal: ExportPlace,
    pub secondaries: Vec<ExportPlace>,
    pub generated_at: DateTime<Utc>,
    pub generator: GeneratorInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMeta {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[serde(rename = "styleURL")]
    pub style_url: String,
    pub logo: Option<LogoRef>,
    pub units: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogoRef {
    pub src: String,
    pub alt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srcset: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub version: String,
}

impl Default for GeneratorInfo {
    fn default() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPlace {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub heading: Option<f64>,
    pub zoom: Option<f64>,
    pub bounds: Option<Vec<[f64; 2]>>,
    pub category: PlaceCategory,
    pub media: PlaceMedia,
    pub model3d: Option<Model3dExport>,
    pub gallery: Vec<serde_json::Value>,
    pub footer_info: ExportFooterInfo,
    pub routes: Vec<RouteExport>,
}

/// Immersive media attached to a place. Exactly one source is expected
/// upstream; `None` is the defensive tolerance for legacy records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PlaceMedia {
    #[serde(rename_all = "camelCase")]
    Panorama { panorama_url: String },
    #[serde(rename_all = "camelCase")]
    Tour { tour_url: String },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model3dExport {
    pub url: String,
    pub use_as_marker: bool,
    pub scale: f64,
    pub rotation: [f64; 3],
    pub altitude: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFooterInfo {
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteExport {
    pub profile: String,
    pub distance_m: Option<i64>,
    pub duration_s: Option<i64>,
    pub geometry: RouteGeometry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteGeometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<[f64; 2]>,
}

impl RouteGeometry {
    pub fn line_string(coordinates: Vec<[f64; 2]>) -> Self {
        Self {
            kind: "LineString".to_string(),
            coordinates,
        }
    }
}

impl ExportDocument {
    /// Iterate the principal and secondaries in order.
    pub fn places(&self) -> impl Iterator<Item = &ExportPlace> {
        std::iter::once(&self.principal).chain(self.secondaries.iter())
    }

    pub fn places_mut(&mut self) -> impl Iterator<Item = &mut ExportPlace> {
        std::iter::once(&mut self.principal).chain(self.secondaries.iter_mut())
    }

    /// True when any place carries a 3D model reference, which pulls the 3D
    /// rendering pipeline into the bundle.
    pub fn has_models(&self) -> bool {
        self.places().any(|p| p.model3d.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_union_wire_shape() {
        let pano = PlaceMedia::Panorama {
            panorama_url: "https://cdn.example/pano.jpg".to_string(),
        };
        let json = serde_json::to_value(&pano).unwrap();
        assert_eq!(json["type"], "panorama");
        assert_eq!(json["panoramaUrl"], "https://cdn.example/pano.jpg");

        let tour = PlaceMedia::Tour {
            tour_url: "https://tours.example/t/1".to_string(),
        };
        let json = serde_json::to_value(&tour).unwrap();
        assert_eq!(json["type"], "tour");
        assert_eq!(json["tourUrl"], "https://tours.example/t/1");
    }

    #[test]
    fn test_schema_field_names() {
        let geometry = RouteGeometry::line_string(vec![[2.0, 1.0], [2.1, 1.1]]);
        let route = RouteExport {
            profile: "driving".to_string(),
            distance_m: Some(1200),
            duration_s: Some(600),
            geometry,
        };
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["geometry"]["type"], "LineString");
        assert_eq!(json["distance_m"], 1200);
        assert_eq!(json["duration_s"], 600);
    }

    #[test]
    fn test_options_accept_wire_names_and_default() {
        let options: ExportOptions =
            serde_json::from_str(r#"{"inlineData":true,"styleURL":"satellite"}"#).unwrap();
        assert!(options.inline_data);
        assert!(options.inline_assets);
        assert_eq!(options.style_url.as_deref(), Some("satellite"));
        assert_eq!(options.profiles, vec!["driving".to_string()]);
    }
}
