use crate::errors::{DomainResult, ValidationError};
use crate::validation::{Validate, ValidationBuilder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted project document as supplied by the storage layer.
///
/// The shape mirrors what is stored, not what is exported; the export
/// normalizer maps this into the public schema. `principal` is optional at
/// the type level because documents predating the invariant exist in the
/// wild, and the exporter fails fast on them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDocument {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "styleURL", default)]
    pub style_url: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
    #[serde(default)]
    pub principal: Option<PlaceRecord>,
    #[serde(default)]
    pub secondaries: Vec<PlaceRecord>,
}

/// A stored place: the principal location or an ordered secondary point of
/// interest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub heading: Option<f64>,
    #[serde(default)]
    pub zoom: Option<f64>,
    /// `[[lon, lat], [lon, lat]]` viewport corners.
    #[serde(default)]
    pub bounds: Option<Vec<[f64; 2]>>,
    #[serde(default)]
    pub category: PlaceCategory,
    /// Encoded route polylines from the principal place (secondaries only).
    #[serde(default)]
    pub routes_from_base: Vec<String>,
    /// Equirectangular panorama image URL.
    #[serde(default)]
    pub virtualtour: Option<String>,
    /// Hosted virtual tour URL.
    #[serde(default)]
    pub tour_url: Option<String>,
    #[serde(default)]
    pub footer_info: FooterInfoRecord,
    #[serde(default)]
    pub model3d: Option<Model3dRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaceCategory {
    Principal,
    Secondary,
    #[default]
    Other,
}

/// Free-text footer metadata entered by editors. `distance` and `time` are
/// display strings ("12 km", "25 min"), not numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FooterInfoRecord {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub distance: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
}

/// Reference to an uploaded 3D model attached to a place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model3dRecord {
    pub url: String,
    #[serde(default)]
    pub use_as_marker: bool,
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default)]
    pub rotation: Vec<f64>,
    #[serde(default)]
    pub altitude: f64,
}

fn default_scale() -> f64 {
    1.0
}

impl PlaceRecord {
    /// True when both media sources are populated, a data-integrity anomaly
    /// the upstream layer was meant to prevent.
    pub fn has_conflicting_media(&self) -> bool {
        let pano = self.virtualtour.as_deref().is_some_and(|s| !s.is_empty());
        let tour = self.tour_url.as_deref().is_some_and(|s| !s.is_empty());
        pano && tour
    }
}

impl Validate for PlaceRecord {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("name", Some(self.name.clone()))
            .required()
            .validate()?;
        ValidationBuilder::new("latitude", Some(self.latitude))
            .range(-90.0, 90.0)
            .validate()?;
        ValidationBuilder::new("longitude", Some(self.longitude))
            .range(-180.0, 180.0)
            .validate()?;
        if self.has_conflicting_media() {
            return Err(ValidationError::invalid_value(
                "media",
                "a place carries either a panorama or a tour URL, not both",
            )
            .into());
        }
        Ok(())
    }
}

impl Validate for ProjectDocument {
    fn validate(&self) -> DomainResult<()> {
        ValidationBuilder::new("title", Some(self.title.clone()))
            .required()
            .validate()?;
        if let Some(principal) = &self.principal {
            principal.validate()?;
        }
        for secondary in &self.secondaries {
            secondary.validate()?;
        }
        Ok(())
    }
}
