use std::sync::OnceLock;

use chrono::Utc;
use log::warn;
use regex::Regex;

use crate::domains::export::geometry::decode_polyline;
use crate::domains::export::types::{
    ExportDocument, ExportError, ExportFooterInfo, ExportOptions, ExportPlace, GeneratorInfo,
    LogoRef, Model3dExport, PlaceMedia, ProjectMeta, RouteExport, RouteGeometry, DEFAULT_PROFILE,
    SATELLITE_STYLE_SENTINEL,
};
use crate::domains::project::types::{PlaceRecord, ProjectDocument};

fn non_digits() -> &'static Regex {
    static NON_DIGITS: OnceLock<Regex> = OnceLock::new();
    NON_DIGITS.get_or_init(|| Regex::new(r"\D").expect("static pattern"))
}

/// Best-effort numeric extraction from footer free text: digits only.
fn extract_digits(text: &str) -> Option<i64> {
    let digits = non_digits().replace_all(text, "");
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Map a persisted project document into the stable public export schema.
///
/// Fails fast, before any I/O: `MissingProject` when the document is absent,
/// `MissingPrincipal` when it lacks a principal place.
pub fn build_export_document(
    doc: Option<ProjectDocument>,
    options: &ExportOptions,
) -> Result<ExportDocument, ExportError> {
    let doc = doc.ok_or(ExportError::MissingProject)?;
    let principal_record = doc.principal.as_ref().ok_or(ExportError::MissingPrincipal)?;

    let principal = normalize_place(principal_record, "principal".to_string(), &[], options);
    let secondaries = doc
        .secondaries
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            let fallback_id = format!("place-{idx}");
            normalize_place(record, fallback_id, &record.routes_from_base, options)
        })
        .collect();

    let style_url = options
        .style_url
        .clone()
        .or_else(|| doc.style_url.clone())
        .unwrap_or_else(|| SATELLITE_STYLE_SENTINEL.to_string());

    let logo = doc.logo_url.as_ref().map(|src| LogoRef {
        src: src.clone(),
        alt: "Logo".to_string(),
        srcset: None,
    });

    Ok(ExportDocument {
        project: ProjectMeta {
            id: doc.id,
            title: doc.title.clone(),
            description: doc.description.clone().unwrap_or_default(),
            style_url,
            logo,
            units: "metric".to_string(),
        },
        principal,
        secondaries,
        generated_at: Utc::now(),
        generator: GeneratorInfo::default(),
    })
}

fn normalize_place(
    record: &PlaceRecord,
    fallback_id: String,
    encoded_routes: &[String],
    options: &ExportOptions,
) -> ExportPlace {
    let id = record
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or(fallback_id);

    let footer = &record.footer_info;
    let distance_m = footer.distance.as_deref().and_then(extract_digits);
    let duration_s = footer
        .time
        .as_deref()
        .and_then(extract_digits)
        .map(|minutes| minutes * 60);

    let routes = encoded_routes
        .iter()
        .enumerate()
        .filter_map(|(idx, encoded)| {
            let coordinates = decode_polyline(encoded, options.precision_hint);
            if coordinates.len() < 2 {
                warn!("Dropping route {} of place '{}': fewer than 2 valid points", idx, id);
                return None;
            }
            let profile = options
                .profiles
                .get(idx)
                .or_else(|| options.profiles.first())
                .map(String::as_str)
                .unwrap_or(DEFAULT_PROFILE)
                .to_string();
            Some(RouteExport {
                profile,
                distance_m,
                duration_s,
                geometry: RouteGeometry::line_string(coordinates),
            })
        })
        .collect();

    ExportPlace {
        id,
        name: record.name.clone(),
        lat: record.latitude,
        lon: record.longitude,
        heading: record.heading,
        zoom: record.zoom,
        bounds: record.bounds.clone(),
        category: record.category,
        media: normalize_media(record),
        model3d: record.model3d.as_ref().map(|m| Model3dExport {
            url: m.url.clone(),
            use_as_marker: m.use_as_marker,
            scale: m.scale,
            rotation: normalize_rotation(&m.rotation),
            altitude: m.altitude,
        }),
        gallery: Vec::new(),
        footer_info: ExportFooterInfo {
            location: footer.location.clone(),
            distance_text: footer.distance.clone(),
            time_text: footer.time.clone(),
        },
        routes,
    }
}

/// Exactly one media source is enforced upstream; this re-checks defensively.
/// When both survive persistence anyway, panorama wins deterministically.
fn normalize_media(record: &PlaceRecord) -> PlaceMedia {
    let panorama = record.virtualtour.as_deref().filter(|s| !s.is_empty());
    let tour = record.tour_url.as_deref().filter(|s| !s.is_empty());
    match (panorama, tour) {
        (Some(pano), Some(_)) => {
            warn!(
                "Place '{}' carries both panorama and tour media; preferring panorama",
                record.name
            );
            PlaceMedia::Panorama {
                panorama_url: pano.to_string(),
            }
        }
        (Some(pano), None) => PlaceMedia::Panorama {
            panorama_url: pano.to_string(),
        },
        (None, Some(tour)) => PlaceMedia::Tour {
            tour_url: tour.to_string(),
        },
        (None, None) => PlaceMedia::None,
    }
}

fn normalize_rotation(rotation: &[f64]) -> [f64; 3] {
    let mut out = [0.0; 3];
    for (slot, value) in out.iter_mut().zip(rotation.iter()) {
        *slot = *value;
    }
    out
}
