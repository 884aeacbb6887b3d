//! Core services for the map-platform backend: turning a stored project
//! record into a self-contained static site bundle, streamed as a ZIP.
//!
//! Persistence and HTTP plumbing stay outside this crate. The embedding
//! application supplies a [`ProjectRepository`] and an output sink; the
//! exporter owns normalization, asset localization, browser-library
//! resolution, template rendering, and archive streaming with guaranteed
//! workspace cleanup.
//!
//! [`ProjectRepository`]: domains::project::ProjectRepository

// Public modules
pub mod domains;
pub mod errors;
pub mod validation;

pub use domains::core::asset_fetcher::{AssetFetcher, HttpAssetFetcher};
pub use domains::export::{
    decode_polyline, slugify, ExportAttachment, ExportBundle, ExportConfig, ExportDocument,
    ExportError, ExportOptions, PolylinePrecision, ProjectExportService,
};
pub use domains::project::{InMemoryProjectRepository, ProjectRepository};
