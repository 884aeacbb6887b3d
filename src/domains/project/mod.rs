pub mod repository;
pub mod types;

pub use repository::{InMemoryProjectRepository, ProjectRepository};
pub use types::{FooterInfoRecord, Model3dRecord, PlaceCategory, PlaceRecord, ProjectDocument};
