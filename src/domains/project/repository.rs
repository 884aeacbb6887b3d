use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domains::project::types::ProjectDocument;
use crate::errors::{DomainError, DomainResult};

/// Read-only seam to the persistence layer. The exporter never writes
/// project state; implementations live with whatever store the embedding
/// application uses.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Fetch a project document by id, `None` when absent.
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ProjectDocument>>;
}

/// In-memory repository, useful for tests and embedding without a store.
#[derive(Default)]
pub struct InMemoryProjectRepository {
    documents: RwLock<HashMap<Uuid, ProjectDocument>>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: ProjectDocument) {
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        documents.insert(document.id, document);
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<ProjectDocument>> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DomainError::Internal("project store lock poisoned".to_string()))?;
        Ok(documents.get(&id).cloned())
    }
}
