//! Project persistence collaborator.
//!
//! Only the in-memory store lives here; durable stores implement
//! [`ProjectStore`] elsewhere.

use crate::error::StoreError;
use crate::model::{Project, ProjectId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn load(&self, id: ProjectId) -> Result<Project, StoreError>;
    async fn save(&self, project: &Project) -> Result<(), StoreError>;
    async fn delete(&self, id: ProjectId) -> Result<(), StoreError>;
    /// Every stored project, most recently updated first.
    async fn load_all(&self) -> Result<Vec<Project>, StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
    saves: AtomicUsize,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn load(&self, id: ProjectId) -> Result<Project, StoreError> {
        self.projects
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn save(&self, project: &Project) -> Result<(), StoreError> {
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, id: ProjectId) -> Result<(), StoreError> {
        match self.projects.write().await.remove(&id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        let mut projects: Vec<Project> = self.projects.read().await.values().cloned().collect();
        projects.sort_by(|a, b| b.last_updated_at.cmp(&a.last_updated_at));
        Ok(projects)
    }
}
