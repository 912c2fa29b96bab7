use super::task::{Job, Supervisor};
use crate::audio::AudioService;
use crate::error::{AudioError, SupervisorError};
use crate::model::{EpisodeId, Project, ProjectId};
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::broadcast;

const SNAPSHOT_CAPACITY: usize = 50;

/// Audio jobs keyed by `(project, episode)`.
#[derive(Clone)]
pub struct AudioSupervisor {
    tasks: Supervisor<(ProjectId, EpisodeId)>,
    service: Arc<AudioService>,
    updates: broadcast::Sender<Project>,
}

impl AudioSupervisor {
    pub async fn spawn(service: Arc<AudioService>) -> Result<Self, SupervisorError> {
        let (updates, _) = broadcast::channel(SNAPSHOT_CAPACITY);
        Ok(Self {
            tasks: Supervisor::spawn().await?,
            service,
            updates,
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Project> {
        self.updates.subscribe()
    }

    pub async fn start(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
    ) -> Result<bool, SupervisorError> {
        let service = self.service.clone();
        let updates = self.updates.clone();
        let job: Job = Box::new(move |cancel| {
            async move {
                match service.run(project_id, episode_id, cancel, updates).await {
                    Ok(_) | Err(AudioError::Cancelled) => {}
                    Err(err) => {
                        tracing::debug!(%project_id, %episode_id, "audio task exited: {}", err)
                    }
                }
            }
            .boxed()
        });
        self.tasks.start((project_id, episode_id), job).await
    }

    pub async fn cancel(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
    ) -> Result<bool, SupervisorError> {
        self.tasks.cancel((project_id, episode_id)).await
    }

    /// Cancel every audio job belonging to `project_id`.
    pub async fn cancel_all(&self, project_id: ProjectId) -> Result<usize, SupervisorError> {
        self.tasks
            .cancel_where(move |(project, _)| *project == project_id)
            .await
    }

    pub async fn is_running(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
    ) -> Result<bool, SupervisorError> {
        self.tasks.is_running(&(project_id, episode_id)).await
    }

    pub fn shutdown(&self) {
        self.tasks.shutdown();
    }
}
