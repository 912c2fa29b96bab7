use super::task::{Job, Supervisor};
use crate::error::{GenerationError, SupervisorError};
use crate::generation::GenerationService;
use crate::model::{GenerationRequest, Project, ProjectId};
use futures::FutureExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::time::MissedTickBehavior;

const SNAPSHOT_CAPACITY: usize = 64;
const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runs at most one generation session per project and fans their
/// snapshots out to every subscriber.
#[derive(Clone)]
pub struct GenerationSupervisor {
    tasks: Supervisor<ProjectId>,
    service: Arc<GenerationService>,
    updates: broadcast::Sender<Project>,
}

impl GenerationSupervisor {
    pub async fn spawn(service: Arc<GenerationService>) -> Result<Self, SupervisorError> {
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

    /// Start generating `project`. Returns false if a session for the same
    /// project is already running.
    pub async fn start(
        &self,
        project: Project,
        request: GenerationRequest,
    ) -> Result<bool, SupervisorError> {
        let project_id = project.id;
        let service = self.service.clone();
        let updates = self.updates.clone();
        let job: Job = Box::new(move |cancel| {
            async move {
                match service.run(project, request, cancel, updates).await {
                    Ok(_) | Err(GenerationError::Cancelled) => {}
                    Err(err) => {
                        tracing::debug!(%project_id, "generation task exited: {}", err)
                    }
                }
            }
            .boxed()
        });
        self.tasks.start(project_id, job).await
    }

    pub async fn cancel(&self, project_id: ProjectId) -> Result<bool, SupervisorError> {
        self.tasks.cancel(project_id).await
    }

    pub async fn is_running(&self, project_id: ProjectId) -> Result<bool, SupervisorError> {
        self.tasks.is_running(&project_id).await
    }

    /// Hand each snapshot of `project_id` to `on_snapshot` until one is
    /// terminal or the session stops running, then return the last one seen.
    ///
    /// `updates` should be subscribed before the session is started. A
    /// session that ends without publishing anything yields `None`.
    pub async fn follow(
        &self,
        project_id: ProjectId,
        updates: &mut broadcast::Receiver<Project>,
        mut on_snapshot: impl FnMut(&Project),
    ) -> Result<Option<Project>, SupervisorError> {
        let mut last = None;
        let mut poll = tokio::time::interval(FOLLOW_POLL_INTERVAL);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                update = updates.recv() => match update {
                    Ok(snapshot) => {
                        if observe(project_id, snapshot, &mut last, &mut on_snapshot) {
                            return Ok(last);
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "snapshot subscriber lagged");
                    }
                    Err(RecvError::Closed) => return Ok(last),
                },
                _ = poll.tick() => {
                    if self.is_running(project_id).await? {
                        continue;
                    }
                    // The session published everything before it stopped.
                    loop {
                        match updates.try_recv() {
                            Ok(snapshot) => {
                                if observe(project_id, snapshot, &mut last, &mut on_snapshot) {
                                    break;
                                }
                            }
                            Err(TryRecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "snapshot subscriber lagged");
                            }
                            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                        }
                    }
                    tracing::debug!(%project_id, "generation session no longer running");
                    return Ok(last);
                }
            }
        }
    }

    pub fn shutdown(&self) {
        self.tasks.shutdown();
    }
}

/// Record `snapshot` if it belongs to `project_id`; true once it is terminal.
fn observe(
    project_id: ProjectId,
    snapshot: Project,
    last: &mut Option<Project>,
    on_snapshot: &mut impl FnMut(&Project),
) -> bool {
    if snapshot.id != project_id {
        return false;
    }
    on_snapshot(&snapshot);
    let terminal = snapshot.status.is_terminal();
    *last = Some(snapshot);
    terminal
}
