//! One text generation session for one project.

use super::autosave::Autosaver;
use super::source::BatchedEventSource;
use super::updater::apply;
use crate::error::GenerationError;
use crate::model::{GenerationRequest, Project, ProjectStatus};
use crate::storage::ProjectStore;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};

const EVENT_BUFFER: usize = 64;

pub struct GenerationService {
    store: Arc<dyn ProjectStore>,
    source: BatchedEventSource,
    autosave_delay: Duration,
}

impl GenerationService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        source: BatchedEventSource,
        autosave_delay: Duration,
    ) -> Self {
        Self {
            store,
            source,
            autosave_delay,
        }
    }

    /// Drive `initial` through a full session, publishing a snapshot after
    /// every applied event.
    ///
    /// On failure the project is persisted as `failed` before the error is
    /// returned. Cancellation leaves the status untouched.
    pub async fn run(
        &self,
        initial: Project,
        request: GenerationRequest,
        cancel: watch::Receiver<bool>,
        updates: broadcast::Sender<Project>,
    ) -> Result<Project, GenerationError> {
        let mut project = initial;
        self.store.save(&project).await?;
        publish(&updates, &project);

        let autosaver = Autosaver::new(self.store.clone(), self.autosave_delay);
        let (events_tx, mut events_rx) = mpsc::channel(EVENT_BUFFER);

        let source = self.source.run(&request, cancel, events_tx);
        tokio::pin!(source);
        let mut outcome = None;

        loop {
            tokio::select! {
                result = &mut source, if outcome.is_none() => outcome = Some(result),
                event = events_rx.recv() => match event {
                    Some(event) => {
                        apply(&event, &mut project);
                        autosaver.schedule_save(project.clone()).await;
                        publish(&updates, &project);
                    }
                    None => break,
                },
            }
        }

        let outcome = match outcome {
            Some(outcome) => outcome,
            None => source.await,
        };

        match outcome {
            Ok(()) => {
                autosaver.flush().await;
                self.store.save(&project).await?;
                tracing::info!(
                    project_id = %project.id,
                    episodes = project.episodes.len(),
                    "generation complete"
                );
                Ok(project)
            }
            Err(GenerationError::Cancelled) => {
                autosaver.flush().await;
                tracing::info!(project_id = %project.id, "generation cancelled");
                Err(GenerationError::Cancelled)
            }
            Err(err) => {
                tracing::error!(project_id = %project.id, "generation failed: {}", err);
                project.status = ProjectStatus::Failed;
                project.error_message = Some(err.to_string());
                project.last_updated_at = Utc::now();
                autosaver.flush().await;
                if let Err(save_err) = self.store.save(&project).await {
                    tracing::warn!("failed to persist failed project: {}", save_err);
                }
                publish(&updates, &project);
                Err(err)
            }
        }
    }
}

fn publish(updates: &broadcast::Sender<Project>, project: &Project) {
    if updates.send(project.clone()).is_err() {
        tracing::trace!("no snapshot subscribers");
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
