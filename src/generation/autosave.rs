//! Debounced project persistence.
//!
//! Every [`Autosaver::schedule_save`] replaces the pending snapshot and
//! restarts the timer, so a burst of updates results in one save of the
//! latest snapshot. Saves are serialized; a save that has started is never
//! aborted.

use crate::model::Project;
use crate::storage::ProjectStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Pending {
    snapshot: Option<Project>,
    /// Bumped on every schedule and flush; a timer only saves if it still
    /// holds the current generation.
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

pub struct Autosaver {
    store: Arc<dyn ProjectStore>,
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
    save_lock: Arc<Mutex<()>>,
}

impl Autosaver {
    pub fn new(store: Arc<dyn ProjectStore>, delay: Duration) -> Self {
        Self {
            store,
            delay,
            pending: Arc::new(Mutex::new(Pending::default())),
            save_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn schedule_save(&self, project: Project) {
        let mut pending = self.pending.lock().await;
        pending.snapshot = Some(project);
        pending.generation += 1;
        if let Some(timer) = pending.timer.take() {
            timer.abort();
        }

        let generation = pending.generation;
        let delay = self.delay;
        let store = self.store.clone();
        let shared = self.pending.clone();
        let save_lock = self.save_lock.clone();

        pending.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _saving = save_lock.lock().await;

            let snapshot = {
                let mut pending = shared.lock().await;
                if pending.generation != generation {
                    return;
                }
                // Detach so a later schedule cannot abort the save below.
                pending.timer = None;
                pending.snapshot.take()
            };

            if let Some(project) = snapshot {
                save(store.as_ref(), &project).await;
            }
        }));
    }

    /// Cancel the timer and persist the pending snapshot now, if any.
    pub async fn flush(&self) {
        let snapshot = {
            let mut pending = self.pending.lock().await;
            pending.generation += 1;
            if let Some(timer) = pending.timer.take() {
                timer.abort();
            }
            pending.snapshot.take()
        };

        let _saving = self.save_lock.lock().await;
        if let Some(project) = snapshot {
            save(self.store.as_ref(), &project).await;
        }
    }

    pub async fn has_pending(&self) -> bool {
        self.pending.lock().await.snapshot.is_some()
    }
}

async fn save(store: &dyn ProjectStore, project: &Project) {
    match store.save(project).await {
        Ok(()) => tracing::debug!(project_id = %project.id, "autosaved project"),
        Err(err) => tracing::warn!(project_id = %project.id, "autosave failed: {}", err),
    }
}

#[cfg(test)]
#[path = "tests/autosave_tests.rs"]
mod tests;
