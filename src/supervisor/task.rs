//! Keyed task supervisor actor.
//!
//! The actor owns the key → running task registry, so start, cancel and
//! completion are serialized through its mailbox. At most one task runs per
//! key. Cancellation is cooperative: the task receives a `watch` flag and is
//! expected to wind down on its own.

use crate::error::SupervisorError;
use async_trait::async_trait;
use futures::future::BoxFuture;
use ractor::{Actor, ActorProcessingErr, ActorRef};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

/// Work run by the supervisor; receives the task's cancel flag.
pub type Job = Box<dyn FnOnce(watch::Receiver<bool>) -> BoxFuture<'static, ()> + Send>;

pub trait TaskKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<T> TaskKey for T where T: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

pub enum SupervisorMsg<K: TaskKey> {
    /// Start `job` under `key`; replies false if a task is already running.
    Start {
        key: K,
        job: Job,
        reply: oneshot::Sender<bool>,
    },
    /// Cancel the task under `key`; replies whether one was running.
    Cancel { key: K, reply: oneshot::Sender<bool> },
    /// Cancel every task whose key matches; replies with the count.
    CancelWhere {
        predicate: Box<dyn Fn(&K) -> bool + Send>,
        reply: oneshot::Sender<usize>,
    },
    /// Sent by a task when its job returns.
    Finished { key: K, task_id: u64 },
    Running(oneshot::Sender<Vec<K>>),
}

struct RunningTask {
    task_id: u64,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct SupervisorState<K: TaskKey> {
    tasks: HashMap<K, RunningTask>,
    next_task_id: u64,
}

pub struct TaskSupervisor<K> {
    _key: PhantomData<fn() -> K>,
}

impl<K> Default for TaskSupervisor<K> {
    fn default() -> Self {
        Self { _key: PhantomData }
    }
}

#[async_trait]
impl<K: TaskKey> Actor for TaskSupervisor<K> {
    type Msg = SupervisorMsg<K>;
    type State = SupervisorState<K>;
    type Arguments = ();

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        _args: (),
    ) -> Result<Self::State, ActorProcessingErr> {
        Ok(SupervisorState {
            tasks: HashMap::new(),
            next_task_id: 0,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMsg::Start { key, job, reply } => {
                let started = if state.tasks.contains_key(&key) {
                    tracing::debug!(?key, "task already running");
                    false
                } else {
                    state.next_task_id += 1;
                    let task_id = state.next_task_id;
                    let (cancel, cancel_rx) = watch::channel(false);
                    let task_key = key.clone();
                    let handle = tokio::spawn(async move {
                        job(cancel_rx).await;
                        let finished = SupervisorMsg::Finished {
                            key: task_key,
                            task_id,
                        };
                        if myself.send_message(finished).is_err() {
                            tracing::debug!("supervisor stopped before task finished");
                        }
                    });
                    tracing::debug!(?key, task_id, "task started");
                    state.tasks.insert(
                        key,
                        RunningTask {
                            task_id,
                            cancel,
                            handle,
                        },
                    );
                    true
                };
                if reply.send(started).is_err() {
                    tracing::debug!("start reply channel closed");
                }
            }
            SupervisorMsg::Cancel { key, reply } => {
                let cancelled = match state.tasks.remove(&key) {
                    Some(task) => {
                        signal_cancel(&key, &task);
                        true
                    }
                    None => false,
                };
                if reply.send(cancelled).is_err() {
                    tracing::debug!("cancel reply channel closed");
                }
            }
            SupervisorMsg::CancelWhere { predicate, reply } => {
                let keys: Vec<K> = state
                    .tasks
                    .keys()
                    .filter(|key| predicate(key))
                    .cloned()
                    .collect();
                for key in &keys {
                    if let Some(task) = state.tasks.remove(key) {
                        signal_cancel(key, &task);
                    }
                }
                if reply.send(keys.len()).is_err() {
                    tracing::debug!("cancel reply channel closed");
                }
            }
            SupervisorMsg::Finished { key, task_id } => {
                // A newer task may have been started under the same key.
                if state
                    .tasks
                    .get(&key)
                    .is_some_and(|task| task.task_id == task_id)
                {
                    state.tasks.remove(&key);
                    tracing::debug!(?key, task_id, "task finished");
                }
            }
            SupervisorMsg::Running(reply) => {
                if reply.send(state.tasks.keys().cloned().collect()).is_err() {
                    tracing::debug!("running reply channel closed");
                }
            }
        }
        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        for (key, task) in state.tasks.drain() {
            signal_cancel(&key, &task);
        }
        Ok(())
    }
}

fn signal_cancel<K: Debug>(key: &K, task: &RunningTask) {
    tracing::debug!(?key, task_id = task.task_id, "cancelling task");
    if task.cancel.send(true).is_err() && task.handle.is_finished() {
        tracing::debug!(?key, "task had already exited");
    }
}

/// Client handle to a spawned [`TaskSupervisor`].
pub struct Supervisor<K: TaskKey> {
    actor: ActorRef<SupervisorMsg<K>>,
}

impl<K: TaskKey> Clone for Supervisor<K> {
    fn clone(&self) -> Self {
        Self {
            actor: self.actor.clone(),
        }
    }
}

impl<K: TaskKey> Supervisor<K> {
    pub async fn spawn() -> Result<Self, SupervisorError> {
        let (actor, _handle) = TaskSupervisor::<K>::spawn(None, TaskSupervisor::default(), ())
            .await
            .map_err(|err| SupervisorError::Spawn {
                message: err.to_string(),
            })?;
        Ok(Self { actor })
    }

    /// Start `job` under `key` unless a task is already running there.
    pub async fn start(&self, key: K, job: Job) -> Result<bool, SupervisorError> {
        self.call(|reply| SupervisorMsg::Start { key, job, reply })
            .await
    }

    pub async fn cancel(&self, key: K) -> Result<bool, SupervisorError> {
        self.call(|reply| SupervisorMsg::Cancel { key, reply }).await
    }

    pub async fn cancel_where(
        &self,
        predicate: impl Fn(&K) -> bool + Send + 'static,
    ) -> Result<usize, SupervisorError> {
        self.call(|reply| SupervisorMsg::CancelWhere {
            predicate: Box::new(predicate),
            reply,
        })
        .await
    }

    pub async fn running(&self) -> Result<Vec<K>, SupervisorError> {
        self.call(SupervisorMsg::Running).await
    }

    pub async fn is_running(&self, key: &K) -> Result<bool, SupervisorError> {
        Ok(self.running().await?.contains(key))
    }

    /// Stop the actor; running tasks are signalled to cancel.
    pub fn shutdown(&self) {
        self.actor.stop(None);
    }

    async fn call<T>(
        &self,
        message: impl FnOnce(oneshot::Sender<T>) -> SupervisorMsg<K>,
    ) -> Result<T, SupervisorError> {
        let (reply, rx) = oneshot::channel();
        self.actor
            .send_message(message(reply))
            .map_err(|_| SupervisorError::Unavailable)?;
        rx.await.map_err(|_| SupervisorError::Unavailable)
    }
}
