//! One audio job for one episode.

use super::script::speech_request;
use crate::error::AudioError;
use crate::generation::retry::{cancelled, RetryPolicy};
use crate::model::{
    Episode, EpisodeAudio, EpisodeId, EpisodeStatus, Project, ProjectId, ProjectStatus,
};
use crate::storage::ProjectStore;
use crate::transport::{AudioWriter, SpeechSynthesizer};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};

pub struct AudioService {
    store: Arc<dyn ProjectStore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    writer: Arc<dyn AudioWriter>,
    retry: RetryPolicy,
    /// Held across each load-modify-save of an audio record.
    store_lock: Mutex<()>,
}

impl AudioService {
    pub fn new(
        store: Arc<dyn ProjectStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        writer: Arc<dyn AudioWriter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            synthesizer,
            writer,
            retry,
            store_lock: Mutex::new(()),
        }
    }

    /// Synthesize and store audio for one episode.
    ///
    /// Domain checks run before any network call. Failures other than
    /// cancellation are recorded on the episode's audio before returning.
    pub async fn run(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
        cancel: watch::Receiver<bool>,
        updates: broadcast::Sender<Project>,
    ) -> Result<Project, AudioError> {
        let mut cancel_signal = cancel.clone();
        let result = tokio::select! {
            biased;
            _ = cancelled(&mut cancel_signal) => Err(AudioError::Cancelled),
            result = self.generate(project_id, episode_id, &cancel, &updates) => result,
        };

        match result {
            Ok(project) => Ok(project),
            Err(AudioError::Cancelled) => {
                tracing::info!(%project_id, %episode_id, "audio generation cancelled");
                Err(AudioError::Cancelled)
            }
            Err(err) => {
                tracing::error!(%project_id, %episode_id, "audio generation failed: {}", err);
                self.persist_failure(project_id, episode_id, &err, &updates)
                    .await;
                Err(err)
            }
        }
    }

    async fn generate(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
        cancel: &watch::Receiver<bool>,
        updates: &broadcast::Sender<Project>,
    ) -> Result<Project, AudioError> {
        let project = self.store.load(project_id).await?;
        if project.status != ProjectStatus::Complete {
            return Err(AudioError::ProjectNotReady);
        }
        let episode = project
            .episode(episode_id)
            .cloned()
            .ok_or(AudioError::EpisodeNotFound)?;
        if episode.status != EpisodeStatus::Complete || episode.lines.is_empty() {
            return Err(AudioError::EpisodeNotReady);
        }

        let file_name = episode.audio_file_name();
        let project = self
            .update_audio(project_id, episode_id, |_| {
                EpisodeAudio::generating(file_name.clone())
            })
            .await?;
        publish(updates, &project);

        let request = speech_request(&project, &episode);
        let audio = self
            .retry
            .run(
                "speech generation",
                cancel,
                AudioError::is_retryable,
                || async {
                    self.synthesizer
                        .synthesize(&request)
                        .await
                        .map_err(AudioError::from)
                },
            )
            .await?;

        self.writer
            .write(project_id, episode_id, &file_name, &audio)
            .await
            .map_err(|err| AudioError::Write {
                message: err.to_string(),
            })?;

        let project = self
            .update_audio(project_id, episode_id, |_| {
                EpisodeAudio::ready(file_name.clone(), Utc::now())
            })
            .await?;
        publish(updates, &project);

        tracing::info!(%project_id, %episode_id, bytes = audio.pcm.len(), "episode audio ready");
        Ok(project)
    }

    async fn persist_failure(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
        err: &AudioError,
        updates: &broadcast::Sender<Project>,
    ) {
        let message = err.to_string();
        let result = self
            .update_audio(project_id, episode_id, |episode| {
                let file_name = episode
                    .audio
                    .as_ref()
                    .and_then(|audio| audio.file_name.clone())
                    .unwrap_or_else(|| episode.audio_file_name());
                EpisodeAudio::failed(file_name, message)
            })
            .await;

        match result {
            Ok(project) => publish(updates, &project),
            Err(update_err) => tracing::warn!("cannot record audio failure: {}", update_err),
        }
    }

    /// Reload the project and replace one episode's audio record.
    ///
    /// Jobs for sibling episodes share the stored project, so the record is
    /// always written onto the latest stored copy under `store_lock`.
    async fn update_audio(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
        audio: impl FnOnce(&Episode) -> EpisodeAudio,
    ) -> Result<Project, AudioError> {
        let _guard = self.store_lock.lock().await;
        let mut project = self.store.load(project_id).await?;
        let mut episode = project
            .episode(episode_id)
            .cloned()
            .ok_or(AudioError::EpisodeNotFound)?;
        episode.audio = Some(audio(&episode));
        project.replace_episode(episode);
        project.last_updated_at = Utc::now();
        self.store.save(&project).await?;
        Ok(project)
    }
}

fn publish(updates: &broadcast::Sender<Project>, project: &Project) {
    if updates.send(project.clone()).is_err() {
        tracing::trace!("no audio snapshot subscribers");
    }
}

#[cfg(test)]
#[path = "tests/service_tests.rs"]
mod tests;
