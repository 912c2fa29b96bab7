//! Network-facing collaborators.
//!
//! The pipeline only sees these traits. Live HTTP clients implement them
//! outside this crate; [`capture::CaptureTransport`] replays recorded
//! responses and [`MemoryAudioWriter`] keeps audio in memory.

pub mod capture;

use crate::error::{GenerationError, SpeechError};
use crate::model::{EpisodeId, ProjectId};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::collections::HashMap;
use tokio::sync::RwLock;

pub use capture::CaptureTransport;

/// Lines of one streaming response body, without line terminators.
pub type LineStream = BoxStream<'static, Result<String, GenerationError>>;

/// Opens a streaming text generation request.
#[async_trait]
pub trait SseTransport: Send + Sync {
    /// Send `prompt` and return the SSE body line by line.
    ///
    /// Non-success statuses fail here with [`GenerationError::Http`].
    async fn open(&self, prompt: &str) -> Result<LineStream, GenerationError>;
}

/// One named speaker and the prebuilt voice that reads its lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerVoice {
    pub name: String,
    pub voice: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechRequest {
    pub script: String,
    pub speakers: Vec<SpeakerVoice>,
}

/// Raw PCM returned by the speech model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechAudio {
    pub pcm: Vec<u8>,
    pub sample_rate_hz: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, SpeechError>;
}

/// Persists synthesized episode audio.
#[async_trait]
pub trait AudioWriter: Send + Sync {
    async fn write(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
        file_name: &str,
        audio: &SpeechAudio,
    ) -> std::io::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryAudioWriter {
    files: RwLock<HashMap<(ProjectId, String), SpeechAudio>>,
}

impl MemoryAudioWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, project_id: ProjectId, file_name: &str) -> Option<SpeechAudio> {
        self.files
            .read()
            .await
            .get(&(project_id, file_name.to_string()))
            .cloned()
    }
}

#[async_trait]
impl AudioWriter for MemoryAudioWriter {
    async fn write(
        &self,
        project_id: ProjectId,
        episode_id: EpisodeId,
        file_name: &str,
        audio: &SpeechAudio,
    ) -> std::io::Result<()> {
        tracing::debug!(%project_id, %episode_id, file_name, bytes = audio.pcm.len(), "storing audio");
        self.files
            .write()
            .await
            .insert((project_id, file_name.to_string()), audio.clone());
        Ok(())
    }
}
