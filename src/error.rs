//! Error taxonomy for generation and audio sessions.
//!
//! Per-frame protocol errors never appear here: they are logged and dropped
//! where they occur. What remains are transport failures (retryable per
//! [`GenerationError::is_retryable`]), session-fatal failures, domain
//! rejections and cancellation, which is kept distinct from failure.

use crate::stream::FramerError;
use std::fmt::{Display, Formatter};

/// Errors that terminate (or are retried within) a text generation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Network-level failure opening or reading the upstream stream.
    Transport { message: String },
    /// Upstream answered with a non-success HTTP status.
    Http { status: u16, body: Option<String> },
    /// The JSON framer buffer grew past its cap; upstream output is unbounded or malformed.
    BufferExceededLimit { limit: usize },
    /// Every batch finished but not a single event was accepted.
    NoValidStreamData,
    /// A transport failure after the current batch had already forwarded events.
    StreamInterrupted { message: String },
    /// The project store rejected a load or save.
    Storage { message: String },
    Cancelled,
}

impl GenerationError {
    /// Network errors, HTTP 429 and HTTP 5xx are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => is_retryable_status(*status),
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl Display for GenerationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "transport error: {}", message),
            Self::Http {
                status,
                body: Some(body),
            } if !body.is_empty() => write!(f, "request failed (HTTP {}): {}", status, body),
            Self::Http { status, .. } => write!(f, "request failed (HTTP {})", status),
            Self::BufferExceededLimit { limit } => {
                write!(f, "stream buffer exceeded limit of {} bytes", limit)
            }
            Self::NoValidStreamData => write!(f, "stream returned no valid events"),
            Self::StreamInterrupted { message } => write!(f, "stream interrupted: {}", message),
            Self::Storage { message } => write!(f, "storage failure: {}", message),
            Self::Cancelled => write!(f, "generation cancelled"),
        }
    }
}

impl std::error::Error for GenerationError {}

/// Errors returned by a speech synthesizer collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    Transport { message: String },
    Http { status: u16, body: Option<String> },
    /// The response carried no inline audio data.
    MissingAudioPayload,
}

impl SpeechError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { status, .. } => is_retryable_status(*status),
            Self::MissingAudioPayload => false,
        }
    }
}

impl Display for SpeechError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport { message } => write!(f, "speech transport error: {}", message),
            Self::Http { status, .. } => write!(f, "speech request failed (HTTP {})", status),
            Self::MissingAudioPayload => write!(f, "speech response missing audio payload"),
        }
    }
}

impl std::error::Error for SpeechError {}

/// Errors that terminate an episode audio job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    ProjectNotFound,
    /// Audio requested before the whole podcast finished generating.
    ProjectNotReady,
    EpisodeNotFound,
    /// Audio requested before the episode transcript is complete.
    EpisodeNotReady,
    Speech(SpeechError),
    Write { message: String },
    Storage { message: String },
    Cancelled,
}

impl AudioError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Speech(err) => err.is_retryable(),
            _ => false,
        }
    }
}

impl Display for AudioError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound => write!(f, "project not found"),
            Self::ProjectNotReady => write!(
                f,
                "episode audio can be generated after the podcast is complete"
            ),
            Self::EpisodeNotFound => write!(f, "episode not found"),
            Self::EpisodeNotReady => write!(
                f,
                "episode audio can be generated after the transcript is complete"
            ),
            Self::Speech(err) => write!(f, "{}", err),
            Self::Write { message } => write!(f, "failed to write audio: {}", message),
            Self::Storage { message } => write!(f, "storage failure: {}", message),
            Self::Cancelled => write!(f, "audio generation cancelled"),
        }
    }
}

impl std::error::Error for AudioError {}

impl From<SpeechError> for AudioError {
    fn from(err: SpeechError) -> Self {
        Self::Speech(err)
    }
}

impl From<FramerError> for GenerationError {
    fn from(err: FramerError) -> Self {
        match err {
            FramerError::BufferExceededLimit { limit } => Self::BufferExceededLimit { limit },
        }
    }
}

impl From<StoreError> for GenerationError {
    fn from(err: StoreError) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AudioError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => Self::ProjectNotFound,
            other => Self::Storage {
                message: other.to_string(),
            },
        }
    }
}

/// Errors returned by a project store collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    NotFound(String),
    Io { message: String },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "project {} not found", id),
            Self::Io { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors talking to a task supervisor actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorError {
    Spawn { message: String },
    /// The actor stopped before it could answer.
    Unavailable,
}

impl Display for SupervisorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spawn { message } => write!(f, "failed to spawn supervisor: {}", message),
            Self::Unavailable => write!(f, "supervisor is not running"),
        }
    }
}

impl std::error::Error for SupervisorError {}

fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
