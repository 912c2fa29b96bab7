//! The podcast project aggregate and its owned entities.

use super::ids::{EpisodeId, ProjectId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the two podcast hosts. Serialized with the wire ids `HOST_A` / `HOST_B`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Speaker {
    #[serde(rename = "HOST_A")]
    HostA,
    #[serde(rename = "HOST_B")]
    HostB,
}

impl Speaker {
    pub fn as_str(&self) -> &'static str {
        match self {
            Speaker::HostA => "HOST_A",
            Speaker::HostB => "HOST_B",
        }
    }
}

impl std::fmt::Display for Speaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    pub id: Speaker,
    pub name: String,
    #[serde(default)]
    pub persona: Option<String>,
}

impl Host {
    pub fn new(id: Speaker, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            persona: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    #[default]
    Pending,
    Generating,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioStatus {
    #[default]
    None,
    Generating,
    Ready,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeAudio {
    pub status: AudioStatus,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl EpisodeAudio {
    pub fn generating(file_name: impl Into<String>) -> Self {
        Self {
            status: AudioStatus::Generating,
            file_name: Some(file_name.into()),
            generated_at: None,
            error_message: None,
        }
    }

    pub fn ready(file_name: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            status: AudioStatus::Ready,
            file_name: Some(file_name.into()),
            generated_at: Some(generated_at),
            error_message: None,
        }
    }

    pub fn failed(file_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: AudioStatus::Failed,
            file_name: Some(file_name.into()),
            generated_at: None,
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    /// 1-based, unique within the owning project.
    pub number: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub lines: Vec<DialogueLine>,
    pub status: EpisodeStatus,
    #[serde(default)]
    pub audio: Option<EpisodeAudio>,
}

impl Episode {
    pub fn new(number: u32, status: EpisodeStatus) -> Self {
        Self {
            id: EpisodeId::new(),
            number,
            title: None,
            summary: None,
            lines: Vec::new(),
            status,
            audio: None,
        }
    }

    /// Transcript as `SPEAKER_ID: text` lines.
    pub fn transcript_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{}: {}", line.speaker, line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn audio_status(&self) -> AudioStatus {
        self.audio
            .as_ref()
            .map(|audio| audio.status)
            .unwrap_or(AudioStatus::None)
    }

    /// Default audio file name for this episode.
    pub fn audio_file_name(&self) -> String {
        format!("{}.wav", self.id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Generating,
    Complete,
    Failed,
}

impl ProjectStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProjectStatus::Complete | ProjectStatus::Failed)
    }
}

/// The single mutable aggregate every decoded stream event converges on.
///
/// `episodes` holds at most one entry per episode number and is always
/// sorted ascending by number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub topic: String,
    pub episode_count_requested: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub episodes: Vec<Episode>,
    pub status: ProjectStatus,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Project {
    /// Creates a draft project with the default `Host A` / `Host B` hosts.
    pub fn new(topic: impl Into<String>, episode_count_requested: u32) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::new(),
            created_at: now,
            last_updated_at: now,
            topic: topic.into(),
            episode_count_requested,
            title: None,
            description: None,
            hosts: vec![
                Host::new(Speaker::HostA, "Host A"),
                Host::new(Speaker::HostB, "Host B"),
            ],
            episodes: Vec::new(),
            status: ProjectStatus::Draft,
            error_message: None,
        }
    }

    /// Creates the project a generation request starts from: status
    /// `generating`, host names and optional title taken from the request.
    pub fn for_request(request: &GenerationRequest) -> Self {
        let mut project = Self::new(request.topic.clone(), request.episode_count());
        project.status = ProjectStatus::Generating;
        project.title = request.project_title.clone();
        project.hosts = vec![
            Host::new(Speaker::HostA, request.host_a_name.clone()),
            Host::new(Speaker::HostB, request.host_b_name.clone()),
        ];
        project
    }

    pub fn episode(&self, id: EpisodeId) -> Option<&Episode> {
        self.episodes.iter().find(|episode| episode.id == id)
    }

    pub fn episode_by_number(&self, number: u32) -> Option<&Episode> {
        self.episodes.iter().find(|episode| episode.number == number)
    }

    pub fn host_name(&self, speaker: Speaker) -> Option<&str> {
        self.hosts
            .iter()
            .find(|host| host.id == speaker)
            .map(|host| host.name.trim())
            .filter(|name| !name.is_empty())
    }

    /// Replaces the episode with the same id, or appends it if absent.
    pub fn replace_episode(&mut self, episode: Episode) {
        match self.episodes.iter_mut().find(|e| e.id == episode.id) {
            Some(existing) => *existing = episode,
            None => self.episodes.push(episode),
        }
    }
}

/// Parameters of a text generation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub project_title: Option<String>,
    pub topic: String,
    pub episode_count: u32,
    pub host_a_name: String,
    pub host_b_name: String,
}

impl GenerationRequest {
    pub fn new(topic: impl Into<String>, episode_count: u32) -> Self {
        Self {
            project_title: None,
            topic: topic.into(),
            episode_count,
            host_a_name: "Host A".to_string(),
            host_b_name: "Host B".to_string(),
        }
    }

    pub fn with_hosts(mut self, host_a: impl Into<String>, host_b: impl Into<String>) -> Self {
        self.host_a_name = host_a.into();
        self.host_b_name = host_b.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.project_title = Some(title.into());
        self
    }

    /// Requested episode count, never less than one.
    pub fn episode_count(&self) -> u32 {
        self.episode_count.max(1)
    }
}
