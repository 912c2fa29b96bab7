//! Typed events decoded from model output.
//!
//! Property names are the wire contract the prompt asks the model to emit.

use crate::model::Speaker;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostHeader {
    pub id: Speaker,
    pub name: String,
    pub persona: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectHeader {
    pub topic: String,
    pub episode_count: u32,
    pub title: String,
    pub description: String,
    pub hosts: Vec<HostHeader>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeHeader {
    pub episode_number: u32,
    pub title: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLineEvent {
    pub episode_number: u32,
    pub speaker: Speaker,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeEnd {
    pub episode_number: u32,
}

/// One decoded frame, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Project(ProjectHeader),
    Episode(EpisodeHeader),
    Line(DialogueLineEvent),
    EpisodeEnd(EpisodeEnd),
    Done,
}

impl StreamEvent {
    /// Episode the event is scoped to, if any.
    pub fn episode_number(&self) -> Option<u32> {
        match self {
            StreamEvent::Episode(header) => Some(header.episode_number),
            StreamEvent::Line(line) => Some(line.episode_number),
            StreamEvent::EpisodeEnd(end) => Some(end.episode_number),
            StreamEvent::Project(_) | StreamEvent::Done => None,
        }
    }

    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Project(_) => "project",
            StreamEvent::Episode(_) => "episode",
            StreamEvent::Line(_) => "line",
            StreamEvent::EpisodeEnd(_) => "episode_end",
            StreamEvent::Done => "done",
        }
    }
}
