//! Domain model for podcast projects.
//!
//! A [`Project`] is the aggregate that streamed model output converges on.
//! It owns its [`Episode`]s, which in turn own their dialogue lines and the
//! optional [`EpisodeAudio`] record.

pub mod ids;
pub mod project;

pub use ids::{EpisodeId, ProjectId};
pub use project::{
    AudioStatus, DialogueLine, Episode, EpisodeAudio, EpisodeStatus, GenerationRequest, Host,
    Project, ProjectStatus, Speaker,
};

#[cfg(test)]
#[path = "tests/project_tests.rs"]
mod tests;
