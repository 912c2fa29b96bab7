//! EchoForge: streaming podcast generation.
//!
//! Upstream SSE responses are decoded into [`stream::StreamEvent`]s, filtered
//! per episode batch, folded into a [`model::Project`] and persisted with
//! debounced autosave. Supervisors own one generation task per project and
//! one audio task per episode.

pub mod audio;
pub mod config;
pub mod error;
pub mod generation;
pub mod model;
pub mod paths;
pub mod storage;
pub mod stream;
pub mod supervisor;
pub mod transport;

/// Git revision the binary was built from.
pub const GIT_SHA: &str = env!("ECHOFORGE_GIT_SHA");
