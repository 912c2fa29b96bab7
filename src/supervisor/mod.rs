//! Task supervisors.
//!
//! [`Supervisor`] is a keyed registry actor that runs at most one job per
//! key. [`GenerationSupervisor`] and [`AudioSupervisor`] bind it to the
//! generation and audio services and own their snapshot broadcasts.

pub mod audio;
pub mod generation;
pub mod task;

pub use audio::AudioSupervisor;
pub use generation::GenerationSupervisor;
pub use task::{Job, Supervisor, SupervisorMsg, TaskKey, TaskSupervisor};

#[cfg(test)]
#[path = "tests/supervisor_tests.rs"]
mod tests;
