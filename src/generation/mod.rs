//! Text generation: batching, prompting, retries, aggregate updates and
//! autosave, tied together by [`GenerationService`].

pub mod autosave;
pub mod batch;
pub mod prompt;
pub mod retry;
pub mod service;
pub mod source;
pub mod updater;

#[cfg(test)]
pub(crate) mod test_support;

pub use autosave::{Autosaver, DEFAULT_AUTOSAVE_DELAY};
pub use batch::{ascii_sanitize, episode_ranges, BatchContext, BatchState, Recap};
pub use prompt::{PromptEpisodes, PromptHosts, PromptOptions, PromptTemplate};
pub use retry::{Cancellable, RetryPolicy};
pub use service::GenerationService;
pub use source::{BatchedEventSource, GenerationSettings, DEFAULT_MODEL};
pub use updater::apply;
