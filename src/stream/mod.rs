//! Streaming decode pipeline: SSE lines → JSON frames → typed events.

pub mod decoder;
pub mod envelope;
pub mod event;
pub mod framer;
pub mod sse;
pub mod wire_log;

pub use decoder::{EventDecoder, ResponseDecoder, DONE_SENTINEL};
pub use event::{DialogueLineEvent, EpisodeEnd, EpisodeHeader, HostHeader, ProjectHeader, StreamEvent};
pub use framer::{FramerError, JsonFramer, DEFAULT_MAX_BUFFER_BYTES};
pub use sse::SseAccumulator;
pub use wire_log::{WireLog, WIRE_LOG_ENV};
