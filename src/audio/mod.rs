//! Per-episode audio generation.

pub mod script;
pub mod service;

pub use script::{host_display_name, speech_request, HOST_A_VOICE, HOST_B_VOICE};
pub use service::AudioService;
