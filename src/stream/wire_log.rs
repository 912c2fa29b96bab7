//! Wire-level tracing of upstream payloads.
//!
//! Payload logging is off unless enabled in config or with
//! `ECHOFORGE_LOG_WIRE=1`. Decode failures are always logged.

use std::fmt::Display;

/// Environment flag that turns payload logging on.
pub const WIRE_LOG_ENV: &str = "ECHOFORGE_LOG_WIRE";

const MAX_LOGGED_CHARS: usize = 8_192;

#[derive(Debug, Clone, Copy, Default)]
pub struct WireLog {
    enabled: bool,
}

impl WireLog {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn payload(&self, index: usize, payload: &str) {
        if self.enabled {
            tracing::debug!(index, "sse payload: {}", clip(payload));
        }
    }

    pub fn http_error(&self, status: u16, body: Option<&str>) {
        if !self.enabled {
            return;
        }
        match body {
            Some(body) if !body.is_empty() => {
                tracing::debug!(status, "http error body: {}", clip(body))
            }
            _ => tracing::debug!(status, "http error with empty body"),
        }
    }

    /// A frame or payload that could not be decoded and was dropped.
    pub fn decode_failure(&self, what: &str, preview: &str, err: &dyn Display) {
        tracing::warn!("{} decode failed: {}; preview: {}", what, err, clip(preview));
    }
}

/// Clip `text` to the logging limit, noting the original length.
pub fn clip(text: &str) -> String {
    let total = text.chars().count();
    if total <= MAX_LOGGED_CHARS {
        return text.to_string();
    }
    let prefix: String = text.chars().take(MAX_LOGGED_CHARS).collect();
    format!("{}\n… (truncated, total chars: {})", prefix, total)
}
