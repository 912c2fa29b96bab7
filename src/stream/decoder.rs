//! Model-output event decoding.
//!
//! [`EventDecoder`] turns model text into [`StreamEvent`]s. A frame that does
//! not decode is logged and dropped; only a framer overflow is an error.
//!
//! [`ResponseDecoder`] sits in front of it and handles the two outer layers of
//! an upstream response: SSE framing, then the JSON envelope around each chunk
//! of model text.

use super::envelope::extract_model_text;
use super::event::StreamEvent;
use super::framer::{FramerError, JsonFramer};
use super::sse::SseAccumulator;
use super::wire_log::WireLog;

/// SSE payload that marks the end of the response.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug)]
pub struct EventDecoder {
    framer: JsonFramer,
    decoded_count: usize,
    wire_log: WireLog,
}

impl Default for EventDecoder {
    fn default() -> Self {
        Self::new(JsonFramer::default(), WireLog::default())
    }
}

impl EventDecoder {
    pub fn new(framer: JsonFramer, wire_log: WireLog) -> Self {
        Self {
            framer,
            decoded_count: 0,
            wire_log,
        }
    }

    pub fn append(&mut self, text: &str) -> Result<Vec<StreamEvent>, FramerError> {
        let frames = self.framer.append(text)?;
        Ok(self.decode_frames(frames))
    }

    /// Log any truncated trailing value and reset the framer.
    pub fn finish(&mut self) {
        if let Some(trailing) = self.framer.finish() {
            self.wire_log
                .decode_failure("model output", &trailing, &"truncated trailing value");
        }
    }

    /// Events successfully decoded so far.
    pub fn decoded_count(&self) -> usize {
        self.decoded_count
    }

    fn decode_frames(&mut self, frames: Vec<String>) -> Vec<StreamEvent> {
        let mut events = Vec::with_capacity(frames.len());

        for frame in frames {
            // Top-level arrays are not events.
            if !frame.starts_with('{') {
                continue;
            }

            match serde_json::from_str::<StreamEvent>(&frame) {
                Ok(event) => {
                    self.decoded_count += 1;
                    events.push(event);
                }
                Err(err) => self.wire_log.decode_failure("model output", &frame, &err),
            }
        }

        events
    }
}

/// Decodes one upstream response body, fed line by line.
#[derive(Debug)]
pub struct ResponseDecoder {
    accumulator: SseAccumulator,
    envelope_framer: JsonFramer,
    events: EventDecoder,
    payload_index: usize,
    wire_log: WireLog,
    done: bool,
}

impl ResponseDecoder {
    pub fn new(max_buffer_bytes: usize, wire_log: WireLog) -> Self {
        Self {
            accumulator: SseAccumulator::new(),
            envelope_framer: JsonFramer::new(max_buffer_bytes),
            events: EventDecoder::new(JsonFramer::new(max_buffer_bytes), wire_log),
            payload_index: 0,
            wire_log,
            done: false,
        }
    }

    /// Feed one body line; returns the events it completed.
    ///
    /// Lines after the `[DONE]` sentinel are ignored.
    pub fn push_line(&mut self, line: &str) -> Result<Vec<StreamEvent>, FramerError> {
        if self.done {
            return Ok(Vec::new());
        }

        match self.accumulator.ingest(line) {
            Some(payload) => self.handle_payload(&payload),
            None => Ok(Vec::new()),
        }
    }

    /// True once the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Flush any unterminated final SSE event and log truncated leftovers.
    pub fn finish(&mut self) -> Result<Vec<StreamEvent>, FramerError> {
        let mut events = Vec::new();

        if !self.done {
            if let Some(payload) = self.accumulator.flush() {
                events = self.handle_payload(&payload)?;
            }
        }

        if let Some(trailing) = self.envelope_framer.finish() {
            self.wire_log
                .decode_failure("sse payload", &trailing, &"truncated trailing value");
        }
        self.events.finish();

        Ok(events)
    }

    pub fn decoded_count(&self) -> usize {
        self.events.decoded_count()
    }

    fn handle_payload(&mut self, payload: &str) -> Result<Vec<StreamEvent>, FramerError> {
        self.payload_index += 1;
        self.wire_log.payload(self.payload_index, payload);

        if payload == DONE_SENTINEL {
            self.done = true;
            return Ok(Vec::new());
        }

        let frames = match self.envelope_framer.append(payload) {
            Ok(frames) => frames,
            Err(err) => {
                self.wire_log.decode_failure("sse payload", payload, &err);
                return Err(err);
            }
        };

        let mut events = Vec::new();
        for frame in frames {
            let text = match extract_model_text(&frame) {
                Ok(Some(text)) if !text.is_empty() => text,
                Ok(_) => continue,
                Err(err) => {
                    self.wire_log.decode_failure("sse frame", &frame, &err);
                    continue;
                }
            };
            events.extend(self.events.append(&text)?);
        }

        Ok(events)
    }
}

#[cfg(test)]
#[path = "tests/decoder_tests.rs"]
mod tests;
