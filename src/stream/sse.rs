//! Server-Sent-Events framing.
//!
//! Strips `data:` prefixes and groups consecutive data lines into one payload
//! per event. A blank line terminates the event.

const DATA_PREFIX: &str = "data:";

#[derive(Debug, Default)]
pub struct SseAccumulator {
    data_lines: Vec<String>,
}

impl SseAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingest one line of the response body.
    ///
    /// Returns the joined payload when `line` terminates an event. Fields
    /// other than `data:` (`event:`, `id:`, `retry:`, comments) are ignored.
    pub fn ingest(&mut self, line: &str) -> Option<String> {
        // Servers using CRLF can leave a trailing '\r' on each line.
        let line = line.trim_matches(|c| c == '\n' || c == '\r');

        if let Some(payload) = line.trim_start().strip_prefix(DATA_PREFIX) {
            self.data_lines.push(payload.trim().to_string());
            return None;
        }

        if line.trim().is_empty() {
            return self.flush();
        }

        None
    }

    /// Emit whatever payload is pending. Must also be called at end of stream
    /// to recover a final event that lacks a trailing blank line.
    pub fn flush(&mut self) -> Option<String> {
        if self.data_lines.is_empty() {
            return None;
        }

        let payload = self.data_lines.join("\n");
        self.data_lines.clear();
        Some(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_line_flushes_event() {
        let mut acc = SseAccumulator::new();
        assert_eq!(acc.ingest("data: {\"a\":1}"), None);
        assert_eq!(acc.ingest(""), Some("{\"a\":1}".to_string()));
        assert_eq!(acc.ingest(""), None);
    }

    #[test]
    fn test_multiple_data_lines_join_with_newline() {
        let mut acc = SseAccumulator::new();
        acc.ingest("data: first");
        acc.ingest("data:second  ");
        assert_eq!(acc.ingest("\r"), Some("first\nsecond".to_string()));
    }

    #[test]
    fn test_other_fields_are_ignored() {
        let mut acc = SseAccumulator::new();
        assert_eq!(acc.ingest("event: message"), None);
        assert_eq!(acc.ingest("id: 7"), None);
        assert_eq!(acc.ingest(": keep-alive"), None);
        assert_eq!(acc.ingest("data: payload"), None);
        assert_eq!(acc.ingest("retry: 1000"), None);
        assert_eq!(acc.ingest(""), Some("payload".to_string()));
    }

    #[test]
    fn test_crlf_terminated_lines() {
        let mut acc = SseAccumulator::new();
        acc.ingest("data: x\r\n");
        assert_eq!(acc.ingest("\r\n"), Some("x".to_string()));
    }

    #[test]
    fn test_flush_recovers_unterminated_event() {
        let mut acc = SseAccumulator::new();
        acc.ingest("data: tail");
        assert_eq!(acc.flush(), Some("tail".to_string()));
        assert_eq!(acc.flush(), None);
    }
}
