//! Batch windowing across one generation session.
//!
//! A request for N episodes is split into sequential sub-requests covering
//! disjoint episode ranges. [`BatchState`] is threaded through the batches and
//! decides which events of the current batch reach the aggregate.

use crate::stream::StreamEvent;
use std::ops::RangeInclusive;

/// Split `1..=total` into ascending ranges at most `batch_size` wide.
///
/// Both arguments are clamped to at least one.
pub fn episode_ranges(total: u32, batch_size: u32) -> Vec<RangeInclusive<u32>> {
    let total = total.max(1);
    let batch_size = batch_size.max(1);

    let mut ranges = Vec::new();
    let mut current = 1;
    while current <= total {
        let end = total.min(current.saturating_add(batch_size - 1));
        ranges.push(current..=end);
        match end.checked_add(1) {
            Some(next) => current = next,
            None => break,
        }
    }
    ranges
}

/// Scope of one sub-request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchContext {
    pub allow_project_header: bool,
    pub episode_range: RangeInclusive<u32>,
}

/// Condensed prior episode, used to seed later prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recap {
    pub number: u32,
    pub title: String,
    pub summary: String,
}

/// Session-wide batch state.
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    header_sent: bool,
    accepted_any: bool,
    recaps: Vec<Recap>,
}

impl BatchState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context_for(&self, episode_range: RangeInclusive<u32>) -> BatchContext {
        BatchContext {
            allow_project_header: !self.header_sent,
            episode_range,
        }
    }

    /// Filter one decoded event through the batch rules.
    ///
    /// Returns the event if it should be forwarded to the aggregate.
    pub fn accept(&mut self, event: StreamEvent, context: &BatchContext) -> Option<StreamEvent> {
        match &event {
            StreamEvent::Project(_) => {
                if !context.allow_project_header || self.header_sent {
                    return None;
                }
                self.header_sent = true;
            }
            // Only the session emits the final done marker.
            StreamEvent::Done => return None,
            StreamEvent::Episode(header) => {
                if !context.episode_range.contains(&header.episode_number) {
                    return None;
                }
                self.upsert_recap(Recap {
                    number: header.episode_number,
                    title: header.title.clone(),
                    summary: header.summary.clone(),
                });
            }
            StreamEvent::Line(_) | StreamEvent::EpisodeEnd(_) => {
                let in_range = event
                    .episode_number()
                    .is_some_and(|number| context.episode_range.contains(&number));
                if !in_range {
                    return None;
                }
            }
        }

        self.accepted_any = true;
        Some(event)
    }

    pub fn header_sent(&self) -> bool {
        self.header_sent
    }

    pub fn accepted_any(&self) -> bool {
        self.accepted_any
    }

    pub fn recaps(&self) -> &[Recap] {
        &self.recaps
    }

    /// Recap text for a batch starting at `episode_number`.
    ///
    /// Uses at most `max_recaps` of the latest earlier episodes, one per line
    /// as `Episode {n}: {title} - {summary}`, ASCII only. `None` when there is
    /// nothing to recap.
    pub fn recap_before(&self, episode_number: u32, max_recaps: usize) -> Option<String> {
        let mut earlier: Vec<&Recap> = self
            .recaps
            .iter()
            .filter(|recap| recap.number < episode_number)
            .collect();
        earlier.sort_by_key(|recap| recap.number);

        let skip = earlier.len().saturating_sub(max_recaps);
        let lines: Vec<String> = earlier
            .into_iter()
            .skip(skip)
            .map(|recap| {
                format!(
                    "Episode {}: {} - {}",
                    recap.number,
                    ascii_sanitize(&recap.title),
                    ascii_sanitize(&recap.summary)
                )
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }

    fn upsert_recap(&mut self, recap: Recap) {
        match self.recaps.iter_mut().find(|r| r.number == recap.number) {
            Some(existing) => *existing = recap,
            None => self.recaps.push(recap),
        }
    }
}

/// Replace every non-ASCII scalar with `?`.
pub fn ascii_sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if c.is_ascii() { c } else { '?' })
        .collect()
}

#[cfg(test)]
#[path = "tests/batch_tests.rs"]
mod tests;
