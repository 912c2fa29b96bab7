//! Batched event source.
//!
//! Runs one sub-request per episode range against an [`SseTransport`],
//! decodes the responses, filters events through [`BatchState`] and forwards
//! the accepted ones. Each batch attempt runs under the retry policy.

use super::batch::{episode_ranges, BatchContext, BatchState};
use super::prompt::{PromptEpisodes, PromptHosts, PromptOptions, PromptTemplate};
use super::retry::{cancelled, is_cancelled, RetryPolicy};
use crate::error::GenerationError;
use crate::model::GenerationRequest;
use crate::stream::{ResponseDecoder, StreamEvent, WireLog, DEFAULT_MAX_BUFFER_BYTES};
use crate::transport::SseTransport;
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Tuning for one generation session.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    /// Upper bound on episodes per sub-request.
    pub batch_size: u32,
    pub max_recaps: usize,
    pub max_frame_buffer_bytes: usize,
    pub wire_log: WireLog,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            batch_size: 2,
            max_recaps: 6,
            max_frame_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            wire_log: WireLog::default(),
        }
    }
}

pub struct BatchedEventSource {
    transport: Arc<dyn SseTransport>,
    settings: GenerationSettings,
    retry: RetryPolicy,
}

impl BatchedEventSource {
    pub fn new(
        transport: Arc<dyn SseTransport>,
        settings: GenerationSettings,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            settings,
            retry,
        }
    }

    /// Stream every accepted event of the session into `events`, followed by
    /// a single `Done` once all batches succeed.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        cancel: watch::Receiver<bool>,
        events: mpsc::Sender<StreamEvent>,
    ) -> Result<(), GenerationError> {
        let total = request.episode_count();
        let batch_size = self.settings.batch_size.min(total);
        let ranges = episode_ranges(total, batch_size);
        let batch_count = ranges.len();
        let mut state = BatchState::new();

        for (index, range) in ranges.into_iter().enumerate() {
            if is_cancelled(&cancel) {
                return Err(GenerationError::Cancelled);
            }

            let context = state.context_for(range);
            let prompt = self.prompt_for(request, total, &context, &state);
            let operation_name = format!("batch {}/{}", index + 1, batch_count);
            tracing::info!(
                model = %self.settings.model,
                "starting {} (episodes {}-{})",
                operation_name,
                context.episode_range.start(),
                context.episode_range.end()
            );

            state = self
                .retry
                .run(
                    &operation_name,
                    &cancel,
                    GenerationError::is_retryable,
                    || self.fetch_batch(&prompt, &context, state.clone(), cancel.clone(), &events),
                )
                .await?;
        }

        if !state.accepted_any() {
            return Err(GenerationError::NoValidStreamData);
        }

        send(&events, StreamEvent::Done).await
    }

    fn prompt_for(
        &self,
        request: &GenerationRequest,
        total: u32,
        context: &BatchContext,
        state: &BatchState,
    ) -> String {
        PromptTemplate::ndjson_prompt(
            &request.topic,
            &PromptEpisodes {
                total,
                range: context.episode_range.clone(),
            },
            &PromptHosts {
                host_a_name: request.host_a_name.clone(),
                host_b_name: request.host_b_name.clone(),
            },
            &PromptOptions {
                include_project_header: context.allow_project_header,
                include_done_marker: false,
                prior_recap: state
                    .recap_before(*context.episode_range.start(), self.settings.max_recaps),
                project_title: request.project_title.clone(),
            },
        )
    }

    /// One attempt at a batch. Returns the updated state on success.
    async fn fetch_batch(
        &self,
        prompt: &str,
        context: &BatchContext,
        mut state: BatchState,
        mut cancel: watch::Receiver<bool>,
        events: &mpsc::Sender<StreamEvent>,
    ) -> Result<BatchState, GenerationError> {
        let mut lines = match self.transport.open(prompt).await {
            Ok(lines) => lines,
            Err(err) => {
                if let GenerationError::Http { status, body } = &err {
                    self.settings.wire_log.http_error(*status, body.as_deref());
                }
                return Err(err);
            }
        };
        let mut decoder =
            ResponseDecoder::new(self.settings.max_frame_buffer_bytes, self.settings.wire_log);
        let mut forwarded = false;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancelled(&mut cancel) => return Err(GenerationError::Cancelled),
                next = lines.next() => next,
            };
            let Some(line) = next else {
                break;
            };

            let line = match line {
                Ok(line) => line,
                // Replaying the batch would duplicate what was already forwarded.
                Err(err) if forwarded && !err.is_cancelled() => {
                    return Err(GenerationError::StreamInterrupted {
                        message: err.to_string(),
                    })
                }
                Err(err) => return Err(err),
            };

            let decoded = decoder.push_line(&line)?;
            forwarded |= forward(decoded, context, &mut state, events).await?;
            if decoder.is_done() {
                break;
            }
        }

        let decoded = decoder.finish()?;
        forward(decoded, context, &mut state, events).await?;
        tracing::debug!(
            decoded = decoder.decoded_count(),
            "batch response finished"
        );

        Ok(state)
    }
}

/// Forward the accepted subset of `decoded`; true if anything was sent.
async fn forward(
    decoded: Vec<StreamEvent>,
    context: &BatchContext,
    state: &mut BatchState,
    events: &mpsc::Sender<StreamEvent>,
) -> Result<bool, GenerationError> {
    let mut sent = false;
    for event in decoded {
        if let Some(event) = state.accept(event, context) {
            send(events, event).await?;
            sent = true;
        }
    }
    Ok(sent)
}

async fn send(
    events: &mpsc::Sender<StreamEvent>,
    event: StreamEvent,
) -> Result<(), GenerationError> {
    // A dropped receiver means nobody is consuming the session any more.
    events
        .send(event)
        .await
        .map_err(|_| GenerationError::Cancelled)
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
