//! Replays recorded SSE responses, one per request.

use super::{LineStream, SseTransport};
use crate::error::GenerationError;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Mutex;

enum Captures {
    /// `batch-1.sse`, `batch-2.sse`, ... read on demand.
    Dir(PathBuf),
    Bodies(Vec<String>),
}

pub struct CaptureTransport {
    captures: Captures,
    prompts: Mutex<Vec<String>>,
}

impl CaptureTransport {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self::new(Captures::Dir(dir.into()))
    }

    pub fn from_bodies(bodies: Vec<String>) -> Self {
        Self::new(Captures::Bodies(bodies))
    }

    fn new(captures: Captures) -> Self {
        Self {
            captures,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in request order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn record(&self, prompt: &str) -> usize {
        match self.prompts.lock() {
            Ok(mut prompts) => {
                prompts.push(prompt.to_string());
                prompts.len()
            }
            Err(poisoned) => {
                let mut prompts = poisoned.into_inner();
                prompts.push(prompt.to_string());
                prompts.len()
            }
        }
    }

    async fn body(&self, request_number: usize) -> Result<String, GenerationError> {
        match &self.captures {
            Captures::Dir(dir) => {
                let path = dir.join(format!("batch-{}.sse", request_number));
                tokio::fs::read_to_string(&path).await.map_err(|err| {
                    if err.kind() == std::io::ErrorKind::NotFound {
                        GenerationError::Http {
                            status: 404,
                            body: Some(format!("no capture at {}", path.display())),
                        }
                    } else {
                        GenerationError::Transport {
                            message: format!("reading {}: {}", path.display(), err),
                        }
                    }
                })
            }
            Captures::Bodies(bodies) => request_number
                .checked_sub(1)
                .and_then(|index| bodies.get(index))
                .cloned()
                .ok_or_else(|| GenerationError::Http {
                    status: 404,
                    body: Some(format!("no capture for request {}", request_number)),
                }),
        }
    }
}

#[async_trait]
impl SseTransport for CaptureTransport {
    async fn open(&self, prompt: &str) -> Result<LineStream, GenerationError> {
        let request_number = self.record(prompt);
        let body = self.body(request_number).await?;
        tracing::debug!(request_number, bytes = body.len(), "replaying captured response");

        let lines: Vec<Result<String, GenerationError>> =
            body.lines().map(|line| Ok(line.to_string())).collect();
        Ok(stream::iter(lines).boxed())
    }
}
