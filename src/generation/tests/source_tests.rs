use super::*;
use crate::generation::test_support::{body_for, sse_body, HEADER};
use crate::transport::{CaptureTransport, LineStream};
use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn source(transport: Arc<dyn SseTransport>) -> BatchedEventSource {
    BatchedEventSource::new(
        transport,
        GenerationSettings::default(),
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(40), 0.0),
    )
}

async fn run_source(
    source: &BatchedEventSource,
    request: &GenerationRequest,
) -> (Result<(), GenerationError>, Vec<StreamEvent>) {
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let (tx, mut rx) = mpsc::channel(256);
    let result = source.run(request, cancel_rx, tx).await;
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

/// Fails the first `failures` opens with `error`, then serves `body`.
struct FlakyTransport {
    failures: usize,
    error: GenerationError,
    body: String,
    opens: AtomicUsize,
}

#[async_trait]
impl SseTransport for FlakyTransport {
    async fn open(&self, _prompt: &str) -> Result<LineStream, GenerationError> {
        let attempt = self.opens.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(self.error.clone());
        }
        let lines: Vec<Result<String, GenerationError>> =
            self.body.lines().map(|l| Ok(l.to_string())).collect();
        Ok(stream::iter(lines).boxed())
    }
}

/// Serves `body` and then fails the connection mid-stream.
struct DroppingTransport {
    body: String,
    opens: AtomicUsize,
}

#[async_trait]
impl SseTransport for DroppingTransport {
    async fn open(&self, _prompt: &str) -> Result<LineStream, GenerationError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        let mut lines: Vec<Result<String, GenerationError>> = self
            .body
            .lines()
            .filter(|l| !l.contains("[DONE]"))
            .map(|l| Ok(l.to_string()))
            .collect();
        lines.push(Err(GenerationError::Transport {
            message: "connection reset".to_string(),
        }));
        Ok(stream::iter(lines).boxed())
    }
}

#[tokio::test]
async fn test_batches_forward_filtered_events_and_one_done() {
    let stray = r#"{"type":"line","episode_number":7,"speaker":"HOST_B","text":"stray"}"#;
    let transport = Arc::new(CaptureTransport::from_bodies(vec![
        body_for(&[1, 2], &[HEADER]),
        body_for(&[3], &[HEADER, stray]),
    ]));
    let request = GenerationRequest::new("Tides", 3);

    let (result, events) = run_source(&source(transport.clone()), &request).await;

    assert_eq!(result, Ok(()));
    let kinds: Vec<&str> = events.iter().map(StreamEvent::kind).collect();
    assert_eq!(
        kinds,
        vec![
            "project",
            "episode",
            "line",
            "episode_end",
            "episode",
            "line",
            "episode_end",
            "episode",
            "line",
            "episode_end",
            "done",
        ]
    );
    assert!(events.iter().all(|e| e.episode_number() != Some(7)));

    let prompts = transport.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Produce the project header FIRST."));
    assert!(!prompts[0].contains("Prior episodes"));
    assert!(prompts[1].contains("Do NOT emit a project header."));
    assert!(prompts[1].contains("Episode 1: Part 1 - Summary 1\nEpisode 2: Part 2 - Summary 2"));
    assert!(prompts[1].contains("Episodes to write now: 3 to 3"));
}

#[tokio::test]
async fn test_session_without_usable_events_fails() {
    let transport = Arc::new(CaptureTransport::from_bodies(vec![sse_body(&[
        r#"{"type":"line","episode_number":9,"speaker":"HOST_A","text":"x"}"#,
        r#"{"type":"done"}"#,
    ])]));
    let request = GenerationRequest::new("Tides", 1);

    let (result, events) = run_source(&source(transport), &request).await;

    assert_eq!(result, Err(GenerationError::NoValidStreamData));
    assert!(events.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_open_failure_is_retried() {
    let transport = Arc::new(FlakyTransport {
        failures: 2,
        error: GenerationError::Http {
            status: 503,
            body: None,
        },
        body: body_for(&[1], &[HEADER]),
        opens: AtomicUsize::new(0),
    });
    let request = GenerationRequest::new("Tides", 1);

    let (result, events) = run_source(&source(transport.clone()), &request).await;

    assert_eq!(result, Ok(()));
    assert_eq!(transport.opens.load(Ordering::SeqCst), 3);
    assert_eq!(events.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_http_status_is_not_retried() {
    let transport = Arc::new(FlakyTransport {
        failures: 5,
        error: GenerationError::Http {
            status: 401,
            body: Some("bad key".to_string()),
        },
        body: String::new(),
        opens: AtomicUsize::new(0),
    });
    let request = GenerationRequest::new("Tides", 2);

    let (result, _) = run_source(&source(transport.clone()), &request).await;

    assert!(matches!(result, Err(GenerationError::Http { status: 401, .. })));
    assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_missing_capture_surfaces_http_error_with_wire_log() {
    let transport = Arc::new(CaptureTransport::from_bodies(vec![body_for(&[1], &[HEADER])]));
    let settings = GenerationSettings {
        model: "gemini-2.0-pro".to_string(),
        batch_size: 1,
        wire_log: WireLog::new(true),
        ..GenerationSettings::default()
    };
    let source = BatchedEventSource::new(transport, settings, RetryPolicy::default());

    let (result, events) = run_source(&source, &GenerationRequest::new("Tides", 2)).await;

    match result {
        Err(GenerationError::Http { status, body }) => {
            assert_eq!(status, 404);
            assert_eq!(body.as_deref(), Some("no capture for request 2"));
        }
        other => panic!("expected a 404, got {:?}", other),
    }
    assert!(!events.contains(&StreamEvent::Done));
}

#[tokio::test(start_paused = true)]
async fn test_failure_after_forwarding_is_not_replayed() {
    let transport = Arc::new(DroppingTransport {
        body: body_for(&[1], &[HEADER]),
        opens: AtomicUsize::new(0),
    });
    let request = GenerationRequest::new("Tides", 1);

    let (result, events) = run_source(&source(transport.clone()), &request).await;

    assert!(matches!(
        result,
        Err(GenerationError::StreamInterrupted { .. })
    ));
    assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
    assert_eq!(
        events.iter().filter(|e| e.kind() == "line").count(),
        1
    );
    assert!(!events.contains(&StreamEvent::Done));
}

#[tokio::test]
async fn test_cancelled_before_first_batch() {
    let transport = Arc::new(CaptureTransport::from_bodies(vec![body_for(&[1], &[HEADER])]));
    let source = source(transport.clone());
    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).expect("cancel");
    let (tx, _rx) = mpsc::channel(16);

    let result = source
        .run(&GenerationRequest::new("Tides", 1), cancel_rx, tx)
        .await;

    assert_eq!(result, Err(GenerationError::Cancelled));
    assert!(transport.prompts().is_empty());
}

#[tokio::test]
async fn test_oversized_output_is_fatal() {
    let transport = Arc::new(CaptureTransport::from_bodies(vec![sse_body(&[&format!(
        r#"{{"type":"line","episode_number":1,"speaker":"HOST_A","text":"{}"#,
        "x".repeat(256)
    )])]));
    let settings = GenerationSettings {
        max_frame_buffer_bytes: 128,
        ..GenerationSettings::default()
    };
    let source = BatchedEventSource::new(transport, settings, RetryPolicy::default());

    let (result, _) = run_source(&source, &GenerationRequest::new("Tides", 1)).await;

    assert_eq!(
        result,
        Err(GenerationError::BufferExceededLimit { limit: 128 })
    );
}
