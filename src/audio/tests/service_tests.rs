use super::*;
use crate::error::SpeechError;
use crate::model::{AudioStatus, DialogueLine, Episode, Speaker};
use crate::storage::MemoryProjectStore;
use crate::transport::{MemoryAudioWriter, SpeechAudio, SpeechRequest};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Returns queued errors first, then audio.
struct ScriptedSynthesizer {
    errors: Mutex<Vec<SpeechError>>,
    calls: AtomicUsize,
}

impl ScriptedSynthesizer {
    fn new(errors: Vec<SpeechError>) -> Self {
        Self {
            errors: Mutex::new(errors),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, SpeechError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.errors.lock().expect("lock").pop() {
            return Err(err);
        }
        Ok(SpeechAudio {
            pcm: request.script.as_bytes().to_vec(),
            sample_rate_hz: 24_000,
            channels: 1,
            bits_per_sample: 16,
        })
    }
}

struct Fixture {
    store: Arc<MemoryProjectStore>,
    synthesizer: Arc<ScriptedSynthesizer>,
    writer: Arc<MemoryAudioWriter>,
    service: AudioService,
}

fn fixture(errors: Vec<SpeechError>) -> Fixture {
    let store = Arc::new(MemoryProjectStore::new());
    let synthesizer = Arc::new(ScriptedSynthesizer::new(errors));
    let writer = Arc::new(MemoryAudioWriter::new());
    let service = AudioService::new(
        store.clone(),
        synthesizer.clone(),
        writer.clone(),
        RetryPolicy::new(3, Duration::from_millis(10), Duration::from_millis(20), 0.0),
    );
    Fixture {
        store,
        synthesizer,
        writer,
        service,
    }
}

fn complete_project() -> (Project, EpisodeId) {
    let mut project = Project::new("Tides", 1);
    project.status = ProjectStatus::Complete;
    let mut episode = Episode::new(1, EpisodeStatus::Complete);
    episode.lines.push(DialogueLine {
        speaker: Speaker::HostA,
        text: "Welcome.".to_string(),
    });
    let episode_id = episode.id;
    project.episodes.push(episode);
    (project, episode_id)
}

async fn run(
    fixture: &Fixture,
    project_id: ProjectId,
    episode_id: EpisodeId,
) -> (Result<Project, AudioError>, Vec<Project>) {
    let (updates, mut rx) = broadcast::channel(16);
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let result = fixture
        .service
        .run(project_id, episode_id, cancel_rx, updates)
        .await;
    let mut snapshots = Vec::new();
    while let Ok(snapshot) = rx.try_recv() {
        snapshots.push(snapshot);
    }
    (result, snapshots)
}

#[tokio::test]
async fn test_generates_and_stores_episode_audio() {
    let fixture = fixture(vec![]);
    let (project, episode_id) = complete_project();
    fixture.store.save(&project).await.expect("seed");

    let (result, snapshots) = run(&fixture, project.id, episode_id).await;

    let updated = result.expect("audio ready");
    let audio = updated
        .episode(episode_id)
        .and_then(|e| e.audio.clone())
        .expect("audio record");
    let file_name = format!("{}.wav", episode_id);
    assert_eq!(audio.status, AudioStatus::Ready);
    assert_eq!(audio.file_name.as_deref(), Some(file_name.as_str()));
    assert!(audio.generated_at.is_some());

    let written = fixture
        .writer
        .get(project.id, &file_name)
        .await
        .expect("written");
    assert!(String::from_utf8_lossy(&written.pcm).contains("Host A: Welcome."));

    let statuses: Vec<AudioStatus> = snapshots
        .iter()
        .filter_map(|p| p.episode(episode_id).map(Episode::audio_status))
        .collect();
    assert_eq!(statuses, vec![AudioStatus::Generating, AudioStatus::Ready]);
    assert_eq!(fixture.store.load(project.id).await.expect("stored"), updated);
}

#[tokio::test]
async fn test_incomplete_project_is_rejected_before_synthesis() {
    let fixture = fixture(vec![]);
    let (mut project, episode_id) = complete_project();
    project.status = ProjectStatus::Generating;
    fixture.store.save(&project).await.expect("seed");

    let (result, _) = run(&fixture, project.id, episode_id).await;

    assert_eq!(result, Err(AudioError::ProjectNotReady));
    assert_eq!(fixture.synthesizer.calls.load(Ordering::SeqCst), 0);
    let stored = fixture.store.load(project.id).await.expect("stored");
    assert_eq!(
        stored.episode(episode_id).map(Episode::audio_status),
        Some(AudioStatus::Failed)
    );
}

#[tokio::test]
async fn test_episode_without_lines_is_not_ready() {
    let fixture = fixture(vec![]);
    let (mut project, episode_id) = complete_project();
    project.episodes[0].lines.clear();
    fixture.store.save(&project).await.expect("seed");

    let (result, _) = run(&fixture, project.id, episode_id).await;

    assert_eq!(result, Err(AudioError::EpisodeNotReady));
    assert_eq!(fixture.synthesizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_project_and_episode() {
    let fixture = fixture(vec![]);
    let (project, _) = complete_project();

    let (result, _) = run(&fixture, project.id, EpisodeId::new()).await;
    assert_eq!(result, Err(AudioError::ProjectNotFound));

    fixture.store.save(&project).await.expect("seed");
    let (result, snapshots) = run(&fixture, project.id, EpisodeId::new()).await;
    assert_eq!(result, Err(AudioError::EpisodeNotFound));
    assert!(snapshots.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_transient_speech_errors_are_retried() {
    let fixture = fixture(vec![
        SpeechError::Http {
            status: 500,
            body: None,
        },
        SpeechError::Transport {
            message: "timeout".to_string(),
        },
    ]);
    let (project, episode_id) = complete_project();
    fixture.store.save(&project).await.expect("seed");

    let (result, _) = run(&fixture, project.id, episode_id).await;

    assert!(result.is_ok());
    assert_eq!(fixture.synthesizer.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_fatal_speech_error_marks_audio_failed() {
    let fixture = fixture(vec![SpeechError::MissingAudioPayload]);
    let (project, episode_id) = complete_project();
    fixture.store.save(&project).await.expect("seed");

    let (result, snapshots) = run(&fixture, project.id, episode_id).await;

    assert_eq!(
        result,
        Err(AudioError::Speech(SpeechError::MissingAudioPayload))
    );
    assert_eq!(fixture.synthesizer.calls.load(Ordering::SeqCst), 1);

    let stored = fixture.store.load(project.id).await.expect("stored");
    let audio = stored
        .episode(episode_id)
        .and_then(|e| e.audio.clone())
        .expect("audio record");
    assert_eq!(audio.status, AudioStatus::Failed);
    assert_eq!(
        audio.error_message.as_deref(),
        Some("speech response missing audio payload")
    );
    assert_eq!(
        snapshots.last().and_then(|p| p.episode(episode_id)).map(Episode::audio_status),
        Some(AudioStatus::Failed)
    );
}

/// Holds every call until `parties` calls are in flight.
struct BarrierSynthesizer {
    barrier: tokio::sync::Barrier,
}

#[async_trait]
impl SpeechSynthesizer for BarrierSynthesizer {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, SpeechError> {
        self.barrier.wait().await;
        Ok(SpeechAudio {
            pcm: request.script.as_bytes().to_vec(),
            sample_rate_hz: 24_000,
            channels: 1,
            bits_per_sample: 16,
        })
    }
}

#[tokio::test]
async fn test_concurrent_jobs_keep_each_others_audio_records() {
    let store = Arc::new(MemoryProjectStore::new());
    let service = AudioService::new(
        store.clone(),
        Arc::new(BarrierSynthesizer {
            barrier: tokio::sync::Barrier::new(2),
        }),
        Arc::new(MemoryAudioWriter::new()),
        RetryPolicy::default(),
    );

    let (mut project, first) = complete_project();
    let mut second_episode = Episode::new(2, EpisodeStatus::Complete);
    second_episode.lines.push(DialogueLine {
        speaker: Speaker::HostB,
        text: "And we're back.".to_string(),
    });
    let second = second_episode.id;
    project.episodes.push(second_episode);
    store.save(&project).await.expect("seed");

    let (updates, _rx) = broadcast::channel(16);
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let (first_result, second_result) = tokio::join!(
        service.run(project.id, first, cancel_rx.clone(), updates.clone()),
        service.run(project.id, second, cancel_rx, updates),
    );
    assert!(first_result.is_ok());
    assert!(second_result.is_ok());

    let stored = store.load(project.id).await.expect("stored");
    let statuses = (
        stored.episode(first).map(Episode::audio_status),
        stored.episode(second).map(Episode::audio_status),
    );
    assert_eq!(
        statuses,
        (Some(AudioStatus::Ready), Some(AudioStatus::Ready))
    );
}
