use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use echoforge::config::EchoForgeConfig;
use echoforge::generation::{BatchedEventSource, GenerationService};
use echoforge::model::{GenerationRequest, Project, ProjectStatus};
use echoforge::storage::MemoryProjectStore;
use echoforge::stream::{ResponseDecoder, StreamEvent};
use echoforge::supervisor::GenerationSupervisor;
use echoforge::transport::CaptureTransport;
use echoforge::{paths, GIT_SHA};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ECHOFORGE_LOG";

#[derive(Parser)]
#[command(name = "echoforge")]
#[command(about = "Streaming podcast generation from captured model responses")]
#[command(version)]
struct Cli {
    /// YAML config (defaults to ~/.echoforge/config.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the events of a captured SSE response as NDJSON
    Decode { file: PathBuf },
    /// Run a full generation session against captured batch responses
    Replay {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "3")]
        episodes: u32,
        /// Directory holding batch-1.sse, batch-2.sse, ...
        #[arg(long)]
        captures: Option<PathBuf>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "Host A")]
        host_a: String,
        #[arg(long, default_value = "Host B")]
        host_b: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(git_sha = GIT_SHA, "echoforge starting");

    match cli.command {
        Command::Decode { file } => decode(&config, &file),
        Command::Replay {
            topic,
            episodes,
            captures,
            title,
            host_a,
            host_b,
        } => {
            let captures = match captures {
                Some(dir) => dir,
                None => paths::captures_dir()?,
            };
            let mut request = GenerationRequest::new(topic, episodes).with_hosts(host_a, host_b);
            if let Some(title) = title {
                request = request.with_title(title);
            }
            replay(&config, request, captures).await
        }
    }
}

fn load_config(explicit: Option<&Path>) -> Result<EchoForgeConfig> {
    if let Some(path) = explicit {
        return EchoForgeConfig::load(path);
    }
    let user_config = paths::config_path()?;
    if user_config.exists() {
        tracing::debug!(path = %user_config.display(), "loading user config");
        EchoForgeConfig::load(&user_config)
    } else {
        EchoForgeConfig::default_config()
    }
}

fn decode(config: &EchoForgeConfig, file: &Path) -> Result<()> {
    let body = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read capture: {}", file.display()))?;
    let settings = config.generation_settings();
    let mut decoder = ResponseDecoder::new(settings.max_frame_buffer_bytes, settings.wire_log);

    let mut events: Vec<StreamEvent> = Vec::new();
    for line in body.lines() {
        events.extend(decoder.push_line(line)?);
        if decoder.is_done() {
            break;
        }
    }
    events.extend(decoder.finish()?);

    for event in &events {
        println!("{}", serde_json::to_string(event)?);
    }
    tracing::info!(events = events.len(), "decoded {}", file.display());
    Ok(())
}

async fn replay(
    config: &EchoForgeConfig,
    request: GenerationRequest,
    captures: PathBuf,
) -> Result<()> {
    let store = Arc::new(MemoryProjectStore::new());
    let transport = Arc::new(CaptureTransport::from_dir(captures));
    let source = BatchedEventSource::new(
        transport,
        config.generation_settings(),
        config.retry_policy(),
    );
    let service = Arc::new(GenerationService::new(
        store,
        source,
        config.autosave_delay(),
    ));
    let supervisor = GenerationSupervisor::spawn(service).await?;
    let mut updates = supervisor.subscribe();

    let project = Project::for_request(&request);
    let project_id = project.id;
    supervisor.start(project, request).await?;

    tracing::info!(model = %config.model.name, %project_id, "replaying captured session");

    let followed = tokio::select! {
        result = supervisor.follow(project_id, &mut updates, |snapshot| {
            println!("{}", summary(snapshot))
        }) => result?,
        _ = tokio::signal::ctrl_c() => {
            supervisor.cancel(project_id).await?;
            supervisor.shutdown();
            anyhow::bail!("replay cancelled");
        }
    };

    supervisor.shutdown();
    let last = match followed {
        Some(last) if last.status.is_terminal() => last,
        Some(last) => anyhow::bail!("generation stopped while {:?}", last.status),
        None => anyhow::bail!("generation ended without a result"),
    };

    match last.status {
        ProjectStatus::Failed => anyhow::bail!(
            "generation failed: {}",
            last.error_message.as_deref().unwrap_or("unknown error")
        ),
        _ => {
            for episode in &last.episodes {
                println!(
                    "\n# Episode {}: {}",
                    episode.number,
                    episode.title.as_deref().unwrap_or("Untitled")
                );
                println!("{}", episode.transcript_text());
            }
            Ok(())
        }
    }
}

fn summary(project: &Project) -> String {
    let lines: usize = project.episodes.iter().map(|e| e.lines.len()).sum();
    format!(
        "[{:?}] {} | episodes {}/{} | lines {}",
        project.status,
        project.title.as_deref().unwrap_or(&project.topic),
        project.episodes.len(),
        project.episode_count_requested,
        lines
    )
}
