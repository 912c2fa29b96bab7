//! Applies decoded stream events to the project aggregate.

use crate::model::{DialogueLine, Episode, EpisodeStatus, Host, Project, ProjectStatus};
use crate::stream::StreamEvent;
use chrono::Utc;

/// Apply one event to `project`.
///
/// Episodes are upserted by number and kept sorted; `Done` completes the
/// project and any episode still generating.
pub fn apply(event: &StreamEvent, project: &mut Project) {
    project.last_updated_at = Utc::now();

    match event {
        StreamEvent::Project(header) => {
            project.status = ProjectStatus::Generating;
            let has_title = project
                .title
                .as_deref()
                .is_some_and(|title| !title.trim().is_empty());
            if !has_title {
                project.title = Some(header.title.clone());
            }
            project.description = Some(header.description.clone());
            project.hosts = header
                .hosts
                .iter()
                .map(|host| Host {
                    id: host.id,
                    name: host.name.clone(),
                    persona: Some(host.persona.clone()),
                })
                .collect();
        }
        StreamEvent::Episode(header) => {
            let episode = upsert_episode(project, header.episode_number);
            episode.title = Some(header.title.clone());
            episode.summary = Some(header.summary.clone());
            episode.status = EpisodeStatus::Generating;
        }
        StreamEvent::Line(line) => {
            let episode = upsert_episode(project, line.episode_number);
            episode.status = EpisodeStatus::Generating;
            episode.lines.push(DialogueLine {
                speaker: line.speaker,
                text: line.text.clone(),
            });
        }
        StreamEvent::EpisodeEnd(end) => {
            upsert_episode(project, end.episode_number).status = EpisodeStatus::Complete;
        }
        StreamEvent::Done => {
            project.status = ProjectStatus::Complete;
            for episode in &mut project.episodes {
                if episode.status == EpisodeStatus::Generating {
                    episode.status = EpisodeStatus::Complete;
                }
            }
        }
    }
}

fn upsert_episode(project: &mut Project, number: u32) -> &mut Episode {
    let index = match project.episodes.iter().position(|e| e.number == number) {
        Some(index) => index,
        None => {
            let position = project.episodes.partition_point(|e| e.number < number);
            project
                .episodes
                .insert(position, Episode::new(number, EpisodeStatus::Generating));
            position
        }
    };
    &mut project.episodes[index]
}

#[cfg(test)]
#[path = "tests/updater_tests.rs"]
mod tests;
