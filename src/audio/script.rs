//! Speech script for one episode.

use crate::model::{Episode, Project, Speaker};
use crate::transport::{SpeakerVoice, SpeechRequest};

pub const HOST_A_VOICE: &str = "Kore";
pub const HOST_B_VOICE: &str = "Puck";

/// Display name for `speaker`, falling back to `Host A` / `Host B`.
pub fn host_display_name(project: &Project, speaker: Speaker) -> String {
    match project.host_name(speaker) {
        Some(name) => name.to_string(),
        None => match speaker {
            Speaker::HostA => "Host A".to_string(),
            Speaker::HostB => "Host B".to_string(),
        },
    }
}

pub fn speech_request(project: &Project, episode: &Episode) -> SpeechRequest {
    let host_a = host_display_name(project, Speaker::HostA);
    let host_b = host_display_name(project, Speaker::HostB);
    let script = script_text(&host_a, &host_b, episode);

    SpeechRequest {
        script,
        speakers: vec![
            SpeakerVoice {
                name: host_a,
                voice: HOST_A_VOICE.to_string(),
            },
            SpeakerVoice {
                name: host_b,
                voice: HOST_B_VOICE.to_string(),
            },
        ],
    }
}

fn script_text(host_a: &str, host_b: &str, episode: &Episode) -> String {
    let host_a_line = format!("- {}", host_a);
    let host_b_line = format!("- {}", host_b);
    let prelude = [
        "You are generating audio for a two-host podcast episode.",
        "Do not speak speaker labels out loud; they are only cues for which voice to use.",
        "Read naturally with conversational pacing.",
        "",
        "Speakers:",
        host_a_line.as_str(),
        host_b_line.as_str(),
        "",
        "Script:",
    ]
    .join("\n");

    let body = episode
        .lines
        .iter()
        .map(|line| {
            let name = match line.speaker {
                Speaker::HostA => host_a,
                Speaker::HostB => host_b,
            };
            format!("{}: {}", name, line.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n{}", prelude, body)
}
