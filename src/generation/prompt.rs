//! NDJSON instruction prompt for one generation batch.

use super::batch::ascii_sanitize;
use std::fmt::Write as _;
use std::ops::RangeInclusive;

#[derive(Debug, Clone)]
pub struct PromptEpisodes {
    pub total: u32,
    pub range: RangeInclusive<u32>,
}

#[derive(Debug, Clone)]
pub struct PromptHosts {
    pub host_a_name: String,
    pub host_b_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    pub include_project_header: bool,
    pub include_done_marker: bool,
    pub prior_recap: Option<String>,
    pub project_title: Option<String>,
}

pub struct PromptTemplate;

impl PromptTemplate {
    pub fn ndjson_prompt(
        topic: &str,
        episodes: &PromptEpisodes,
        hosts: &PromptHosts,
        options: &PromptOptions,
    ) -> String {
        let first = *episodes.range.start();
        let last = *episodes.range.end();

        let mut prompt = String::from(
            "You are generating a multi-episode, two-host dialogue podcast script.\n\
             \n\
             CRITICAL OUTPUT RULES:\n\
             - Output MUST be NDJSON: exactly one JSON object per line.\n\
             - Do NOT wrap the output in Markdown code fences.\n\
             - Do NOT emit any non-JSON text.\n\
             - Do NOT include literal newline characters inside string values.\n\
             - Use only ASCII characters.\n\
             \n\
             SCHEMA (each line is ONE of these objects):\n",
        );

        if options.include_project_header {
            prompt.push_str(
                "- Project header (exactly once, first):\n  \
                 {\"type\":\"project\",\"topic\":string,\"episode_count\":int,\"title\":string,\"description\":string,\n   \
                 \"hosts\":[{\"id\":\"HOST_A\",\"name\":string,\"persona\":string},{\"id\":\"HOST_B\",\"name\":string,\"persona\":string}]}\n",
            );
        }
        prompt.push_str(
            "- Episode header (once per episode, before any lines for that episode):\n  \
             {\"type\":\"episode\",\"episode_number\":int,\"title\":string,\"summary\":string}\n\
             - Dialogue line (many per episode):\n  \
             {\"type\":\"line\",\"episode_number\":int,\"speaker\":\"HOST_A\"|\"HOST_B\",\"text\":string}\n\
             - Episode end marker (exactly once per episode):\n  \
             {\"type\":\"episode_end\",\"episode_number\":int}\n",
        );
        if options.include_done_marker {
            prompt.push_str("- Done marker (exactly once at the end):\n  {\"type\":\"done\"}\n");
        }

        // Writing into a String cannot fail.
        let _ = write!(
            prompt,
            "\nCONTENT REQUIREMENTS:\n\
             - Topic: {}\n\
             - Total episodes in the series: {}\n\
             - Episodes to write now: {} to {}\n\
             - Host A name: {}\n\
             - Host B name: {}\n",
            ascii_sanitize(topic),
            episodes.total,
            first,
            last,
            ascii_sanitize(&hosts.host_a_name),
            ascii_sanitize(&hosts.host_b_name),
        );
        if let Some(title) = options
            .project_title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
        {
            let _ = writeln!(prompt, "- Podcast title (use exactly): {}", ascii_sanitize(title));
        }
        prompt.push_str(
            "- Make each episode meaningfully different: new angle, new examples, and a brief recap tying back to prior episodes.\n\
             - Two-person conversation: alternate speakers frequently (no long monologues).\n\
             - Keep language natural and podcast-like.\n",
        );

        if let Some(recap) = options
            .prior_recap
            .as_deref()
            .filter(|recap| !recap.trim().is_empty())
        {
            let _ = write!(
                prompt,
                "\nPrior episodes (already written, continue from here):\n{}\n",
                ascii_sanitize(recap)
            );
        }

        prompt.push_str("\nFORMAT REQUIREMENTS:\n");
        if options.include_project_header {
            prompt.push_str("- Produce the project header FIRST.\n");
        } else {
            prompt.push_str("- Do NOT emit a project header.\n");
        }
        let _ = write!(
            prompt,
            "- Then for episode_number {}..{} in order:\n  \
             - emit the episode header\n  \
             - emit 24 to 48 dialogue lines\n  \
             - emit episode_end\n",
            first, last
        );
        if options.include_done_marker {
            prompt.push_str("- Finally emit done.\n");
        } else {
            prompt.push_str("- Do NOT emit a done marker.\n");
        }

        prompt.push_str("\nNow start streaming NDJSON. Remember: ONE JSON OBJECT PER LINE.\n");
        prompt
    }
}
