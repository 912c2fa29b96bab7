//! Canned upstream responses shared by generation and supervisor tests.

/// SSE body carrying each model output line in its own envelope, ending with
/// the `[DONE]` sentinel.
pub fn sse_body(model_lines: &[&str]) -> String {
    let mut body = String::new();
    for line in model_lines {
        let envelope = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": format!("{}\n", line) }] } }]
        });
        body.push_str(&format!("data: {}\n\n", envelope));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub const HEADER: &str = r#"{"type":"project","topic":"Tides","episode_count":3,"title":"Tide Talk","description":"Waves","hosts":[{"id":"HOST_A","name":"Ava","persona":"Curious"},{"id":"HOST_B","name":"Noah","persona":"Precise"}]}"#;

/// Header, one line and an end marker for episode `number`.
pub fn episode_lines(number: u32) -> Vec<String> {
    vec![
        format!(
            r#"{{"type":"episode","episode_number":{n},"title":"Part {n}","summary":"Summary {n}"}}"#,
            n = number
        ),
        format!(
            r#"{{"type":"line","episode_number":{},"speaker":"HOST_A","text":"Hello"}}"#,
            number
        ),
        format!(r#"{{"type":"episode_end","episode_number":{}}}"#, number),
    ]
}

/// A full batch response: `extra` lines first, then the episodes, then `done`.
pub fn body_for(episodes: &[u32], extra: &[&str]) -> String {
    let owned: Vec<String> = episodes.iter().flat_map(|n| episode_lines(*n)).collect();
    let mut lines: Vec<&str> = extra.to_vec();
    lines.extend(owned.iter().map(String::as_str));
    lines.push(r#"{"type":"done"}"#);
    sse_body(&lines)
}
