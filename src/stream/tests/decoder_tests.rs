use super::*;
use crate::model::Speaker;
use crate::stream::event::{DialogueLineEvent, EpisodeEnd};

/// One SSE `data:` line wrapping `text` in a response envelope.
fn data_line(text: &str) -> String {
    let envelope = serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] } }]
    });
    format!("data: {}", envelope)
}

fn decode_lines(lines: &[String]) -> (Vec<StreamEvent>, ResponseDecoder) {
    let mut decoder = ResponseDecoder::new(2_000_000, WireLog::default());
    let mut events = Vec::new();
    for line in lines {
        events.extend(decoder.push_line(line).expect("push line"));
    }
    events.extend(decoder.finish().expect("finish"));
    (events, decoder)
}

#[test]
fn test_decodes_project_header() {
    let mut decoder = EventDecoder::default();
    let events = decoder
        .append(
            r#"{"type":"project","topic":"AI safety","episode_count":2,"title":"AI Safety 101",
               "description":"A beginner series.","hosts":[
               {"id":"HOST_A","name":"Ava","persona":"Curious"},
               {"id":"HOST_B","name":"Noah","persona":"Skeptical"}]}"#,
        )
        .expect("append");

    assert_eq!(events.len(), 1);
    match &events[0] {
        StreamEvent::Project(header) => {
            assert_eq!(header.topic, "AI safety");
            assert_eq!(header.episode_count, 2);
            assert_eq!(header.hosts.len(), 2);
            assert_eq!(header.hosts[1].id, Speaker::HostB);
        }
        other => panic!("expected project header, got {:?}", other),
    }
    assert_eq!(decoder.decoded_count(), 1);
}

#[test]
fn test_decodes_each_event_kind() {
    let mut decoder = EventDecoder::default();
    let events = decoder
        .append(concat!(
            "{\"type\":\"episode\",\"episode_number\":1,\"title\":\"Intro\",\"summary\":\"Basics\"}\n",
            "{\"type\":\"line\",\"episode_number\":1,\"speaker\":\"HOST_A\",\"text\":\"Welcome back.\"}\n",
            "{\"type\":\"episode_end\",\"episode_number\":1}\n",
            "{\"type\":\"done\"}\n",
        ))
        .expect("append");

    let kinds: Vec<&str> = events.iter().map(StreamEvent::kind).collect();
    assert_eq!(kinds, vec!["episode", "line", "episode_end", "done"]);
    assert_eq!(
        events[1],
        StreamEvent::Line(DialogueLineEvent {
            episode_number: 1,
            speaker: Speaker::HostA,
            text: "Welcome back.".to_string(),
        })
    );
    assert_eq!(
        events[2],
        StreamEvent::EpisodeEnd(EpisodeEnd { episode_number: 1 })
    );
}

#[test]
fn test_malformed_frames_are_dropped_without_failing() {
    let mut decoder = EventDecoder::default();
    let events = decoder
        .append(concat!(
            "{\"type\":\"mystery\"}",
            "{\"type\":\"line\",\"episode_number\":1}",
            "{\"type\":\"line\",\"episode_number\":1,\"speaker\":\"HOST_C\",\"text\":\"x\"}",
            "{\"type\":\"done\"}",
        ))
        .expect("append");

    assert_eq!(events, vec![StreamEvent::Done]);
    assert_eq!(decoder.decoded_count(), 1);
}

#[test]
fn test_non_object_frames_are_skipped() {
    let mut decoder = EventDecoder::default();
    let events = decoder
        .append("[{\"type\":\"done\"}] {\"type\":\"done\"}")
        .expect("append");
    assert_eq!(events, vec![StreamEvent::Done]);
    assert_eq!(decoder.decoded_count(), 1);
}

#[test]
fn test_event_split_across_sse_events() {
    let lines = vec![
        data_line("{\"type\":\"line\",\"episode_"),
        String::new(),
        data_line("number\":2,\"speaker\":\"HOST_B\",\"te"),
        String::new(),
        data_line("xt\":\"Hello {world}\"}\n{\"type\":\"done\"}"),
        String::new(),
    ];

    let (events, decoder) = decode_lines(&lines);

    assert_eq!(
        events,
        vec![
            StreamEvent::Line(DialogueLineEvent {
                episode_number: 2,
                speaker: Speaker::HostB,
                text: "Hello {world}".to_string(),
            }),
            StreamEvent::Done,
        ]
    );
    assert_eq!(decoder.decoded_count(), 2);
}

#[test]
fn test_done_sentinel_stops_reading() {
    let lines = vec![
        data_line("{\"type\":\"episode_end\",\"episode_number\":1}"),
        String::new(),
        "data: [DONE]".to_string(),
        String::new(),
        data_line("{\"type\":\"done\"}"),
        String::new(),
    ];

    let (events, decoder) = decode_lines(&lines);

    assert!(decoder.is_done());
    assert_eq!(
        events,
        vec![StreamEvent::EpisodeEnd(EpisodeEnd { episode_number: 1 })]
    );
}

#[test]
fn test_finish_recovers_unterminated_final_event() {
    let lines = vec![data_line("{\"type\":\"done\"}")];
    let (events, _) = decode_lines(&lines);
    assert_eq!(events, vec![StreamEvent::Done]);
}

#[test]
fn test_malformed_envelope_is_skipped() {
    let lines = vec![
        "data: {\"candidates\":\"broken\"}".to_string(),
        String::new(),
        "event: ping".to_string(),
        data_line("{\"type\":\"done\"}"),
        String::new(),
    ];
    let (events, _) = decode_lines(&lines);
    assert_eq!(events, vec![StreamEvent::Done]);
}

#[test]
fn test_oversized_partial_value_fails() {
    let mut decoder = ResponseDecoder::new(64, WireLog::default());
    let long_text = format!("{{\"type\":\"line\",\"text\":\"{}", "x".repeat(100));

    assert!(decoder.push_line(&data_line(&long_text)).is_ok());
    let err = decoder.push_line("").expect_err("limit exceeded");
    assert_eq!(err, FramerError::BufferExceededLimit { limit: 64 });
}
