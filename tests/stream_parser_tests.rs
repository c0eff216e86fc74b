use chatstream::api::stream::{LineFramer, StreamParser};
use chatstream::api::{decode_event_line, LineDecodeError};
use chatstream::types::StreamEvent;
use pretty_assertions::assert_eq;
use serde_json::json;

const BODY: &str = concat!(
    "{\"type\":\"tool_start\",\"tool\":\"search\",\"args\":{\"q\":\"weather\"}}\n",
    "{\"type\":\"tool_end\"}\n",
    "{\"type\":\"content\",\"data\":\"Sunny, \"}\n",
    "{\"type\":\"content\",\"data\":\"22°C ☀\"}\n",
);

fn parse_in_chunks(body: &[u8], chunk_size: usize) -> Vec<StreamEvent> {
    let mut parser = StreamParser::new();
    body.chunks(chunk_size)
        .flat_map(|chunk| parser.process(chunk))
        .collect()
}

#[test]
fn test_events_do_not_depend_on_chunk_boundaries() {
    let expected = vec![
        StreamEvent::ToolStart {
            tool: "search".to_string(),
            args: json!({"q": "weather"}),
        },
        StreamEvent::ToolEnd,
        StreamEvent::Content {
            data: "Sunny, ".to_string(),
        },
        StreamEvent::Content {
            data: "22°C ☀".to_string(),
        },
    ];

    for chunk_size in [1, 2, 3, 7, 16, BODY.len()] {
        assert_eq!(
            parse_in_chunks(BODY.as_bytes(), chunk_size),
            expected,
            "chunk size {chunk_size}"
        );
    }
}

#[test]
fn test_multibyte_character_split_across_chunks() {
    let line = "{\"type\":\"content\",\"data\":\"☀\"}\n".as_bytes();
    let split = line.iter().position(|b| *b == 0xE2).expect("sun glyph") + 1;

    let mut parser = StreamParser::new();
    assert!(parser.process(&line[..split]).is_empty());
    assert_eq!(
        parser.process(&line[split..]),
        vec![StreamEvent::Content {
            data: "☀".to_string()
        }]
    );
}

#[test]
fn test_unterminated_tail_is_never_delivered() {
    let mut parser = StreamParser::new();
    let events = parser.process(b"{\"type\":\"content\",\"data\":\"a\"}\n{\"type\":\"content\",\"data\":\"b\"}");

    assert_eq!(events.len(), 1);
    assert_eq!(
        parser.finish().as_deref(),
        Some("{\"type\":\"content\",\"data\":\"b\"}")
    );
}

#[test]
fn test_corrupt_line_is_skipped_and_counted() {
    let mut parser = StreamParser::new();
    let events = parser.process(b"not json\n{\"type\":\"content\",\"data\":\"ok\"}\n");

    assert_eq!(
        events,
        vec![StreamEvent::Content {
            data: "ok".to_string()
        }]
    );
    assert_eq!(parser.malformed_lines(), 1);
}

#[test]
fn test_unknown_and_untyped_records_are_ignored() {
    let mut parser = StreamParser::new();
    let events = parser.process(b"{\"type\":\"heartbeat\"}\n{\"data\":\"x\"}\n\n");

    assert!(events.is_empty());
    assert_eq!(parser.malformed_lines(), 0);
}

#[test]
fn test_decode_error_keeps_offending_line() {
    let error = decode_event_line("{\"type\":\"content\"}").expect_err("missing data");
    assert!(matches!(error, LineDecodeError::Shape { .. }));
    assert_eq!(error.line(), "{\"type\":\"content\"}");

    let error = decode_event_line("  {oops  ").expect_err("not json");
    assert!(matches!(error, LineDecodeError::Syntax { .. }));
    assert_eq!(error.line(), "{oops");
}

#[test]
fn test_framer_returns_every_completed_line() {
    let mut framer = LineFramer::new();
    assert_eq!(framer.push(b"a\nb\nc"), vec!["a", "b"]);
    assert_eq!(framer.push(b"\n"), vec!["c"]);
    assert_eq!(framer.finish(), None);
}
