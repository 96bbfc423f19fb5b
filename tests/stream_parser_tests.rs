use gamegen_studio::api::stream::StreamParser;

fn text_event(text: &str) -> String {
    format!(
        "data: {{\"candidates\":[{{\"content\":{{\"parts\":[{{\"text\":\"{text}\"}}],\"role\":\"model\"}}}}]}}\n\n"
    )
}

#[test]
fn test_single_event_yields_its_text() {
    let mut parser = StreamParser::new();

    let fragments = parser.process(text_event("Hello").as_bytes());
    assert_eq!(fragments, vec!["Hello".to_string()]);
}

#[test]
fn test_event_split_across_chunks() {
    let mut parser = StreamParser::new();

    let event = text_event("streamed reply");
    let (head, tail) = event.split_at(40);

    let fragments = parser.process(head.as_bytes());
    assert!(fragments.is_empty());

    let fragments = parser.process(tail.as_bytes());
    assert_eq!(fragments, vec!["streamed reply".to_string()]);
}

#[test]
fn test_multiple_events_in_one_chunk() {
    let mut parser = StreamParser::new();

    let chunk = format!("{}{}", text_event("first"), text_event(" second"));
    let fragments = parser.process(chunk.as_bytes());
    assert_eq!(fragments, vec!["first".to_string(), " second".to_string()]);
}

#[test]
fn test_malformed_event_is_skipped_and_stream_continues() {
    let mut parser = StreamParser::new();

    let fragments = parser.process(b"data: {not json}\n\n");
    assert!(fragments.is_empty());

    let fragments = parser.process(text_event("still alive").as_bytes());
    assert_eq!(fragments, vec!["still alive".to_string()]);
}

#[test]
fn test_crlf_framed_events_parse_incrementally() {
    let mut parser = StreamParser::new();

    let event =
        "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"crlf\"}],\"role\":\"model\"}}]}\r\n\r\n";
    let fragments = parser.process(event.as_bytes());
    assert_eq!(fragments, vec!["crlf".to_string()]);
}

#[test]
fn test_finish_parses_final_unterminated_event() {
    let mut parser = StreamParser::new();

    let event = text_event("last words");
    let unterminated = event.trim_end();
    let fragments = parser.process(unterminated.as_bytes());
    assert!(fragments.is_empty());

    let fragments = parser.finish();
    assert_eq!(fragments, vec!["last words".to_string()]);
}

#[test]
fn test_textless_chunks_yield_no_fragments() {
    let mut parser = StreamParser::new();

    let fragments =
        parser.process(b"data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n\n");
    assert!(fragments.is_empty());

    let fragments = parser.process(b"data: {\"candidates\":[]}\n\n");
    assert!(fragments.is_empty());
}
