//! Stream consumer properties: the result must not depend on how the body
//! was split into chunks.

use llm_playground::markdown::render_markdown;
use llm_playground::sse::Utf8StreamDecoder;
use llm_playground::{PlaygroundError, StreamConsumer, StreamOutcome, StreamSink};
use proptest::prelude::*;
use serde_json::json;

#[derive(Default)]
struct LastFrame {
    text: String,
    html: String,
    calls: usize,
}

impl StreamSink for LastFrame {
    fn on_text(&mut self, full_text: &str, html: &str) {
        self.text = full_text.to_string();
        self.html = html.to_string();
        self.calls += 1;
    }
}

fn body_for(deltas: &[String]) -> Vec<u8> {
    deltas
        .iter()
        .map(|d| format!("data: {}\n\n", json!({ "delta": d })))
        .collect::<String>()
        .into_bytes()
}

/// Split `bytes` at the given cut points, which may land inside a
/// multi-byte character.
fn split_at_points(bytes: &[u8], mut cuts: Vec<usize>) -> Vec<Vec<u8>> {
    cuts.retain(|&c| c > 0 && c < bytes.len());
    cuts.sort_unstable();
    cuts.dedup();
    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts {
        chunks.push(bytes[start..cut].to_vec());
        start = cut;
    }
    chunks.push(bytes[start..].to_vec());
    chunks
}

fn run_chunks(chunks: Vec<Vec<u8>>) -> (StreamOutcome, LastFrame) {
    let items: Vec<Result<Vec<u8>, PlaygroundError>> = chunks.into_iter().map(Ok).collect();
    let mut sink = LastFrame::default();
    let outcome = tokio_test::block_on(
        StreamConsumer::new().consume(tokio_stream::iter(items), &mut sink),
    )
    .expect("consume");
    (outcome, sink)
}

proptest! {
    #[test]
    fn prop_text_is_concatenation_of_deltas(
        deltas in prop::collection::vec("[a-zA-Z0-9 *_éß€😊\n]{0,12}", 1..8),
        cuts in prop::collection::vec(0usize..400, 0..12),
    ) {
        let body = body_for(&deltas);
        let (outcome, sink) = run_chunks(split_at_points(&body, cuts));
        let expected: String = deltas.concat();
        prop_assert_eq!(&outcome.text, &expected);
        prop_assert_eq!(outcome.data_lines, deltas.len());
        if sink.calls > 0 {
            prop_assert_eq!(&sink.text, &expected);
            prop_assert_eq!(&sink.html, &render_markdown(&expected));
        }
    }

    #[test]
    fn prop_decoder_matches_lossy_whole_decode(
        text in "\\PC{0,40}",
        cuts in prop::collection::vec(0usize..200, 0..10),
    ) {
        let bytes = text.as_bytes();
        let mut decoder = Utf8StreamDecoder::new();
        let mut out = String::new();
        for chunk in split_at_points(bytes, cuts) {
            out.push_str(&decoder.decode(&chunk));
        }
        out.push_str(&decoder.finish());
        prop_assert_eq!(out, text);
    }
}

#[test]
fn test_byte_at_a_time_delivery() {
    let deltas = vec!["Hé".to_string(), "llo 😊".to_string(), " **done**".to_string()];
    let body = body_for(&deltas);
    let chunks: Vec<Vec<u8>> = body.iter().map(|b| vec![*b]).collect();
    let (outcome, sink) = run_chunks(chunks);
    assert_eq!(outcome.text, "Héllo 😊 **done**");
    assert_eq!(sink.calls, 3);
    assert!(sink.html.contains("<strong>done</strong>"));
}

#[test]
fn test_mixed_records_in_one_chunk() {
    let body = b"event: response.created\n\
        data: {\"id\":\"resp_1\"}\n\n\
        data: {\"delta\":\"a\"}\n\
        data: not json\n\
        data: {\"unexpected\":1}\n\
        data: {\"data\":\"b\"}\n\
        data: [DONE]\n"
        .to_vec();
    let (outcome, _) = run_chunks(vec![body]);
    assert_eq!(outcome.text, "ab");
    assert_eq!(outcome.response_id.as_deref(), Some("resp_1"));
    assert_eq!(outcome.data_lines, 6);
    assert_eq!(outcome.ignored_lines, 3);
}

#[test]
fn test_crlf_line_endings() {
    let body = b"data: {\"delta\":\"x\"}\r\n\r\ndata: {\"delta\":\"y\"}\r\n".to_vec();
    let (outcome, _) = run_chunks(vec![body]);
    assert_eq!(outcome.text, "xy");
}

#[test]
fn test_invalid_utf8_does_not_abort() {
    let mut body = b"data: {\"delta\":\"a\"}\n".to_vec();
    body.extend_from_slice(&[0xFF, 0xFE, b'\n']);
    body.extend_from_slice(b"data: {\"delta\":\"b\"}\n");
    let (outcome, _) = run_chunks(vec![body]);
    assert_eq!(outcome.text, "ab");
}

#[test]
fn test_empty_body() {
    let (outcome, sink) = run_chunks(Vec::new());
    assert!(outcome.text.is_empty());
    assert_eq!(sink.calls, 0);
}
