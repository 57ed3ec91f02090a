//! Streaming chat response consumer.
//!
//! Feeds body chunks through the SSE decoder, accumulates the assistant text
//! and reports every increment, already rendered, to a [`StreamSink`].

use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace, warn};

use crate::error::{PlaygroundError, Result};
use crate::markdown::render_markdown;
use crate::sse::{LineBuffer, SseLine, StreamPayload, Utf8StreamDecoder};

/// Receives the consumer's output as it happens.
pub trait StreamSink {
    /// The server accepted the request and the body is about to be read.
    fn on_open(&mut self) {}

    /// Called after every append with the whole buffer and its rendering.
    fn on_text(&mut self, full_text: &str, html: &str);

    /// A response id arrived; it supersedes any earlier one.
    fn on_response_id(&mut self, _id: &str) {}

    /// An `event:` line named the following records.
    fn on_event(&mut self, _name: &str) {}
}

/// Summary of a finished stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    pub text: String,
    /// Last response id seen, if any.
    pub response_id: Option<String>,
    pub data_lines: usize,
    /// `data:` lines that carried nothing renderable.
    pub ignored_lines: usize,
}

#[derive(Debug, Default)]
pub struct StreamConsumer {
    utf8: Utf8StreamDecoder,
    lines: LineBuffer,
    outcome: StreamOutcome,
    raw_text_fallback: bool,
    /// Data lines of the event being assembled, joined with `\n`.
    /// Only used in raw-text fallback mode.
    event_data: Option<String>,
}

impl StreamConsumer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat payloads that are not JSON objects as text to append instead
    /// of skipping them.
    ///
    /// In this mode the `data:` lines of one event are joined with `\n` and
    /// classified together when the event ends, so a token that spans
    /// several lines keeps its line breaks.
    pub fn with_raw_text_fallback(mut self, enabled: bool) -> Self {
        self.raw_text_fallback = enabled;
        self
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.outcome.text
    }

    /// Process one body chunk. Never fails: bad lines are skipped.
    pub fn feed<S: StreamSink + ?Sized>(&mut self, chunk: &[u8], sink: &mut S) {
        let text = self.utf8.decode(chunk);
        for line in self.lines.push(&text) {
            self.handle_line(&line, sink);
        }
    }

    /// End of body: flush the decoder and any unterminated last line.
    pub fn finish<S: StreamSink + ?Sized>(mut self, sink: &mut S) -> StreamOutcome {
        let tail = self.utf8.finish();
        for line in self.lines.push(&tail) {
            self.handle_line(&line, sink);
        }
        if let Some(line) = self.lines.finish() {
            self.handle_line(&line, sink);
        }
        self.flush_event(sink);
        self.outcome
    }

    fn handle_line<S: StreamSink + ?Sized>(&mut self, line: &str, sink: &mut S) {
        trace!(line, "sse line");
        match SseLine::parse(line) {
            SseLine::Event(name) => {
                debug!(event = name, "stream event");
                sink.on_event(name);
            }
            SseLine::Data(raw) => {
                self.outcome.data_lines += 1;
                if !self.raw_text_fallback {
                    self.dispatch(StreamPayload::classify(raw), sink);
                    return;
                }
                match &mut self.event_data {
                    Some(data) => {
                        data.push('\n');
                        data.push_str(raw);
                    }
                    None => self.event_data = Some(raw.to_string()),
                }
            }
            SseLine::Blank => self.flush_event(sink),
            SseLine::Other => {}
        }
    }

    fn flush_event<S: StreamSink + ?Sized>(&mut self, sink: &mut S) {
        if let Some(data) = self.event_data.take() {
            self.dispatch(StreamPayload::classify_plain(&data), sink);
        }
    }

    fn dispatch<S: StreamSink + ?Sized>(&mut self, payload: StreamPayload, sink: &mut S) {
        match payload {
            StreamPayload::Delta(text) | StreamPayload::LegacyData(text) => {
                self.append(&text, sink);
            }
            StreamPayload::ResponseId(id) => {
                sink.on_response_id(&id);
                self.outcome.response_id = Some(id);
            }
            StreamPayload::Raw(text) if self.raw_text_fallback => {
                if text.is_empty() {
                    self.outcome.ignored_lines += 1;
                } else {
                    self.append(&text, sink);
                }
            }
            StreamPayload::Raw(text) => {
                warn!(payload = %text, "non-JSON data line skipped");
                self.outcome.ignored_lines += 1;
            }
            StreamPayload::Unrecognized(_) => {
                self.outcome.ignored_lines += 1;
            }
        }
    }

    fn append<S: StreamSink + ?Sized>(&mut self, text: &str, sink: &mut S) {
        self.outcome.text.push_str(text);
        let html = render_markdown(&self.outcome.text);
        sink.on_text(&self.outcome.text, &html);
    }

    /// Drive the consumer over a whole body stream.
    ///
    /// Returns when the stream ends; a read error aborts with that error.
    pub async fn consume<St, B, E, S>(mut self, body: St, sink: &mut S) -> Result<StreamOutcome>
    where
        St: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<PlaygroundError>,
        S: StreamSink + ?Sized,
    {
        tokio::pin!(body);
        sink.on_open();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(Into::into)?;
            self.feed(chunk.as_ref(), sink);
        }
        Ok(self.finish(sink))
    }
}
