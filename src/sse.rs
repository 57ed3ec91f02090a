//! Incremental decoding of a server-sent-event body.
//!
//! Three layers, each stateful across chunks:
//!
//! 1. [`Utf8StreamDecoder`] turns raw byte chunks into text without
//!    corrupting characters split across chunk boundaries.
//! 2. [`LineBuffer`] splits that text into complete lines, carrying partial
//!    lines to the next chunk.
//! 3. [`SseLine::parse`] and [`StreamPayload::classify`] turn one line into a
//!    typed event. [`StreamPayload::classify_plain`] does the same for the
//!    joined data of a whole event from a plain-text backend.

use serde_json::Value;

const REPLACEMENT: char = '\u{FFFD}';

// ---------------------------------------------------------------------------
// UTF-8
// ---------------------------------------------------------------------------

/// Holds back the tail of a chunk that ends inside a multi-byte sequence.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode as much of `pending + chunk` as forms complete characters.
    ///
    /// Invalid sequences become U+FFFD. An incomplete sequence at the end is
    /// kept for the next call.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        self.pending.extend_from_slice(chunk);
        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;

        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                    break;
                }
                Err(err) => {
                    let valid_up_to = start + err.valid_up_to();
                    if let Ok(valid) = std::str::from_utf8(&self.pending[start..valid_up_to]) {
                        out.push_str(valid);
                    }
                    match err.error_len() {
                        Some(bad) => {
                            out.push(REPLACEMENT);
                            start = valid_up_to + bad;
                        }
                        None => {
                            // Truncated sequence at the end: wait for more bytes.
                            start = valid_up_to;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }

    /// End of stream: a dangling partial sequence decodes to U+FFFD.
    pub fn finish(&mut self) -> String {
        if self.is_empty() {
            return String::new();
        }
        self.pending.clear();
        REPLACEMENT.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Lines
// ---------------------------------------------------------------------------

/// Splits decoded text on `\n`; records and chunks need not align.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buffer: String,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text and return every line it completed, without terminators.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);
        let mut lines = Vec::new();
        while let Some(line_end) = self.buffer.find('\n') {
            let mut line: String = self.buffer.drain(..=line_end).collect();
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }

    /// The unterminated remainder, if any.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let mut line = std::mem::take(&mut self.buffer);
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum SseLine<'a> {
    /// `event: <name>`
    Event(&'a str),
    /// `data: <payload>`
    Data(&'a str),
    /// Empty line; ends the current event.
    Blank,
    /// Comments and fields we do not use.
    Other,
}

impl<'a> SseLine<'a> {
    pub fn parse(line: &'a str) -> Self {
        if line.is_empty() {
            SseLine::Blank
        } else if let Some(rest) = field_value(line, "event:") {
            SseLine::Event(rest.trim())
        } else if let Some(rest) = field_value(line, "data:") {
            SseLine::Data(rest)
        } else {
            SseLine::Other
        }
    }
}

/// Value after `name`, with the single optional leading space removed.
fn field_value<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(name)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// What one `data:` payload means to the chat view.
///
/// Checked in priority order: `delta`, then `id`, then `data`.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamPayload {
    /// Response-style incremental text.
    Delta(String),
    /// Response lifecycle event naming the response; becomes the continuation token.
    ResponseId(String),
    /// Legacy incremental text.
    LegacyData(String),
    /// Valid JSON with none of the recognized fields.
    Unrecognized(Value),
    /// Not JSON at all; the raw payload text.
    Raw(String),
}

impl StreamPayload {
    pub fn classify(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => Self::from_value(value),
            Err(_) => StreamPayload::Raw(raw.to_string()),
        }
    }

    /// Classify the joined data of one event from a plain-text backend.
    ///
    /// Only a JSON object can carry `delta`/`id`/`data`. Anything else,
    /// including scalars such as `3` or `true`, is the token text itself.
    pub fn classify_plain(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) if value.is_object() => Self::from_value(value),
            _ => StreamPayload::Raw(raw.to_string()),
        }
    }

    fn from_value(value: Value) -> Self {
        if let Some(obj) = value.as_object() {
            let text_field = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            };
            if let Some(delta) = text_field("delta") {
                return StreamPayload::Delta(delta);
            }
            if let Some(id) = text_field("id") {
                return StreamPayload::ResponseId(id);
            }
            if let Some(data) = text_field("data") {
                return StreamPayload::LegacyData(data);
            }
        }
        StreamPayload::Unrecognized(value)
    }

    /// Text to append to the visible message, if this payload carries any.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamPayload::Delta(s) | StreamPayload::LegacyData(s) => Some(s),
            _ => None,
        }
    }
}
