//! Conversation state and request construction.
//!
//! The continuation token lives in a [`Conversation`] that callers own and
//! pass into each send, rather than in process-wide state.

use tracing::info;

use crate::api::{ChatRequest, LegacyMessage, Role};

pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Per-send knobs the user controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f64,
    pub system_prompt: Option<String>,
    pub reasoning_effort: Option<String>,
    pub max_tokens: Option<u32>,
    /// Request a streamed response; `false` selects the single-JSON path.
    pub stream: bool,
    /// Append non-JSON `data:` payloads as text.
    pub raw_text_fallback: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        ChatSettings {
            model: String::new(),
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
            reasoning_effort: None,
            max_tokens: None,
            stream: true,
            raw_text_fallback: false,
        }
    }
}

impl ChatSettings {
    /// System prompt then the user turn; an empty system prompt is left out.
    pub fn legacy_messages(&self, prompt: &str) -> Vec<LegacyMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = non_empty(self.system_prompt.as_deref()) {
            messages.push(LegacyMessage { role: Role::System, content: system.to_string() });
        }
        messages.push(LegacyMessage { role: Role::User, content: prompt.to_string() });
        messages
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

/// One multi-turn exchange with the backend.
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    continuation_token: Option<String>,
    exchanges: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the last response, forwarded as `previous_response_id`.
    pub fn continuation_token(&self) -> Option<&str> {
        self.continuation_token.as_deref()
    }

    /// Overwrites any previous token.
    pub fn record_response_id(&mut self, id: &str) {
        info!(response_id = id, "continuation token updated");
        self.continuation_token = Some(id.to_string());
    }

    /// Number of exchanges that reached the server and completed.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    pub fn mark_exchange_complete(&mut self) {
        self.exchanges += 1;
    }

    /// Body for a streamed `/chat` call, carrying the token if one is held.
    pub fn streaming_request(&self, settings: &ChatSettings, prompt: &str) -> ChatRequest {
        ChatRequest {
            model: settings.model.clone(),
            temperature: settings.temperature,
            stream: true,
            input: Some(prompt.to_string()),
            previous_response_id: self.continuation_token.clone(),
            reasoning_effort: non_empty(settings.reasoning_effort.as_deref()).map(str::to_string),
            messages: settings.legacy_messages(prompt),
            max_tokens: settings.max_tokens,
        }
    }
}

/// Body for the non-streaming path, which never carries a token.
pub fn blocking_request(settings: &ChatSettings, prompt: &str) -> ChatRequest {
    ChatRequest {
        model: settings.model.clone(),
        temperature: settings.temperature,
        stream: false,
        input: None,
        previous_response_id: None,
        reasoning_effort: None,
        messages: settings.legacy_messages(prompt),
        max_tokens: settings.max_tokens,
    }
}
