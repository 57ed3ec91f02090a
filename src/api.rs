//! Wire types for the playground backend API.
//!
//! Request bodies serialize exactly the fields the backend reads; response
//! types default every field the backend may leave out.

use serde::{Deserialize, Serialize};

// -- Chat request types -----------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of the legacy `messages` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyMessage {
    pub role: Role,
    pub content: String,
}

/// Body of `POST /chat`.
///
/// Carries both the response-style fields (`input`, `previous_response_id`,
/// `reasoning_effort`) and the legacy `messages` list so either server API
/// shape can answer it.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f64,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    pub messages: Vec<LegacyMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

// -- Non-streaming completion -----------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

impl ChatCompletion {
    /// Content of the first choice, if the server produced one.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().and_then(|c| c.message.content.as_deref())
    }
}

// -- Health and models ------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

impl HealthReport {
    pub fn is_online(&self) -> bool {
        self.status == "online"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

// -- A/B test ---------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AbTestRequest {
    pub prompt: String,
    pub models: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbTestResult {
    pub model: String,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl AbTestResult {
    /// Text shown on the result card: the response when non-empty, else the error.
    pub fn display_text(&self) -> &str {
        match self.response.as_deref() {
            Some(r) if !r.is_empty() => r,
            _ => self.error.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AbTestResponse {
    #[serde(default)]
    pub results: Vec<AbTestResult>,
}

// -- Tools and templates ----------------------------------------------------

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

/// A stored prompt. Fields the client does not know about are kept so a
/// save round-trip does not drop them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteAck {
    #[serde(default)]
    pub success: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ChatRequest {
        ChatRequest {
            model: "m1".to_string(),
            temperature: 0.7,
            stream: true,
            input: Some("hello".to_string()),
            previous_response_id: None,
            reasoning_effort: None,
            messages: vec![LegacyMessage { role: Role::User, content: "hello".to_string() }],
            max_tokens: None,
        }
    }

    #[test]
    fn test_role_display() {
        assert_eq!(Role::User.to_string(), "user");
        assert_eq!(Role::Assistant.to_string(), "assistant");
        assert_eq!(Role::System.to_string(), "system");
    }

    #[test]
    fn test_chat_request_omits_absent_optionals() {
        let json: serde_json::Value = serde_json::to_value(sample_request()).expect("serialize");
        assert_eq!(json["model"], "m1");
        assert_eq!(json["temperature"], 0.7);
        assert_eq!(json["stream"], true);
        assert_eq!(json["input"], "hello");
        assert!(json.get("previous_response_id").is_none());
        assert!(json.get("reasoning_effort").is_none());
        assert!(json.get("max_tokens").is_none());
        assert_eq!(json["messages"][0]["role"], "user");
    }

    #[test]
    fn test_chat_request_includes_continuation() {
        let mut req = sample_request();
        req.previous_response_id = Some("resp_1".to_string());
        req.reasoning_effort = Some("high".to_string());
        let json: serde_json::Value = serde_json::to_value(req).expect("serialize");
        assert_eq!(json["previous_response_id"], "resp_1");
        assert_eq!(json["reasoning_effort"], "high");
    }

    #[test]
    fn test_completion_first_content() {
        let json = r#"{"id":"c1","choices":[{"index":0,"message":{"role":"assistant","content":"Hi"},"finish_reason":"stop"}]}"#;
        let c: ChatCompletion = serde_json::from_str(json).expect("deser");
        assert_eq!(c.first_content(), Some("Hi"));
    }

    #[test]
    fn test_completion_no_choices() {
        let c: ChatCompletion = serde_json::from_str(r#"{"choices":[]}"#).expect("deser");
        assert!(c.first_content().is_none());
    }

    #[test]
    fn test_health_report_online() {
        let h: HealthReport = serde_json::from_str(r#"{"status":"online","models":[{"id":"a"}]}"#).expect("deser");
        assert!(h.is_online());
        assert_eq!(h.models.len(), 1);
    }

    #[test]
    fn test_health_report_offline_message() {
        let h: HealthReport =
            serde_json::from_str(r#"{"status":"offline","message":"refused"}"#).expect("deser");
        assert!(!h.is_online());
        assert_eq!(h.message.as_deref(), Some("refused"));
    }

    #[test]
    fn test_model_list_ignores_extra_fields() {
        let m: ModelList =
            serde_json::from_str(r#"{"data":[{"id":"m1","object":"model"},{"id":"m2"}]}"#).expect("deser");
        assert_eq!(m.data, vec![ModelEntry { id: "m1".into() }, ModelEntry { id: "m2".into() }]);
    }

    #[test]
    fn test_ab_result_display_prefers_response() {
        let r: AbTestResult = serde_json::from_str(r#"{"model":"m1","response":"hi"}"#).expect("deser");
        assert_eq!(r.display_text(), "hi");
        let r: AbTestResult = serde_json::from_str(r#"{"model":"m2","error":"boom"}"#).expect("deser");
        assert_eq!(r.display_text(), "boom");
    }

    #[test]
    fn test_ab_result_empty_response_falls_back_to_error() {
        let r: AbTestResult =
            serde_json::from_str(r#"{"model":"m1","response":"","error":"empty"}"#).expect("deser");
        assert_eq!(r.display_text(), "empty");
    }

    #[test]
    fn test_ab_request_serializes_models_in_order() {
        let req = AbTestRequest {
            prompt: "p".into(),
            models: vec!["a".into(), "b".into()],
            temperature: None,
        };
        let json = serde_json::to_string(&req).expect("serialize");
        assert_eq!(json, r#"{"prompt":"p","models":["a","b"]}"#);
    }

    #[test]
    fn test_tool_defaults_for_sparse_entries() {
        let t: Tool = serde_json::from_str(r#"{"name":"search"}"#).expect("deser");
        assert_eq!(t.name, "search");
        assert!(t.description.is_empty());
        assert!(t.enabled);
    }

    #[test]
    fn test_template_keeps_unknown_fields() {
        let json = r#"{"id":"t1","name":"greet","content":"Hi {name}","tags":["a"]}"#;
        let t: PromptTemplate = serde_json::from_str(json).expect("deser");
        assert_eq!(t.id.as_deref(), Some("t1"));
        assert!(t.extra.contains_key("tags"));
        let back = serde_json::to_value(&t).expect("serialize");
        assert_eq!(back["tags"][0], "a");
    }

    #[test]
    fn test_template_without_id_omits_it() {
        let t = PromptTemplate {
            id: None,
            name: "n".into(),
            content: "c".into(),
            extra: Default::default(),
        };
        let back = serde_json::to_value(&t).expect("serialize");
        assert!(back.get("id").is_none());
    }
}
