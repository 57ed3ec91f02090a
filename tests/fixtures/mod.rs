//! Mock playground backend shared by the integration tests.
#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use llm_playground::{ChatSettings, Controller, PlaygroundClient};

pub struct BackendMock {
    server: MockServer,
}

impl BackendMock {
    pub async fn start() -> Self {
        BackendMock { server: MockServer::start().await }
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// API root as the client expects it, e.g. `http://127.0.0.1:PORT/api`.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    pub fn client(&self) -> PlaygroundClient {
        PlaygroundClient::new(&self.api_base()).expect("client")
    }

    pub fn controller(&self) -> Controller {
        self.controller_with(ChatSettings::default())
    }

    pub fn controller_with(&self, settings: ChatSettings) -> Controller {
        Controller::new(self.client(), settings)
    }

    pub async fn mock_json(&self, verb: &str, route: &str, status: u16, body: Value) {
        Mock::given(method(verb))
            .and(path(format!("/api{route}")))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_models(&self, ids: &[&str]) {
        let data: Vec<Value> = ids.iter().map(|id| json!({ "id": id })).collect();
        self.mock_json("GET", "/models", 200, json!({ "data": data })).await;
    }

    /// `POST /chat` answering with an event-stream body.
    pub async fn mock_chat_stream(&self, body: &str) {
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(sse_response(body))
            .mount(&self.server)
            .await;
    }
}

pub fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.as_bytes().to_vec(), "text/event-stream")
}

/// One `data:` record per delta, as the backend streams them.
pub fn delta_stream(deltas: &[&str]) -> String {
    deltas
        .iter()
        .map(|d| format!("data: {}\n\n", json!({ "delta": d })))
        .collect()
}
