//! HTTP client for the playground backend.
//!
//! One method per endpoint. Non-2xx replies become
//! [`PlaygroundError::Http`] carrying the body text; nothing is retried.

use reqwest::{Client, Method, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::api::*;
use crate::error::{PlaygroundError, Result};
use crate::stream::{StreamConsumer, StreamOutcome, StreamSink};

pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:8000/api";

#[derive(Debug, Clone)]
pub struct PlaygroundClient {
    client: Client,
    base_url: Url,
}

impl PlaygroundClient {
    /// `base_url` is the API root, e.g. `http://127.0.0.1:8000/api`.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(PlaygroundClient { client: Client::new(), base_url: parse_base_url(base_url)? })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Base URL with `segments` appended, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // parse_base_url rejected cannot-be-a-base URLs, so this always succeeds.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<Response> {
        let url = self.endpoint(segments);
        debug!(%method, %url, "backend request");
        let mut request = self.client.request(method, url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PlaygroundError::Http { status, url: url.to_string(), body });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let response = self.send::<()>(Method::GET, segments, None).await?;
        decode(response).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        segments: &[&str],
        body: &B,
    ) -> Result<T> {
        let response = self.send(method, segments, Some(body)).await?;
        decode(response).await
    }

    // -----------------------------------------------------------------------
    // Health and models
    // -----------------------------------------------------------------------

    pub async fn health(&self) -> Result<HealthReport> {
        self.get_json(&["health"]).await
    }

    pub async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let list: ModelList = self.get_json(&["models"]).await?;
        Ok(list.data)
    }

    // -----------------------------------------------------------------------
    // Chat
    // -----------------------------------------------------------------------

    /// POST a streamed chat request and feed the body to `consumer`.
    ///
    /// `sink` sees every increment while the body is still arriving.
    pub async fn chat_stream<S: StreamSink + ?Sized>(
        &self,
        request: &ChatRequest,
        consumer: StreamConsumer,
        sink: &mut S,
    ) -> Result<StreamOutcome> {
        let response = self.send(Method::POST, &["chat"], Some(request)).await?;
        consumer.consume(response.bytes_stream(), sink).await
    }

    /// POST a `stream: false` chat request and return the first completion.
    pub async fn chat_once(&self, request: &ChatRequest) -> Result<String> {
        let completion: ChatCompletion = self.send_json(Method::POST, &["chat"], request).await?;
        completion
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| PlaygroundError::InvalidInput("completion has no choices".to_string()))
    }

    // -----------------------------------------------------------------------
    // A/B test
    // -----------------------------------------------------------------------

    pub async fn ab_test(&self, request: &AbTestRequest) -> Result<Vec<AbTestResult>> {
        let response: AbTestResponse = self.send_json(Method::POST, &["ab-test"], request).await?;
        Ok(response.results)
    }

    // -----------------------------------------------------------------------
    // Tools
    // -----------------------------------------------------------------------

    pub async fn list_tools(&self) -> Result<Vec<Tool>> {
        self.get_json(&["tools"]).await
    }

    /// Create, or replace the tool with the same name.
    pub async fn save_tool(&self, tool: &Tool) -> Result<Tool> {
        self.send_json(Method::POST, &["tools"], tool).await
    }

    pub async fn update_tool(&self, name: &str, tool: &Tool) -> Result<Tool> {
        if tool.name != name {
            return Err(PlaygroundError::InvalidInput(format!(
                "tool name mismatch: path '{name}', body '{}'",
                tool.name
            )));
        }
        self.send_json(Method::PUT, &["tools", name], tool).await
    }

    pub async fn delete_tool(&self, name: &str) -> Result<bool> {
        let response = self.send::<()>(Method::DELETE, &["tools", name], None).await?;
        let ack: DeleteAck = decode(response).await?;
        Ok(ack.success)
    }

    // -----------------------------------------------------------------------
    // Prompt templates
    // -----------------------------------------------------------------------

    pub async fn list_templates(&self) -> Result<Vec<PromptTemplate>> {
        self.get_json(&["prompt-templates"]).await
    }

    /// The server assigns an id when the template has none.
    pub async fn save_template(&self, template: &PromptTemplate) -> Result<PromptTemplate> {
        self.send_json(Method::POST, &["prompt-templates"], template).await
    }

    pub async fn delete_template(&self, id: &str) -> Result<bool> {
        let response = self.send::<()>(Method::DELETE, &["prompt-templates", id], None).await?;
        let ack: DeleteAck = decode(response).await?;
        Ok(ack.success)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Accept only absolute http(s) URLs that can take path segments.
pub fn parse_base_url(raw: &str) -> Result<Url> {
    let invalid = |detail: &str| PlaygroundError::InvalidUrl {
        url: raw.to_string(),
        detail: detail.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(invalid("not a base URL"));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_appends_segments() {
        let c = PlaygroundClient::new("http://127.0.0.1:8000/api").expect("client");
        assert_eq!(c.endpoint(&["chat"]).as_str(), "http://127.0.0.1:8000/api/chat");
    }

    #[test]
    fn test_endpoint_trailing_slash_base() {
        let c = PlaygroundClient::new("http://127.0.0.1:8000/api/").expect("client");
        assert_eq!(c.endpoint(&["models"]).as_str(), "http://127.0.0.1:8000/api/models");
    }

    #[test]
    fn test_endpoint_root_base() {
        let c = PlaygroundClient::new("http://localhost:9000").expect("client");
        assert_eq!(c.endpoint(&["health"]).as_str(), "http://localhost:9000/health");
    }

    #[test]
    fn test_endpoint_encodes_path_segments() {
        let c = PlaygroundClient::new("http://localhost/api").expect("client");
        assert_eq!(
            c.endpoint(&["tools", "web search/v2"]).as_str(),
            "http://localhost/api/tools/web%20search%2Fv2"
        );
    }

    #[test]
    fn test_parse_base_url_rejects_non_http() {
        assert!(matches!(parse_base_url("ftp://x/api"), Err(PlaygroundError::InvalidUrl { .. })));
        assert!(matches!(parse_base_url("mailto:a@b"), Err(PlaygroundError::InvalidUrl { .. })));
        assert!(matches!(parse_base_url("not a url"), Err(PlaygroundError::InvalidUrl { .. })));
    }

    #[test]
    fn test_default_api_base_parses() {
        assert!(parse_base_url(DEFAULT_API_BASE).is_ok());
    }
}
