//! Crate-level error type.

use thiserror::Error;

/// Every failure the playground library can report.
///
/// Only transport failures and rejected statuses on the chat endpoint reach
/// the user as message text; the rest are returned to the caller.
#[derive(Debug, Error)]
pub enum PlaygroundError {
    /// The request never produced a response (connect, TLS, body read).
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend replied with a non-2xx status code.
    #[error("HTTP {status} from {url}: {body}")]
    Http { status: u16, url: String, body: String },

    /// A response body did not match the expected JSON shape.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("invalid URL '{url}': {detail}")]
    InvalidUrl { url: String, detail: String },

    /// Caller-supplied data the backend would reject anyway.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A chat send was attempted while another response is still streaming.
    #[error("a response is still streaming; wait for it to finish")]
    ExchangeInFlight,
}

pub type Result<T> = std::result::Result<T, PlaygroundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display_includes_status_and_url() {
        let e = PlaygroundError::Http {
            status: 502,
            url: "http://127.0.0.1:8000/api/chat".to_string(),
            body: "bad gateway".to_string(),
        };
        let s = e.to_string();
        assert!(s.contains("502"));
        assert!(s.contains("/api/chat"));
        assert!(s.contains("bad gateway"));
    }

    #[test]
    fn test_json_error_converts() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e: PlaygroundError = err.into();
        assert!(matches!(e, PlaygroundError::Json(_)));
    }

    #[test]
    fn test_exchange_in_flight_message() {
        assert!(PlaygroundError::ExchangeInFlight.to_string().contains("streaming"));
    }
}
