//! Configuration: defaults, then an optional TOML file, then environment.
//!
//! CLI flags are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::client::{parse_base_url, DEFAULT_API_BASE};
use crate::error::{PlaygroundError, Result};
use crate::session::{ChatSettings, DEFAULT_TEMPERATURE};

pub const CONFIG_PATH_ENV: &str = "LLM_PLAYGROUND_CONFIG";
pub const API_BASE_ENV: &str = "LLM_PLAYGROUND_API_BASE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub api_base: String,
    pub log_level: String,
    pub chat: ChatConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base: DEFAULT_API_BASE.to_string(),
            log_level: "warn".to_string(),
            chat: ChatConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChatConfig {
    /// Empty means "first model the server lists".
    pub model: Option<String>,
    pub temperature: f64,
    pub system_prompt: Option<String>,
    pub reasoning_effort: Option<String>,
    pub max_tokens: Option<u32>,
    pub stream: bool,
    pub raw_text_fallback: bool,
}

impl Default for ChatConfig {
    fn default() -> Self {
        ChatConfig {
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            system_prompt: None,
            reasoning_effort: None,
            max_tokens: None,
            stream: true,
            raw_text_fallback: false,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Resolve the config file (`explicit`, else `$LLM_PLAYGROUND_CONFIG`),
    /// load it, then apply `$LLM_PLAYGROUND_API_BASE`.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
        let mut config = match path {
            Some(p) => Self::from_file(&p)?,
            None => Config::default(),
        };
        if let Ok(base) = std::env::var(API_BASE_ENV) {
            if !base.trim().is_empty() {
                config.api_base = base;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        parse_base_url(&self.api_base)?;
        validate_temperature(self.chat.temperature)?;
        Ok(())
    }

    /// Chat settings seeded from this config; the model may still be empty.
    pub fn chat_settings(&self) -> ChatSettings {
        ChatSettings {
            model: self.chat.model.clone().unwrap_or_default(),
            temperature: self.chat.temperature,
            system_prompt: self.chat.system_prompt.clone(),
            reasoning_effort: self.chat.reasoning_effort.clone(),
            max_tokens: self.chat.max_tokens,
            stream: self.chat.stream,
            raw_text_fallback: self.chat.raw_text_fallback,
        }
    }
}

pub fn validate_temperature(t: f64) -> Result<f64> {
    if t.is_finite() && (0.0..=2.0).contains(&t) {
        Ok(t)
    } else {
        Err(PlaygroundError::Config(format!("temperature {t} outside 0.0..=2.0")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let c = Config::default();
        assert_eq!(c.api_base, "http://127.0.0.1:8000/api");
        assert_eq!(c.chat.temperature, 0.7);
        assert!(c.chat.stream);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(Config::from_toml_str("").expect("parse"), Config::default());
    }

    #[test]
    fn test_full_toml() {
        let toml = r#"
api_base = "http://localhost:9000/api"
log_level = "debug"

[chat]
model = "qwen"
temperature = 0.2
system_prompt = "Be terse."
reasoning_effort = "high"
max_tokens = 256
stream = false
raw_text_fallback = true
"#;
        let c = Config::from_toml_str(toml).expect("parse");
        assert_eq!(c.api_base, "http://localhost:9000/api");
        assert_eq!(c.log_level, "debug");
        let s = c.chat_settings();
        assert_eq!(s.model, "qwen");
        assert_eq!(s.temperature, 0.2);
        assert_eq!(s.system_prompt.as_deref(), Some("Be terse."));
        assert_eq!(s.reasoning_effort.as_deref(), Some("high"));
        assert_eq!(s.max_tokens, Some(256));
        assert!(!s.stream);
        assert!(s.raw_text_fallback);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Config::from_toml_str("colour = \"red\"").unwrap_err();
        assert!(matches!(err, PlaygroundError::ConfigParse(_)));
    }

    #[test]
    fn test_bad_temperature_rejected() {
        let err = Config::from_toml_str("[chat]\ntemperature = 3.5").unwrap_err();
        assert!(matches!(err, PlaygroundError::Config(_)));
    }

    #[test]
    fn test_bad_api_base_rejected() {
        let err = Config::from_toml_str("api_base = \"nope\"").unwrap_err();
        assert!(matches!(err, PlaygroundError::InvalidUrl { .. }));
    }

    #[test]
    fn test_from_file() {
        let mut f = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(f, "[chat]\nmodel = \"m1\"").expect("write");
        let c = Config::from_file(f.path()).expect("load");
        assert_eq!(c.chat.model.as_deref(), Some("m1"));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Config::from_file(Path::new("/nonexistent/llm-playground.toml")).unwrap_err();
        assert!(matches!(err, PlaygroundError::Io(_)));
    }

    #[test]
    fn test_validate_temperature_bounds() {
        assert!(validate_temperature(0.0).is_ok());
        assert!(validate_temperature(2.0).is_ok());
        assert!(validate_temperature(-0.1).is_err());
        assert!(validate_temperature(f64::NAN).is_err());
    }
}
