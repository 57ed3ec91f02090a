use std::path::PathBuf;

use clap::{ArgAction, Args as ClapArgs, Parser, Subcommand};

use crate::api::{PromptTemplate, Tool};
use crate::config::validate_temperature;
use crate::session::ChatSettings;

#[derive(Parser)]
#[command(name = "llm-playground")]
#[command(version)]
#[command(about = "Streaming chat, model A/B comparison and tool management for a local LLM server")]
pub struct Args {
    /// Backend API root (overrides config and LLM_PLAYGROUND_API_BASE)
    #[arg(long, global = true)]
    pub api_base: Option<String>,

    /// TOML config file (defaults to $LLM_PLAYGROUND_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check whether the backend can reach the model server
    Health,
    /// List available models
    Models,
    /// Chat with a model; starts a REPL when no prompt is given
    Chat(ChatArgs),
    /// Send one prompt to two models and compare the answers
    AbTest(AbTestArgs),
    /// Manage tools
    #[command(subcommand)]
    Tools(ToolsCommand),
    /// Manage prompt templates
    #[command(subcommand)]
    Templates(TemplatesCommand),
    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(ClapArgs, Debug, Default)]
pub struct ChatArgs {
    /// Prompt for a single exchange
    pub prompt: Option<String>,

    /// Model id (defaults to config, then the first listed model)
    #[arg(long, short)]
    pub model: Option<String>,

    /// Sampling temperature, 0.0 to 2.0
    #[arg(long, short, value_parser = parse_temperature)]
    pub temperature: Option<f64>,

    /// System prompt prepended to the legacy message list
    #[arg(long)]
    pub system: Option<String>,

    /// Reasoning effort hint, e.g. low, medium, high
    #[arg(long)]
    pub reasoning_effort: Option<String>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Ask for a single JSON completion instead of a stream
    #[arg(long)]
    pub no_stream: bool,

    /// Show non-JSON stream lines as text
    #[arg(long)]
    pub raw_text: bool,

    /// Write the conversation as HTML when done
    #[arg(long)]
    pub transcript: Option<PathBuf>,
}

impl ChatArgs {
    /// Layer these flags over settings loaded from config.
    pub fn apply(&self, settings: &mut ChatSettings) {
        if let Some(m) = &self.model {
            settings.model = m.clone();
        }
        if let Some(t) = self.temperature {
            settings.temperature = t;
        }
        if let Some(s) = &self.system {
            settings.system_prompt = Some(s.clone());
        }
        if let Some(e) = &self.reasoning_effort {
            settings.reasoning_effort = Some(e.clone());
        }
        if let Some(n) = self.max_tokens {
            settings.max_tokens = Some(n);
        }
        if self.no_stream {
            settings.stream = false;
        }
        if self.raw_text {
            settings.raw_text_fallback = true;
        }
    }
}

#[derive(ClapArgs, Debug)]
pub struct AbTestArgs {
    /// Prompt sent to both models
    #[arg(long, short)]
    pub prompt: String,

    /// Model for slot A (defaults to the first listed model)
    #[arg(long)]
    pub model_a: Option<String>,

    /// Model for slot B (defaults to the first listed model)
    #[arg(long)]
    pub model_b: Option<String>,

    #[arg(long, short, value_parser = parse_temperature)]
    pub temperature: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum ToolsCommand {
    List,
    /// Create a tool, or replace one with the same name
    Add(ToolArgs),
    /// Replace an existing tool
    Update(ToolArgs),
    Delete { name: String },
}

#[derive(ClapArgs, Debug)]
pub struct ToolArgs {
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    #[arg(long, default_value = "")]
    pub endpoint: String,
    /// Save the tool switched off
    #[arg(long)]
    pub disabled: bool,
}

impl ToolArgs {
    pub fn to_tool(&self) -> Tool {
        Tool {
            name: self.name.clone(),
            description: self.description.clone(),
            endpoint: self.endpoint.clone(),
            enabled: !self.disabled,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TemplatesCommand {
    List,
    /// Create a template, or replace the one with the given id
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        id: Option<String>,
    },
    Delete { id: String },
}

impl TemplatesCommand {
    pub fn template(name: &str, content: &str, id: Option<&str>) -> PromptTemplate {
        PromptTemplate {
            id: id.map(str::to_string),
            name: name.to_string(),
            content: content.to_string(),
            extra: Default::default(),
        }
    }
}

fn parse_temperature(s: &str) -> Result<f64, String> {
    let t: f64 = s.parse().map_err(|_| format!("not a number: {s}"))?;
    validate_temperature(t).map_err(|e| e.to_string())
}

/// `RUST_LOG`-style filter: `-v` flags raise the configured level.
pub fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}
