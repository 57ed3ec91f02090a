//! Client for a local LLM playground backend.
//!
//! The backend fronts an LM Studio style model server and exposes health,
//! model listing, streaming chat, A/B comparison, tools and prompt templates
//! under one API root. This crate speaks that API, decodes the chat stream
//! incrementally, renders replies as sanitized HTML, and keeps a headless
//! model of the playground page that the terminal front end draws.

pub mod api;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod markdown;
pub mod session;
pub mod sse;
pub mod stream;
pub mod terminal;
pub mod ui;

pub use client::PlaygroundClient;
pub use config::Config;
pub use error::{PlaygroundError, Result};
pub use session::{ChatSettings, Conversation};
pub use stream::{StreamConsumer, StreamOutcome, StreamSink};
pub use ui::{Controller, SendOutcome, Tab, UiState};
