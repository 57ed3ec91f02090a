//! Headless UI model and the controller that drives it.
//!
//! [`UiState`] holds what the page shows: the status label, the three model
//! selectors, the chat message list, the A/B result cards, and the tool and
//! template lists. [`Controller`] performs each user action against the
//! backend and writes the result into that state. Front ends only draw it.

use tracing::{debug, warn};

use crate::api::{AbTestRequest, AbTestResult, PromptTemplate, Role, Tool};
use crate::client::PlaygroundClient;
use crate::error::{PlaygroundError, Result};
use crate::markdown::{escape_html, render_markdown};
use crate::session::{blocking_request, ChatSettings, Conversation};
use crate::stream::{StreamConsumer, StreamOutcome, StreamSink};

pub const PLACEHOLDER: &str = "...";

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Chat,
    AbTest,
    Tools,
    Templates,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Chat, Tab::AbTest, Tab::Tools, Tab::Templates];

    pub fn as_str(&self) -> &'static str {
        match self {
            Tab::Chat => "chat",
            Tab::AbTest => "ab-test",
            Tab::Tools => "tools",
            Tab::Templates => "templates",
        }
    }
}

impl std::fmt::Display for Tab {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tab {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self> {
        Tab::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| PlaygroundError::InvalidInput(format!("unknown tab: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusColor {
    Neutral,
    Green,
    Red,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusIndicator {
    pub text: String,
    pub color: StatusColor,
    /// Hover text; carries the backend's explanation when offline.
    pub tooltip: Option<String>,
}

impl Default for StatusIndicator {
    fn default() -> Self {
        StatusIndicator {
            text: "Checking...".to_string(),
            color: StatusColor::Neutral,
            tooltip: None,
        }
    }
}

/// A `<select>`: ordered options, at most one selected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectWidget {
    options: Vec<String>,
    selected: Option<usize>,
}

impl SelectWidget {
    pub fn options(&self) -> &[String] {
        &self.options
    }

    /// Replace all options; the first one becomes selected.
    pub fn set_options<I: IntoIterator<Item = String>>(&mut self, options: I) {
        self.options = options.into_iter().collect();
        self.selected = if self.options.is_empty() { None } else { Some(0) };
    }

    pub fn selected_value(&self) -> Option<&str> {
        self.selected.and_then(|i| self.options.get(i)).map(String::as_str)
    }

    /// Select `value` if it is one of the options.
    pub fn select(&mut self, value: &str) -> bool {
        match self.options.iter().position(|o| o == value) {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => false,
        }
    }

    /// Select `value`, appending it first if it is not listed.
    pub fn select_or_insert(&mut self, value: &str) {
        if !self.select(value) {
            self.options.push(value.to_string());
            self.selected = Some(self.options.len() - 1);
        }
    }
}

/// One rendered chat turn.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageNode {
    pub role: Role,
    /// Source text: the user's input, or the assistant's accumulated Markdown.
    pub text: String,
    /// What is displayed, already safe to insert as markup.
    pub html: String,
}

impl MessageNode {
    fn new(role: Role, text: &str) -> Self {
        let html = match role {
            Role::Assistant => render_markdown(text),
            _ => escape_html(text),
        };
        MessageNode { role, text: text.to_string(), html }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageList {
    nodes: Vec<MessageNode>,
    /// Index one past the last node scrolled into view.
    scroll_position: usize,
}

impl MessageList {
    pub fn nodes(&self) -> &[MessageNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node, scroll to it and return its index.
    pub fn append(&mut self, role: Role, text: &str) -> usize {
        self.nodes.push(MessageNode::new(role, text));
        self.scroll_to_bottom();
        self.nodes.len() - 1
    }

    pub fn set_content(&mut self, index: usize, text: &str, html: &str) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.text = text.to_string();
            node.html = html.to_string();
        }
    }

    /// Replace a node's content with plain, escaped error text.
    pub fn set_error(&mut self, index: usize, message: &str) {
        if let Some(node) = self.nodes.get_mut(index) {
            node.text = message.to_string();
            node.html = escape_html(message);
        }
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll_position = self.nodes.len();
    }

    pub fn is_scrolled_to_bottom(&self) -> bool {
        self.scroll_position == self.nodes.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.scroll_position = 0;
    }

    /// The messages as one `chat-history` block.
    pub fn to_html(&self) -> String {
        let mut out = String::from("<div id=\"chat-history\">\n");
        for node in &self.nodes {
            out.push_str(&format!(
                "<div class=\"message {}-msg\">{}</div>\n",
                node.role, node.html
            ));
        }
        out.push_str("</div>\n");
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AbCard {
    pub model: String,
    pub body: String,
    pub is_error: bool,
}

impl From<&AbTestResult> for AbCard {
    fn from(r: &AbTestResult) -> Self {
        let body = r.display_text().to_string();
        let is_error = r.response.as_deref().map_or(true, str::is_empty) && r.error.is_some();
        AbCard { model: r.model.clone(), body, is_error }
    }
}

impl AbCard {
    pub fn to_html(&self) -> String {
        format!(
            "<div class=\"ab-result-card\"><h3>{}</h3><p>{}</p></div>",
            escape_html(&self.model),
            escape_html(&self.body)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum AbResultsView {
    #[default]
    Empty,
    /// Request in flight; shows "Running tests...".
    Running,
    Cards(Vec<AbCard>),
    Failed(String),
}

// ---------------------------------------------------------------------------
// Panes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChatPane {
    pub messages: MessageList,
    pub model_select: SelectWidget,
    pub settings: ChatSettings,
    /// False while a response is streaming.
    pub send_enabled: bool,
}

impl ChatPane {
    fn new(settings: ChatSettings) -> Self {
        ChatPane {
            messages: MessageList::default(),
            model_select: SelectWidget::default(),
            settings,
            send_enabled: true,
        }
    }

    /// The selected model, else the configured one.
    pub fn effective_model(&self) -> &str {
        self.model_select.selected_value().unwrap_or(&self.settings.model)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AbPane {
    pub model_a: SelectWidget,
    pub model_b: SelectWidget,
    pub temperature: Option<f64>,
    pub results: AbResultsView,
}

#[derive(Debug, Clone)]
pub struct UiState {
    pub active_tab: Tab,
    pub status: StatusIndicator,
    pub chat: ChatPane,
    pub ab: AbPane,
    pub tools: Vec<Tool>,
    pub templates: Vec<PromptTemplate>,
}

impl UiState {
    pub fn new(settings: ChatSettings) -> Self {
        UiState {
            active_tab: Tab::default(),
            status: StatusIndicator::default(),
            chat: ChatPane::new(settings),
            ab: AbPane::default(),
            tools: Vec::new(),
            templates: Vec::new(),
        }
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    /// Standalone HTML page: the conversation, then the last A/B cards if any.
    pub fn to_html_document(&self) -> String {
        let mut out = String::from(
            "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
             <title>Chat transcript</title>\n</head>\n<body>\n",
        );
        out.push_str(&self.chat.messages.to_html());
        if let AbResultsView::Cards(cards) = &self.ab.results {
            out.push_str("<div id=\"ab-results\">\n");
            for card in cards {
                out.push_str(&card.to_html());
                out.push('\n');
            }
            out.push_str("</div>\n");
        }
        out.push_str("</body>\n</html>\n");
        out
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// Result of one chat send.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Blank input; nothing was sent.
    Skipped,
    Completed(StreamOutcome),
    /// Transport failure or rejected status; the message shows this text.
    Failed(String),
}

/// Writes stream increments into the assistant node and the conversation,
/// then forwards them to the front end's observer.
struct ChatSink<'a, O: StreamSink + ?Sized> {
    messages: &'a mut MessageList,
    node: usize,
    conversation: &'a mut Conversation,
    observer: &'a mut O,
}

impl<O: StreamSink + ?Sized> StreamSink for ChatSink<'_, O> {
    fn on_open(&mut self) {
        self.messages.set_content(self.node, "", "");
        self.observer.on_open();
    }

    fn on_text(&mut self, full_text: &str, html: &str) {
        self.messages.set_content(self.node, full_text, html);
        self.messages.scroll_to_bottom();
        self.observer.on_text(full_text, html);
    }

    fn on_response_id(&mut self, id: &str) {
        self.conversation.record_response_id(id);
        self.observer.on_response_id(id);
    }

    fn on_event(&mut self, name: &str) {
        self.observer.on_event(name);
    }
}

/// Sink that ignores everything, for callers without a live view.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StreamSink for NoopSink {
    fn on_text(&mut self, _full_text: &str, _html: &str) {}
}

pub const CANCELLED: &str = "Error: request cancelled";

/// Keeps the send control off while one exchange runs.
///
/// Dropping it turns the control back on, also when the send future is
/// cancelled. If the exchange never settled and the assistant node still
/// shows the placeholder, the node gets [`CANCELLED`] instead.
struct ExchangeGuard<'a> {
    controller: &'a mut Controller,
    node: usize,
    settled: bool,
}

impl<'a> ExchangeGuard<'a> {
    fn begin(controller: &'a mut Controller, node: usize) -> Self {
        controller.ui.chat.send_enabled = false;
        ExchangeGuard { controller, node, settled: false }
    }

    fn settle(&mut self) {
        self.settled = true;
    }
}

impl std::ops::Deref for ExchangeGuard<'_> {
    type Target = Controller;

    fn deref(&self) -> &Controller {
        &*self.controller
    }
}

impl std::ops::DerefMut for ExchangeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Controller {
        &mut *self.controller
    }
}

impl Drop for ExchangeGuard<'_> {
    fn drop(&mut self) {
        let chat = &mut self.controller.ui.chat;
        chat.send_enabled = true;
        if self.settled {
            return;
        }
        let pending = chat.messages.nodes().get(self.node).is_some_and(|n| n.text == PLACEHOLDER);
        if pending {
            debug!("chat exchange dropped before a reply arrived");
            chat.messages.set_error(self.node, CANCELLED);
        }
    }
}

pub struct Controller {
    client: PlaygroundClient,
    conversation: Conversation,
    ui: UiState,
}

impl Controller {
    pub fn new(client: PlaygroundClient, settings: ChatSettings) -> Self {
        Controller { client, conversation: Conversation::new(), ui: UiState::new(settings) }
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut UiState {
        &mut self.ui
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        self.ui.active_tab = tab;
    }

    /// Empty the message list. The conversation keeps its token.
    pub fn clear_chat(&mut self) {
        self.ui.chat.messages.clear();
    }

    /// Pick the chat model. Unknown names are only accepted before any
    /// model list has been loaded.
    pub fn select_model(&mut self, model: &str) -> Result<()> {
        let chat = &mut self.ui.chat;
        if chat.model_select.select(model) {
            chat.settings.model = model.to_string();
            return Ok(());
        }
        if chat.model_select.options().is_empty() {
            chat.settings.model = model.to_string();
            return Ok(());
        }
        Err(PlaygroundError::InvalidInput(format!("unknown model: {model}")))
    }

    // -- health and models --------------------------------------------------

    /// Refresh the status label. Returns whether the server reported online.
    pub async fn check_health(&mut self) -> bool {
        let status = &mut self.ui.status;
        match self.client.health().await {
            Ok(report) if report.is_online() => {
                debug!(models = report.models.len(), "backend online");
                *status = StatusIndicator {
                    text: "LM Studio Connected".to_string(),
                    color: StatusColor::Green,
                    tooltip: None,
                };
                true
            }
            Ok(report) => {
                warn!(status = %report.status, "health check reported offline");
                *status = StatusIndicator {
                    text: "LM Studio Offline".to_string(),
                    color: StatusColor::Red,
                    tooltip: report.message,
                };
                false
            }
            Err(e) => {
                warn!(error = %e, "health check failed");
                *status = StatusIndicator {
                    text: "Backend Error".to_string(),
                    color: StatusColor::Red,
                    tooltip: Some(e.to_string()),
                };
                false
            }
        }
    }

    /// Refill the three model selectors. On failure they are left as they were.
    pub async fn load_models(&mut self) -> Result<usize> {
        let models = match self.client.list_models().await {
            Ok(m) => m,
            Err(e) => {
                warn!(error = %e, "failed to load models");
                return Err(e);
            }
        };
        let ids: Vec<String> = models.into_iter().map(|m| m.id).collect();
        self.ui.chat.model_select.set_options(ids.clone());
        self.ui.ab.model_a.set_options(ids.clone());
        self.ui.ab.model_b.set_options(ids.clone());

        // An explicitly configured model wins even if the server does not list it.
        let preferred = self.ui.chat.settings.model.clone();
        if !preferred.is_empty() {
            self.ui.chat.model_select.select_or_insert(&preferred);
        }
        debug!(count = ids.len(), "models loaded");
        Ok(ids.len())
    }

    // -- chat ---------------------------------------------------------------

    /// Send one user message and render the reply.
    ///
    /// The send control is disabled for the whole exchange; a call made while
    /// it is disabled fails with [`PlaygroundError::ExchangeInFlight`] and
    /// changes nothing. Dropping the returned future part way re-enables it.
    pub async fn send_message<O: StreamSink + ?Sized>(
        &mut self,
        text: &str,
        observer: &mut O,
    ) -> Result<SendOutcome> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(SendOutcome::Skipped);
        }
        if !self.ui.chat.send_enabled {
            return Err(PlaygroundError::ExchangeInFlight);
        }

        let mut settings = self.ui.chat.settings.clone();
        settings.model = self.ui.chat.effective_model().to_string();

        self.ui.chat.messages.append(Role::User, text);
        let node = self.ui.chat.messages.append(Role::Assistant, PLACEHOLDER);
        let mut exchange = ExchangeGuard::begin(self, node);

        let result = if settings.stream {
            exchange.stream_reply(&settings, text, node, observer).await
        } else {
            exchange.blocking_reply(&settings, text, node, observer).await
        };

        exchange.settle();
        match result {
            Ok(outcome) => {
                exchange.conversation.mark_exchange_complete();
                Ok(SendOutcome::Completed(outcome))
            }
            Err(e) => {
                warn!(error = %e, "chat exchange failed");
                let message = format!("Error: {e}");
                exchange.ui.chat.messages.set_error(node, &message);
                Ok(SendOutcome::Failed(message))
            }
        }
    }

    async fn stream_reply<O: StreamSink + ?Sized>(
        &mut self,
        settings: &ChatSettings,
        text: &str,
        node: usize,
        observer: &mut O,
    ) -> Result<StreamOutcome> {
        let request = self.conversation.streaming_request(settings, text);
        let consumer = StreamConsumer::new().with_raw_text_fallback(settings.raw_text_fallback);
        let mut sink = ChatSink {
            messages: &mut self.ui.chat.messages,
            node,
            conversation: &mut self.conversation,
            observer,
        };
        self.client.chat_stream(&request, consumer, &mut sink).await
    }

    async fn blocking_reply<O: StreamSink + ?Sized>(
        &mut self,
        settings: &ChatSettings,
        text: &str,
        node: usize,
        observer: &mut O,
    ) -> Result<StreamOutcome> {
        let request = blocking_request(settings, text);
        let content = self.client.chat_once(&request).await?;
        let html = render_markdown(&content);
        self.ui.chat.messages.set_content(node, &content, &html);
        self.ui.chat.messages.scroll_to_bottom();
        observer.on_text(&content, &html);
        Ok(StreamOutcome { text: content, ..StreamOutcome::default() })
    }

    // -- A/B test -----------------------------------------------------------

    /// Run `prompt` against the two selected models and show one card per result.
    pub async fn run_ab_test(&mut self, prompt: &str) -> Result<usize> {
        let ab = &mut self.ui.ab;
        let (Some(a), Some(b)) = (ab.model_a.selected_value(), ab.model_b.selected_value()) else {
            return Err(PlaygroundError::InvalidInput("select a model for both slots".to_string()));
        };
        let request = AbTestRequest {
            prompt: prompt.to_string(),
            models: vec![a.to_string(), b.to_string()],
            temperature: ab.temperature,
        };

        ab.results = AbResultsView::Running;
        match self.client.ab_test(&request).await {
            Ok(results) => {
                let cards: Vec<AbCard> = results.iter().map(AbCard::from).collect();
                let count = cards.len();
                self.ui.ab.results = AbResultsView::Cards(cards);
                Ok(count)
            }
            Err(e) => {
                warn!(error = %e, "A/B test failed");
                self.ui.ab.results = AbResultsView::Failed(e.to_string());
                Err(e)
            }
        }
    }

    // -- tools --------------------------------------------------------------

    pub async fn load_tools(&mut self) -> Result<&[Tool]> {
        self.ui.tools = self.client.list_tools().await?;
        Ok(&self.ui.tools)
    }

    /// Save, then re-fetch the list.
    pub async fn save_tool(&mut self, tool: &Tool) -> Result<&[Tool]> {
        self.client.save_tool(tool).await?;
        self.load_tools().await
    }

    pub async fn update_tool(&mut self, name: &str, tool: &Tool) -> Result<&[Tool]> {
        self.client.update_tool(name, tool).await?;
        self.load_tools().await
    }

    pub async fn delete_tool(&mut self, name: &str) -> Result<&[Tool]> {
        self.client.delete_tool(name).await?;
        self.load_tools().await
    }

    // -- templates ----------------------------------------------------------

    pub async fn load_templates(&mut self) -> Result<&[PromptTemplate]> {
        self.ui.templates = self.client.list_templates().await?;
        Ok(&self.ui.templates)
    }

    pub async fn save_template(&mut self, template: &PromptTemplate) -> Result<&[PromptTemplate]> {
        self.client.save_template(template).await?;
        self.load_templates().await
    }

    pub async fn delete_template(&mut self, id: &str) -> Result<&[PromptTemplate]> {
        self.client.delete_template(id).await?;
        self.load_templates().await
    }
}
