//! Terminal front end: draws the UI model with colors and runs the chat REPL.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{PromptTemplate, Tool};
use crate::config::validate_temperature;
use crate::error::Result;
use crate::stream::StreamSink;
use crate::ui::{AbResultsView, Controller, SelectWidget, SendOutcome, StatusColor, StatusIndicator, Tab};

// ---------------------------------------------------------------------------
// Streaming output
// ---------------------------------------------------------------------------

/// Prints each increment of the assistant text as it arrives.
///
/// The buffer only ever grows, so only the unseen suffix is written.
pub struct TerminalSink<W: Write> {
    out: W,
    printed: usize,
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        TerminalSink { out, printed: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> StreamSink for TerminalSink<W> {
    fn on_open(&mut self) {
        self.printed = 0;
    }

    fn on_text(&mut self, full_text: &str, _html: &str) {
        if full_text.len() < self.printed {
            self.printed = 0;
        }
        if let Some(fresh) = full_text.get(self.printed..) {
            let _ = write!(self.out, "{fresh}");
            let _ = self.out.flush();
        }
        self.printed = full_text.len();
    }
}

// ---------------------------------------------------------------------------
// Widgets
// ---------------------------------------------------------------------------

pub fn format_status(status: &StatusIndicator) -> String {
    let label = match status.color {
        StatusColor::Green => status.text.as_str().bright_green().to_string(),
        StatusColor::Red => status.text.as_str().bright_red().to_string(),
        StatusColor::Neutral => status.text.as_str().dimmed().to_string(),
    };
    match &status.tooltip {
        Some(tip) => format!("{label} {}", format!("({tip})").as_str().dimmed()),
        None => label,
    }
}

pub fn format_models(select: &SelectWidget) -> String {
    if select.options().is_empty() {
        return "no models".dimmed().to_string();
    }
    let selected = select.selected_value();
    select
        .options()
        .iter()
        .map(|m| {
            if Some(m.as_str()) == selected {
                format!("* {}", m.as_str().bright_cyan().bold())
            } else {
                format!("  {m}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_ab_results(view: &AbResultsView) -> String {
    match view {
        AbResultsView::Empty => String::new(),
        AbResultsView::Running => "Running tests...".dimmed().to_string(),
        AbResultsView::Failed(e) => format!("{} {e}", "A/B test failed:".bright_red()),
        AbResultsView::Cards(cards) => cards
            .iter()
            .map(|card| {
                let body = if card.is_error {
                    card.body.as_str().bright_red().to_string()
                } else {
                    card.body.clone()
                };
                let rule = "─".repeat(40);
                format!(
                    "{}\n{}\n{body}",
                    rule.as_str().dimmed(),
                    card.model.as_str().bright_blue().bold()
                )
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn format_tools(tools: &[Tool]) -> String {
    if tools.is_empty() {
        return "no tools".dimmed().to_string();
    }
    tools
        .iter()
        .map(|t| {
            let state = if t.enabled { "on ".bright_green() } else { "off".dimmed() };
            format!("[{state}] {}  {}  {}", t.name.as_str().bold(), t.endpoint.as_str().dimmed(), t.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_templates(templates: &[PromptTemplate]) -> String {
    if templates.is_empty() {
        return "no templates".dimmed().to_string();
    }
    templates
        .iter()
        .map(|t| {
            format!(
                "{} {}  {}",
                t.id.as_deref().unwrap_or("-").dimmed(),
                t.name.as_str().bold(),
                t.content.lines().next().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn write_transcript(controller: &Controller, path: &Path) -> Result<()> {
    std::fs::write(path, controller.ui().to_html_document())?;
    Ok(())
}

// ---------------------------------------------------------------------------
// REPL
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    Send(String),
    Help,
    Health,
    Models,
    Model(String),
    Temperature(f64),
    /// `None` clears the system prompt.
    System(Option<String>),
    Effort(Option<String>),
    Clear,
    Save(PathBuf),
    Tab(Tab),
    Quit,
    Invalid(String),
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return ReplCommand::Send(line.to_string());
        };
        let (cmd, arg) = match rest.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (rest, ""),
        };
        let optional = |a: &str| if a.is_empty() { None } else { Some(a.to_string()) };
        match cmd {
            "help" | "?" => ReplCommand::Help,
            "health" => ReplCommand::Health,
            "models" => ReplCommand::Models,
            "model" if !arg.is_empty() => ReplCommand::Model(arg.to_string()),
            "temp" => match arg.parse::<f64>().ok().and_then(|t| validate_temperature(t).ok()) {
                Some(t) => ReplCommand::Temperature(t),
                None => ReplCommand::Invalid(format!("temperature must be 0.0-2.0, got '{arg}'")),
            },
            "system" => ReplCommand::System(optional(arg)),
            "effort" => ReplCommand::Effort(optional(arg)),
            "clear" => ReplCommand::Clear,
            "save" if !arg.is_empty() => ReplCommand::Save(PathBuf::from(arg)),
            "tab" => match arg.parse::<Tab>() {
                Ok(tab) => ReplCommand::Tab(tab),
                Err(e) => ReplCommand::Invalid(e.to_string()),
            },
            "quit" | "exit" | "q" => ReplCommand::Quit,
            _ => ReplCommand::Invalid(format!("unknown command: /{cmd} (try /help)")),
        }
    }
}

const HELP: &str = "\
/models            list models (* = selected)
/model <id>        switch model
/temp <0.0-2.0>    set temperature
/system [text]     set or clear the system prompt
/effort [level]    set or clear the reasoning effort
/clear             clear the message list
/save <file>       write the conversation as HTML
/tab <name>        chat | ab-test | tools | templates
/health            check the backend
/quit              leave";

/// Interactive chat until EOF or `/quit`.
pub async fn run_repl(controller: &mut Controller, transcript: Option<&Path>) -> Result<()> {
    println!(
        "{} {}  model: {}",
        "llm-playground".bright_blue().bold(),
        format_status(&controller.ui().status),
        controller.ui().chat.effective_model().bright_cyan()
    );
    println!("{}", "type a message, or /help".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".bright_green().bold());
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Send(text) => {
                let mut sink = TerminalSink::stdout();
                match controller.send_message(&text, &mut sink).await? {
                    SendOutcome::Skipped => {}
                    SendOutcome::Completed(_) => println!(),
                    SendOutcome::Failed(message) => println!("{}", message.bright_red()),
                }
            }
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Health => {
                controller.check_health().await;
                println!("{}", format_status(&controller.ui().status));
            }
            ReplCommand::Models => {
                if let Err(e) = controller.load_models().await {
                    println!("{} {e}", "could not load models:".bright_red());
                }
                println!("{}", format_models(&controller.ui().chat.model_select));
            }
            ReplCommand::Model(model) => match controller.select_model(&model) {
                Ok(()) => println!("model: {}", model.bright_cyan()),
                Err(e) => println!("{}", e.to_string().bright_red()),
            },
            ReplCommand::Temperature(t) => {
                controller.ui_mut().chat.settings.temperature = t;
                println!("temperature: {t}");
            }
            ReplCommand::System(prompt) => {
                controller.ui_mut().chat.settings.system_prompt = prompt;
                println!("{}", "system prompt updated".dimmed());
            }
            ReplCommand::Effort(effort) => {
                controller.ui_mut().chat.settings.reasoning_effort = effort;
                println!("{}", "reasoning effort updated".dimmed());
            }
            ReplCommand::Clear => {
                controller.clear_chat();
                println!("{}", "cleared".dimmed());
            }
            ReplCommand::Save(path) => match write_transcript(controller, &path) {
                Ok(()) => println!("saved {}", path.display()),
                Err(e) => println!("{}", e.to_string().bright_red()),
            },
            ReplCommand::Tab(tab) => {
                controller.switch_tab(tab);
                print_tab(controller).await;
            }
            ReplCommand::Quit => break,
            ReplCommand::Invalid(msg) => println!("{}", msg.bright_red()),
        }
    }

    if let Some(path) = transcript {
        write_transcript(controller, path)?;
    }
    Ok(())
}

async fn print_tab(controller: &mut Controller) {
    let tab = controller.ui().active_tab;
    match tab {
        Tab::Chat => println!(
            "{} messages, {} completed exchanges",
            controller.ui().chat.messages.len(),
            controller.conversation().exchanges()
        ),
        Tab::AbTest => println!("{}", format_ab_results(&controller.ui().ab.results)),
        Tab::Tools => match controller.load_tools().await {
            Ok(tools) => println!("{}", format_tools(tools)),
            Err(e) => println!("{}", e.to_string().bright_red()),
        },
        Tab::Templates => match controller.load_templates().await {
            Ok(templates) => println!("{}", format_templates(templates)),
            Err(e) => println!("{}", e.to_string().bright_red()),
        },
    }
}
