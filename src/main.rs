use std::io;

use clap::{CommandFactory, Parser};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use llm_playground::cli::{
    log_filter, AbTestArgs, Args, ChatArgs, Command, TemplatesCommand, ToolsCommand,
};
use llm_playground::terminal::{
    format_ab_results, format_models, format_status, format_templates, format_tools, run_repl,
    write_transcript, TerminalSink,
};
use llm_playground::{Config, Controller, PlaygroundClient, SendOutcome};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Command::Completions { shell } = &args.command {
        clap_complete::generate(*shell, &mut Args::command(), "llm-playground", &mut io::stdout());
        return Ok(());
    }

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(base) = &args.api_base {
        config.api_base = base.clone();
        config.validate()?;
    }
    init_logging(args.verbose, &config.log_level);
    debug!(api_base = %config.api_base, "configuration loaded");

    let client = PlaygroundClient::new(&config.api_base)?;
    let mut controller = Controller::new(client, config.chat_settings());

    match args.command {
        Command::Completions { .. } => {}
        Command::Health => {
            let online = controller.check_health().await;
            println!("{}", format_status(&controller.ui().status));
            if !online {
                std::process::exit(1);
            }
        }
        Command::Models => {
            controller.load_models().await?;
            println!("{}", format_models(&controller.ui().chat.model_select));
        }
        Command::Chat(chat) => run_chat(&mut controller, chat).await?,
        Command::AbTest(ab) => run_ab_test(&mut controller, ab).await?,
        Command::Tools(cmd) => {
            let tools = match cmd {
                ToolsCommand::List => controller.load_tools().await?,
                ToolsCommand::Add(t) => controller.save_tool(&t.to_tool()).await?,
                ToolsCommand::Update(t) => controller.update_tool(&t.name, &t.to_tool()).await?,
                ToolsCommand::Delete { name } => controller.delete_tool(&name).await?,
            };
            println!("{}", format_tools(tools));
        }
        Command::Templates(cmd) => {
            let templates = match cmd {
                TemplatesCommand::List => controller.load_templates().await?,
                TemplatesCommand::Add { name, content, id } => {
                    let template = TemplatesCommand::template(&name, &content, id.as_deref());
                    controller.save_template(&template).await?
                }
                TemplatesCommand::Delete { id } => controller.delete_template(&id).await?,
            };
            println!("{}", format_templates(templates));
        }
    }

    Ok(())
}

/// Logs go to stderr so streamed replies on stdout stay clean.
/// `RUST_LOG` wins when no `-v` flag is given.
fn init_logging(verbose: u8, configured: &str) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(env) if verbose == 0 => env,
        _ => EnvFilter::new(log_filter(verbose, configured)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn run_chat(
    controller: &mut Controller,
    chat: ChatArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    chat.apply(&mut controller.ui_mut().chat.settings);

    controller.check_health().await;
    if let Err(e) = controller.load_models().await {
        // Chat can still go ahead with an explicitly named model.
        info!(error = %e, "continuing without a model list");
    }
    if controller.ui().chat.effective_model().is_empty() {
        return Err("no model available: pass --model or start the model server".into());
    }

    let Some(prompt) = chat.prompt else {
        run_repl(controller, chat.transcript.as_deref()).await?;
        return Ok(());
    };

    let mut sink = TerminalSink::stdout();
    let outcome = controller.send_message(&prompt, &mut sink).await?;
    if let Some(path) = &chat.transcript {
        write_transcript(controller, path)?;
    }
    match outcome {
        SendOutcome::Skipped => Err("empty prompt".into()),
        SendOutcome::Completed(_) => {
            println!();
            Ok(())
        }
        SendOutcome::Failed(message) => Err(message.into()),
    }
}

async fn run_ab_test(
    controller: &mut Controller,
    ab: AbTestArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.load_models().await?;
    let pane = &mut controller.ui_mut().ab;
    if let Some(a) = &ab.model_a {
        pane.model_a.select_or_insert(a);
    }
    if let Some(b) = &ab.model_b {
        pane.model_b.select_or_insert(b);
    }
    pane.temperature = ab.temperature;

    let result = controller.run_ab_test(&ab.prompt).await;
    println!("{}", format_ab_results(&controller.ui().ab.results));
    result?;
    Ok(())
}
