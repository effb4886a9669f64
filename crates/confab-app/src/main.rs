//! Confab application binary - composition root.
//!
//! Ties the crates together into a terminal chat client:
//! 1. Parse CLI args and initialize tracing
//! 2. Load the settings slot (current API configuration)
//! 3. Build the lazily-opened conversation store and the HTTP gateway
//! 4. Run a line-oriented REPL over the orchestrator

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use confab_chat::{attachments, ChatError, ChatOrchestrator};
use confab_core::settings::Settings;
use confab_core::types::ApiConfig;
use confab_gateway::GatewayClient;
use confab_store::ConversationStore;

use cli::CliArgs;

const HELP: &str = "\
Commands:
  /config <host> <model> [credential]  save the API configuration
  /models                              list models from the endpoint
  /new                                 start a new conversation
  /list                                list conversations
  /open <n>                            select conversation n from /list
  /delete <n>                          delete conversation n from /list
  /attach <path>                       queue a file for the next message
  /embed <path>                        extract an embedding for a file
  /help                                show this help
  /quit                                exit
Anything else is sent as a message to the selected conversation.";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.log_level.clone())),
        )
        .init();

    let settings = Settings::load_or_default(&args.resolve_settings_path());
    let store = Arc::new(ConversationStore::new(
        args.resolve_data_dir().join("conversations.db"),
    ));
    let orchestrator = Arc::new(ChatOrchestrator::new(
        store,
        Arc::new(GatewayClient::new()),
        settings,
    ));
    orchestrator.load()?;
    tracing::info!(
        conversations = orchestrator.conversations().len(),
        "confab started"
    );

    println!("confab — type /help for commands");
    if orchestrator.current_config().is_none() {
        println!("No API configuration saved. Start with: /config <host> <model> [credential]");
    }

    run_repl(orchestrator).await?;
    Ok(())
}

async fn run_repl(orchestrator: Arc<ChatOrchestrator>) -> Result<(), Box<dyn std::error::Error>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending_attachments: Vec<PathBuf> = Vec::new();

    loop {
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match handle_command(&orchestrator, command, &mut pending_attachments).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => println!("error: {}", e),
            }
            continue;
        }

        if let Err(e) = send(&orchestrator, line, &mut pending_attachments).await {
            println!("error: {}", e);
        }
    }
    Ok(())
}

/// Handle a slash command. Returns `Ok(true)` to exit the REPL.
async fn handle_command(
    orchestrator: &ChatOrchestrator,
    command: &str,
    pending: &mut Vec<PathBuf>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or_default() {
        "quit" | "exit" => return Ok(true),
        "help" => println!("{}", HELP),
        "config" => {
            let (Some(host), Some(model)) = (parts.next(), parts.next()) else {
                println!("usage: /config <host> <model> [credential]");
                return Ok(false);
            };
            let credential = parts.next().map(str::to_string);
            orchestrator.save_config(ApiConfig {
                host: host.to_string(),
                credential,
                model: model.to_string(),
            })?;
            println!("configuration saved");
        }
        "models" => {
            let models = orchestrator.list_models().await?;
            if models.is_empty() {
                println!("endpoint advertised no models");
            }
            for model in models {
                println!("{}  ({})", model.name, model.id);
            }
        }
        "new" => match orchestrator.new_conversation() {
            Ok(conversation) => println!("started {}", conversation.title),
            Err(ChatError::ConfigRequired) => {
                println!("configure an endpoint first: /config <host> <model> [credential]")
            }
            Err(e) => return Err(e.into()),
        },
        "list" => {
            let conversations = orchestrator.conversations();
            if conversations.is_empty() {
                println!("no conversations yet");
            }
            for (index, conversation) in conversations.iter().enumerate() {
                let marker = if Some(conversation.id) == orchestrator.selected() {
                    "*"
                } else {
                    " "
                };
                println!(
                    "{} {:>3}  {}  ({} messages)",
                    marker,
                    index,
                    conversation.title,
                    conversation.messages.len()
                );
            }
        }
        "open" => match indexed_conversation(orchestrator, parts.next()) {
            Some(id) => match orchestrator.select_conversation(id) {
                Some(conversation) => {
                    println!("opened {}", conversation.title);
                    for message in &conversation.messages {
                        println!("[{}] {}", message.role.as_str(), message.content);
                    }
                }
                None => println!("conversation no longer exists"),
            },
            None => println!("usage: /open <n> (see /list)"),
        },
        "delete" => match indexed_conversation(orchestrator, parts.next()) {
            Some(id) => {
                orchestrator.delete_conversation(id)?;
                println!("deleted");
            }
            None => println!("usage: /delete <n> (see /list)"),
        },
        "attach" => match parts.next() {
            Some(path) => {
                pending.push(PathBuf::from(path));
                println!("queued {} attachment(s)", pending.len());
            }
            None => println!("usage: /attach <path>"),
        },
        "embed" => match parts.next() {
            Some(path) => {
                let result = orchestrator.extract_embedding(path.as_ref()).await?;
                println!(
                    "{}: {} dimensions, first values {:?}",
                    result.file_name,
                    result.vector.len(),
                    &result.vector[..result.vector.len().min(8)]
                );
            }
            None => println!("usage: /embed <path>"),
        },
        other => println!("unknown command: /{} (try /help)", other),
    }
    Ok(false)
}

async fn send(
    orchestrator: &Arc<ChatOrchestrator>,
    text: &str,
    pending: &mut Vec<PathBuf>,
) -> Result<(), Box<dyn std::error::Error>> {
    if orchestrator.selected().is_none() {
        match orchestrator.new_conversation() {
            Ok(_) => {}
            Err(ChatError::ConfigRequired) => {
                println!("configure an endpoint first: /config <host> <model> [credential]");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }

    let paths = std::mem::take(pending);
    let inputs = attachments::read_inputs(&paths).await?;

    match orchestrator.send_to_selected(text, inputs).await? {
        Some(conversation) => {
            if let Some(reply) = conversation.messages.last() {
                println!("[{}] {}", reply.role.as_str(), reply.content);
            }
        }
        None => println!("no conversation selected"),
    }
    Ok(())
}

fn indexed_conversation(orchestrator: &ChatOrchestrator, arg: Option<&str>) -> Option<Uuid> {
    let index: usize = arg?.parse().ok()?;
    orchestrator.conversations().get(index).map(|c| c.id)
}
