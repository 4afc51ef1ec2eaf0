//! Interactive line-based chat loop

use std::error::Error;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::api::OllamaClient;
use crate::cli::remember_model;
use crate::core::attachments::{MediaKind, RawFile};
use crate::core::config::data::Config;
use crate::core::render::RenderedView;
use crate::core::session::{ComposeSession, TurnOutcome};
use crate::utils::logging::LoggingState;

const HELP_TEXT: &str = "\
/attach <path>...  Attach files to the next message
/detach <name>     Remove a pending attachment
/files             List pending attachments
/model <name>      Switch model
/system <text>     Set the system prompt (empty to clear)
/reset             Start a new conversation
/html <path>       Save the last response as an HTML page
/log               Pause or resume transcript logging
/help              Show this list
/quit              Leave";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ChatCommand {
    Attach(Vec<PathBuf>),
    Detach(String),
    Files,
    Model(String),
    System(String),
    Reset,
    Html(PathBuf),
    Log,
    Help,
    Quit,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Message(String),
    Command(ChatCommand),
    Empty,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    // `//text` sends a message that starts with a slash.
    if let Some(escaped) = line.strip_prefix("//") {
        return Input::Message(format!("/{escaped}"));
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));
    let parsed = match name {
        "attach" if !rest.is_empty() => {
            ChatCommand::Attach(rest.split_whitespace().map(PathBuf::from).collect())
        }
        "detach" if !rest.is_empty() => ChatCommand::Detach(rest.to_string()),
        "files" => ChatCommand::Files,
        "model" if !rest.is_empty() => ChatCommand::Model(rest.to_string()),
        "system" => ChatCommand::System(rest.to_string()),
        "reset" | "new" => ChatCommand::Reset,
        "html" if !rest.is_empty() => ChatCommand::Html(PathBuf::from(rest)),
        "log" => ChatCommand::Log,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        _ => ChatCommand::Unknown(line.to_string()),
    };
    Input::Command(parsed)
}

pub async fn run_chat(
    client: OllamaClient,
    model: Option<String>,
    config: &Config,
    log: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut session = ComposeSession::new(model, config.system_prompt.clone().unwrap_or_default())
        .with_policy(config.reasoning_policy());
    let mut logging = LoggingState::new(log)?;
    let language = config.language_or_default().to_string();
    let mut last_view: Option<RenderedView> = None;

    println!("💬 ollachat on {}", client.base_url());
    match session.model() {
        Some(model) => println!("   Model: {model}"),
        None => println!("   No model selected. Use /model <name>."),
    }
    println!("   Type /help for commands.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        match parse_input(&line) {
            Input::Empty => {}
            Input::Message(text) => {
                if let Some(view) = send_message(&client, &mut session, &logging, &text).await {
                    last_view = Some(view);
                }
            }
            Input::Command(ChatCommand::Attach(paths)) => attach_paths(&mut session, &paths).await,
            Input::Command(ChatCommand::Detach(name)) => {
                match session.attachments_mut().remove_by_name(&name) {
                    Some(removed) => println!("Removed {}", removed.name),
                    None => eprintln!("⚠️  No attachment named \"{name}\""),
                }
            }
            Input::Command(ChatCommand::Files) => print_attachments(&session),
            Input::Command(ChatCommand::Model(name)) => {
                session.set_model(name.clone());
                remember_model(&name);
                println!("Model set to {name}");
            }
            Input::Command(ChatCommand::System(prompt)) => {
                if prompt.is_empty() {
                    println!("System prompt cleared");
                } else {
                    println!("System prompt set");
                }
                session.set_system_prompt(prompt);
            }
            Input::Command(ChatCommand::Reset) => {
                session.reset();
                last_view = None;
                if let Err(err) = logging.log_message("## New conversation") {
                    warn!(error = %err, "could not write transcript");
                }
                println!("Started a new conversation");
            }
            Input::Command(ChatCommand::Html(path)) => match &last_view {
                Some(view) => {
                    let title = session.model().unwrap_or("ollachat");
                    match write_html(&path, view, title, &language) {
                        Ok(()) => println!("💾 Saved response to {}", path.display()),
                        Err(err) => eprintln!("❌ Could not write {}: {err}", path.display()),
                    }
                }
                None => eprintln!("⚠️  Nothing to save yet"),
            },
            Input::Command(ChatCommand::Log) => match logging.toggle_logging("Logging paused") {
                Ok(message) => println!("{message}"),
                Err(message) => eprintln!("⚠️  {message}"),
            },
            Input::Command(ChatCommand::Help) => println!("{HELP_TEXT}"),
            Input::Command(ChatCommand::Quit) => break,
            Input::Command(ChatCommand::Unknown(command)) => {
                eprintln!("⚠️  Unknown command: {command}. Type /help for commands.");
            }
        }
    }

    Ok(())
}

/// Send one message, streaming the response to stdout.
async fn send_message(
    client: &OllamaClient,
    session: &mut ComposeSession,
    logging: &LoggingState,
    text: &str,
) -> Option<RenderedView> {
    let before = session.history().len();
    let outcome = session
        .send(client, text, |update| {
            print!("{}", update.fragment);
            let _ = io::stdout().flush();
        })
        .await;
    println!();

    for record in session.history().iter().skip(before) {
        if let Err(err) = logging.log_record(record) {
            warn!(error = %err, "could not write transcript");
        }
    }

    match outcome {
        Ok(TurnOutcome::Completed(response)) => {
            if let Some(model) = session.model() {
                remember_model(model);
            }
            Some(response.view)
        }
        Ok(TurnOutcome::Failed { error, .. }) => {
            eprintln!("❌ {}", error.trim_start_matches("**Error:**").trim());
            None
        }
        Err(err) => {
            eprintln!("⚠️  {err}");
            None
        }
    }
}

/// Read `paths` and add them to the pending attachments, reporting each result.
pub(crate) async fn attach_paths(session: &mut ComposeSession, paths: &[PathBuf]) {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        match RawFile::from_path(path).await {
            Ok(file) => files.push(file),
            Err(err) => eprintln!("❌ {err}"),
        }
    }

    let report = session
        .attachments_mut()
        .ingest(files, |attachment| {
            let kind = match attachment.kind {
                MediaKind::Image => "image",
                MediaKind::Text => "text",
            };
            println!("📎 Attached {} ({kind})", attachment.name);
        })
        .await;

    for name in &report.rejected {
        eprintln!("⚠️  File \"{name}\" is already attached.");
    }
    for warning in &report.warnings {
        eprintln!("⚠️  {warning}");
    }
    for err in &report.failed {
        eprintln!("❌ {err}");
    }
}

fn print_attachments(session: &ComposeSession) {
    let attachments = session.attachments();
    if attachments.is_empty() {
        println!("No pending attachments");
        return;
    }
    for attachment in attachments.iter() {
        let declared = if attachment.declared_type.is_empty() {
            "unknown type"
        } else {
            attachment.declared_type.as_str()
        };
        println!("  • {} ({declared})", attachment.name);
    }
}

pub(crate) fn write_html(
    path: &Path,
    view: &RenderedView,
    title: &str,
    language: &str,
) -> io::Result<()> {
    std::fs::write(path, view.to_document(title, language))
}
