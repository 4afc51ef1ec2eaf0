//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod model_admin;
pub mod model_list;
pub mod say;

#[cfg(test)]
mod tests;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use crate::api::models::{connection_hint, pick_model};
use crate::api::OllamaClient;
use crate::cli::chat::run_chat;
use crate::cli::model_admin::{delete_model, pull_model, show_model};
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::data::Config;
use crate::core::config::defaults::CONFIG_KEYS;
use crate::core::config::io::ConfigError;

#[derive(Parser)]
#[command(name = "ollachat")]
#[command(about = "A terminal chat client for a local Ollama server")]
#[command(
    long_about = "ollachat talks to an Ollama-compatible server. It streams responses, \
folds <think> reasoning into collapsible blocks, and turns attached images, PDFs, \
spreadsheets and text files into model context.\n\n\
Commands inside chat:\n\
  /attach <path>... Attach files to the next message\n\
  /detach <name>    Remove a pending attachment\n\
  /files            List pending attachments\n\
  /model <name>     Switch model\n\
  /system <text>    Set the system prompt (empty to clear)\n\
  /reset            Start a new conversation\n\
  /html <path>      Save the last response as an HTML page\n\
  /log              Toggle transcript logging\n\
  /help             Show this list\n\
  /quit             Leave\n\n\
Set RUST_LOG (e.g. RUST_LOG=ollachat=debug) for diagnostic output on stderr."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server URL (defaults to the configured base-url, then http://localhost:11434)
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Append the conversation transcript to this file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat (default)
    Chat,
    /// Send one message and print the response
    Say {
        /// Message text
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
        /// File to attach (repeatable)
        #[arg(short = 'a', long = "attach", value_name = "PATH")]
        attach: Vec<PathBuf>,
        /// Also write the rendered response to an HTML file
        #[arg(long, value_name = "PATH")]
        html: Option<PathBuf>,
    },
    /// List models installed on the server
    Models,
    /// Show details for one model
    Show {
        name: String,
        /// Print the full JSON document
        #[arg(long)]
        raw: bool,
    },
    /// Download a model (accepts a pasted `ollama pull <name>`)
    Pull {
        #[arg(trailing_var_arg = true, required = true)]
        name: Vec<String>,
    },
    /// Delete a model from the server
    Delete {
        name: String,
        /// Skip the confirmation prompt
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Set configuration values, or print them all when no key is given
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let args = Args::parse();
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let command = args.command.unwrap_or(Commands::Chat);

    match command {
        Commands::Set { key, value } => {
            let Some(key) = key else {
                Config::load()?.print_all();
                return Ok(());
            };
            if value.is_empty() {
                return Err(
                    format!("Missing value for {key}. Example: ollachat set {key} <value>").into(),
                );
            }
            let value = value.join(" ");
            Config::mutate(|config| config.set_value(&key, &value)).map_err(explain_config_error)?;
            println!("✅ Set {key} to: {value}");
            Ok(())
        }
        Commands::Unset { key } => {
            Config::mutate(|config| config.unset_value(&key)).map_err(explain_config_error)?;
            println!("✅ Unset {key}");
            Ok(())
        }
        command => {
            let config = Config::load()?;
            let client = resolve_client(args.url.as_deref(), &config)?;
            match command {
                Commands::Models => list_models(&client, &config).await,
                Commands::Show { name, raw } => show_model(&client, &name, raw).await,
                Commands::Pull { name } => pull_model(&client, &name.join(" ")).await,
                Commands::Delete { name, yes } => delete_model(&client, &name, yes).await,
                Commands::Say {
                    prompt,
                    attach,
                    html,
                } => {
                    let model = resolve_model(&client, args.model, &config).await?;
                    run_say(&client, model, &config, prompt.join(" "), attach, html).await
                }
                Commands::Chat | Commands::Set { .. } | Commands::Unset { .. } => {
                    let model = resolve_model(&client, args.model, &config).await.ok();
                    run_chat(client, model, &config, args.log).await
                }
            }
        }
    }
}

/// `--url`, then the configured base-url, then the default server.
pub fn resolve_client(url: Option<&str>, config: &Config) -> Result<OllamaClient, Box<dyn Error>> {
    let base_url = url.unwrap_or_else(|| config.base_url_or_default());
    debug!(%base_url, "using server");
    Ok(OllamaClient::new(base_url)?)
}

/// `--model` wins; otherwise keep the last used model if the server still has it.
async fn resolve_model(
    client: &OllamaClient,
    requested: Option<String>,
    config: &Config,
) -> Result<String, Box<dyn Error>> {
    if let Some(model) = requested.filter(|m| !m.trim().is_empty()) {
        return Ok(model);
    }
    match client.list_models().await {
        Ok(models) => pick_model(&models, config.default_model.as_deref())
            .ok_or_else(|| "No models found. Pull one with: ollachat pull <name>".into()),
        Err(err) => {
            warn!(error = %err, "could not list models");
            eprintln!("⚠️  {}", connection_hint(client.base_url()));
            config
                .default_model
                .clone()
                .ok_or_else(|| "Please select a model or ensure API URL is correct.".into())
        }
    }
}

/// Remember `model` as the one to restore next time.
pub(crate) fn remember_model(model: &str) {
    if let Err(err) = Config::mutate(|config| {
        config.set_default_model(model);
        Ok(())
    }) {
        warn!(error = %err, "could not save the selected model");
    }
}

fn explain_config_error(err: ConfigError) -> ConfigError {
    if matches!(err, ConfigError::UnknownKey(_)) {
        eprintln!("Available keys: {}", CONFIG_KEYS.join(", "));
    }
    err
}
