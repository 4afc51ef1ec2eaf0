//! Non-interactive "say" command

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::api::OllamaClient;
use crate::cli::chat::{attach_paths, write_html};
use crate::cli::remember_model;
use crate::core::config::data::Config;
use crate::core::session::{ComposeSession, TurnOutcome};

pub async fn run_say(
    client: &OllamaClient,
    model: String,
    config: &Config,
    prompt: String,
    attach: Vec<PathBuf>,
    html: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let mut session = ComposeSession::new(
        Some(model.clone()),
        config.system_prompt.clone().unwrap_or_default(),
    )
    .with_policy(config.reasoning_policy());

    if !attach.is_empty() {
        attach_paths(&mut session, &attach).await;
    }

    let outcome = session
        .send(client, &prompt, |update| {
            print!("{}", update.fragment);
            let _ = io::stdout().flush();
        })
        .await?;
    println!();
    remember_model(&model);

    match outcome {
        TurnOutcome::Completed(response) => {
            if let Some(path) = html {
                write_html(&path, &response.view, &model, config.language_or_default())?;
                eprintln!("💾 Saved response to {}", path.display());
            }
            Ok(())
        }
        TurnOutcome::Failed { error, .. } => Err(error.trim_start_matches("**Error:**").trim().into()),
    }
}
