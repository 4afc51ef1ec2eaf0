//! Model listing functionality

use crate::api::models::{connection_hint, format_bytes, sort_models};
use crate::api::{ApiError, OllamaClient};
use crate::core::config::data::Config;
use chrono::{DateTime, Utc};
use std::error::Error;

pub async fn list_models(client: &OllamaClient, config: &Config) -> Result<(), Box<dyn Error>> {
    println!("🤖 Available Models on {}", client.base_url());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    if let Some(default_model) = &config.default_model {
        println!("🎯 Last used model: {default_model} (from config)");
        println!();
    }

    let mut models = match client.list_models().await {
        Ok(models) => models,
        Err(err @ ApiError::Transport { .. }) => {
            eprintln!("{}", connection_hint(client.base_url()));
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    if models.is_empty() {
        println!("No models found. Pull one with: ollachat pull <name>");
        return Ok(());
    }

    println!("Found {} models (sorted newest first):", models.len());
    println!();
    sort_models(&mut models);

    for model in models {
        println!("  • {}", model.name);
        if model.size > 0 {
            println!("    Size: {}", format_bytes(model.size));
        }
        if let Some(details) = &model.details {
            let summary: Vec<&str> = [
                details.family.as_deref(),
                details.parameter_size.as_deref(),
                details.quantization_level.as_deref(),
            ]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect();
            if !summary.is_empty() {
                println!("    Details: {}", summary.join(", "));
            }
        }
        if let Some(modified) = model.modified_at.as_deref().and_then(format_modified) {
            println!("    Modified: {modified}");
        }
        println!();
    }

    Ok(())
}

/// RFC 3339 timestamps are shown in UTC; anything else is passed through.
fn format_modified(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    Some(match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%Y-%m-%d %H:%M:%S UTC")
            .to_string(),
        Err(_) => raw.to_string(),
    })
}
