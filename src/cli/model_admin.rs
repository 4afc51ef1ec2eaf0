//! Show, pull and delete models.

use std::error::Error;
use std::io::{self, Write};

use crate::api::models::{format_bytes, PullEvent};
use crate::api::{ModelDetails, OllamaClient};

pub async fn show_model(client: &OllamaClient, name: &str, raw: bool) -> Result<(), Box<dyn Error>> {
    let details = client.show_model(name).await?;
    if raw {
        println!("{}", serde_json::to_string_pretty(&details.raw)?);
        return Ok(());
    }

    let size = client
        .list_models()
        .await
        .ok()
        .and_then(|models| models.into_iter().find(|m| m.name == name))
        .map(|m| m.size)
        .filter(|size| *size > 0);
    print!("{}", describe_model(&details, size));
    Ok(())
}

fn describe_model(details: &ModelDetails, size: Option<u64>) -> String {
    let info = &details.info;
    let mut out = format!("📦 {}\n", details.name);
    if let Some(size) = size {
        out.push_str(&format!("  Size: {}\n", format_bytes(size)));
    }
    if let Some(capabilities) = info.capabilities.as_ref().filter(|c| !c.is_empty()) {
        out.push_str(&format!("  Capabilities: {}\n", capabilities.join(", ")));
    }
    out.push_str(&format!(
        "  Model type: {}\n",
        info.base_model().unwrap_or("Unknown")
    ));
    let license = info
        .license
        .as_deref()
        .and_then(|license| license.lines().find(|line| !line.trim().is_empty()))
        .map(str::trim)
        .unwrap_or("Not specified");
    out.push_str(&format!("  License: {license}\n"));
    if let Some(parameters) = info.parameters.as_deref().filter(|p| !p.trim().is_empty()) {
        out.push_str("  Parameters:\n");
        for line in parameters.lines().filter(|line| !line.trim().is_empty()) {
            out.push_str(&format!("    {}\n", line.split_whitespace().collect::<Vec<_>>().join(" ")));
        }
    }
    out
}

/// Progress lines overwrite each other in place; status lines get their own.
#[derive(Debug, Default)]
struct PullProgressLine {
    last_line_len: usize,
}

impl PullProgressLine {
    fn render(&mut self, event: &PullEvent) -> String {
        let line = event.describe();
        match event {
            PullEvent::Progress { .. } => {
                let padding = self.last_line_len.saturating_sub(line.len());
                self.last_line_len = line.len();
                format!("\r{line}{}", " ".repeat(padding))
            }
            PullEvent::Status(_) => format!("{}{line}\n", self.finish()),
        }
    }

    /// Terminate a pending progress line, if any.
    fn finish(&mut self) -> &'static str {
        if std::mem::take(&mut self.last_line_len) > 0 {
            "\n"
        } else {
            ""
        }
    }
}

pub async fn pull_model(client: &OllamaClient, name: &str) -> Result<(), Box<dyn Error>> {
    println!("Starting download...");
    let mut progress = PullProgressLine::default();
    let pulled = client
        .pull_model(name, |event| {
            print!("{}", progress.render(&event));
            let _ = io::stdout().flush();
        })
        .await;
    print!("{}", progress.finish());
    let pulled = pulled?;
    println!("✅ Download complete: {pulled}");
    Ok(())
}

pub async fn delete_model(
    client: &OllamaClient,
    name: &str,
    assume_yes: bool,
) -> Result<(), Box<dyn Error>> {
    if !assume_yes && !confirm(&format!("Delete model \"{name}\"? [y/N] "))? {
        println!("Cancelled.");
        return Ok(());
    }
    client.delete_model(name).await?;
    println!("🗑️  Deleted {name}");
    Ok(())
}

fn confirm(prompt: &str) -> io::Result<bool> {
    print!("{prompt}");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
