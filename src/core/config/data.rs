use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// Server address, e.g. `http://localhost:11434`
    pub base_url: Option<String>,
    /// Last model used; restored on the next start when the server still has it
    pub default_model: Option<String>,
    /// Interface language code (see `SUPPORTED_LANGUAGES`)
    pub language: Option<String>,
    /// Sent as the first message of every request when set
    pub system_prompt: Option<String>,
    /// Wrap fragments that open with a reasoning lead-in phrase in markers
    pub reasoning_heuristic: Option<bool>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.config/ollachat/config.toml` → `~/.config/ollachat/config.toml`
/// - macOS: `/Users/user/Library/Application Support/...` → `~/Library/Application Support/...`
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
