use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::api::{ModelTag, PullProgress, ShowResponse};

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Human-readable size using 1024-based units and at most two decimals.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{value:.2}");
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", BYTE_UNITS[unit])
}

impl ShowResponse {
    /// Decode an `/api/show` document. When the whole document does not fit,
    /// the error is logged and each field is read on its own so one odd field
    /// does not hide the rest.
    pub fn from_json(raw: &Value) -> Self {
        match Self::deserialize(raw) {
            Ok(info) => info,
            Err(err) => {
                warn!(error = %err, "unexpected /api/show response; reading fields one by one");
                Self {
                    parameters: show_field(raw, "parameters"),
                    license: show_field(raw, "license"),
                    capabilities: show_field(raw, "capabilities"),
                    modelfile: show_field(raw, "modelfile"),
                    template: show_field(raw, "template"),
                    details: show_field(raw, "details"),
                }
            }
        }
    }

    /// The model a Modelfile builds on, taken from its `FROM` line.
    pub fn base_model(&self) -> Option<&str> {
        self.modelfile
            .as_deref()?
            .lines()
            .find_map(|line| line.strip_prefix("FROM "))
            .map(str::trim)
            .filter(|base| !base.is_empty())
    }
}

fn show_field<T: DeserializeOwned>(raw: &Value, key: &str) -> Option<T> {
    let value = raw.get(key).filter(|value| !value.is_null())?;
    match T::deserialize(value) {
        Ok(parsed) => Some(parsed),
        Err(err) => {
            warn!(field = key, error = %err, "ignoring malformed /api/show field");
            None
        }
    }
}

/// Message shown when the server cannot be reached.
pub fn connection_hint(base_url: &str) -> String {
    if base_url.contains("localhost") || base_url.contains("127.0.0.1") {
        format!(
            "Cannot connect to {base_url}. Make sure the server is running on this machine, \
             or pass --url with the public address of your server."
        )
    } else {
        format!("Cannot connect to {base_url}. Please check if the server is running and accessible.")
    }
}

/// Keep the saved model when the server still has it; otherwise take the first one.
pub fn pick_model(models: &[ModelTag], saved: Option<&str>) -> Option<String> {
    if let Some(saved) = saved {
        if models.iter().any(|model| model.name == saved) {
            return Some(saved.to_string());
        }
    }
    models.first().map(|model| model.name.clone())
}

/// Accept either a bare model name or a pasted `ollama pull <name>` command.
pub fn normalize_pull_name(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let mut words = trimmed.split_whitespace();
    let name = match (words.next(), words.next()) {
        (Some(first), Some(second))
            if first.eq_ignore_ascii_case("ollama") && second.eq_ignore_ascii_case("pull") =>
        {
            words.collect::<Vec<_>>().join(" ")
        }
        _ => trimmed.to_string(),
    };
    (!name.is_empty()).then_some(name)
}

/// Newest first, then by name for a stable listing.
pub fn sort_models(models: &mut [ModelTag]) {
    models.sort_by(|a, b| match (&a.modified_at, &b.modified_at) {
        (Some(a_modified), Some(b_modified)) => b_modified
            .cmp(a_modified)
            .then_with(|| a.name.cmp(&b.name)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.name.cmp(&b.name),
    });
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullEvent {
    Status(String),
    Progress { completed: u64, total: u64 },
}

impl PullEvent {
    /// Lines with a total report download progress; the rest report status.
    pub fn from_progress(progress: &PullProgress) -> Option<Self> {
        match (progress.total, &progress.status) {
            (Some(total), _) if total > 0 => Some(Self::Progress {
                completed: progress.completed.unwrap_or(0),
                total,
            }),
            (_, Some(status)) => Some(Self::Status(status.clone())),
            _ => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Status(status) => status.clone(),
            Self::Progress { completed, total } => format!(
                "Downloading: {} / {} ({}%)",
                format_bytes(*completed),
                format_bytes(*total),
                completed.saturating_mul(100) / (*total).max(1)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tag(name: &str, modified_at: Option<&str>) -> ModelTag {
        ModelTag {
            name: name.to_string(),
            size: 0,
            modified_at: modified_at.map(str::to_string),
            digest: None,
            details: None,
        }
    }

    #[test]
    fn format_bytes_trims_trailing_zeros() {
        assert_eq!(format_bytes(0), "0 Bytes");
        assert_eq!(format_bytes(512), "512 Bytes");
        assert_eq!(format_bytes(1024), "1 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(4_920_000_000), "4.58 GB");
    }

    #[test]
    fn base_model_reads_from_line() {
        let info = ShowResponse {
            modelfile: Some("# comment\nFROM llama3:8b\nPARAMETER stop x".into()),
            ..Default::default()
        };
        assert_eq!(info.base_model(), Some("llama3:8b"));
        assert_eq!(ShowResponse::default().base_model(), None);
    }

    #[test]
    fn show_response_keeps_good_fields_when_one_is_malformed() {
        let raw = serde_json::json!({
            "license": "MIT",
            "capabilities": "completion",
            "modelfile": "FROM llama3:8b",
            "details": {"family": "llama"},
        });
        let info = ShowResponse::from_json(&raw);

        assert_eq!(info.license.as_deref(), Some("MIT"));
        assert_eq!(info.capabilities, None);
        assert_eq!(info.base_model(), Some("llama3:8b"));
        assert_eq!(info.details, Some(serde_json::json!({"family": "llama"})));
    }

    #[test]
    fn show_response_decodes_well_formed_documents() {
        let raw = serde_json::json!({"capabilities": ["completion", "vision"], "template": null});
        let info = ShowResponse::from_json(&raw);
        assert_eq!(
            info.capabilities,
            Some(vec!["completion".to_string(), "vision".to_string()])
        );
        assert_eq!(info.template, None);
    }

    #[test]
    fn connection_hint_mentions_local_servers() {
        assert!(connection_hint("http://localhost:11434").contains("--url"));
        assert!(connection_hint("http://127.0.0.1:11434").contains("--url"));
        assert!(connection_hint("https://gpu.example.com").contains("accessible"));
    }

    #[test]
    fn pick_model_prefers_saved_when_available() {
        let models = vec![tag("a", None), tag("b", None)];
        assert_eq!(pick_model(&models, Some("b")), Some("b".into()));
        assert_eq!(pick_model(&models, Some("gone")), Some("a".into()));
        assert_eq!(pick_model(&models, None), Some("a".into()));
        assert_eq!(pick_model(&[], Some("b")), None);
    }

    #[test]
    fn pull_name_strips_pasted_command() {
        assert_eq!(normalize_pull_name("  llama3 "), Some("llama3".into()));
        assert_eq!(
            normalize_pull_name("Ollama  PULL qwen2.5:7b"),
            Some("qwen2.5:7b".into())
        );
        assert_eq!(normalize_pull_name("ollama pull "), None);
        assert_eq!(normalize_pull_name(""), None);
    }

    #[test]
    fn sort_models_puts_newest_first() {
        let mut models = vec![
            tag("old", Some("2024-01-01T00:00:00Z")),
            tag("undated", None),
            tag("new", Some("2025-06-01T00:00:00Z")),
        ];
        sort_models(&mut models);
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["new", "old", "undated"]);
    }

    #[test]
    fn progress_events_describe_download() {
        let event = PullEvent::from_progress(&PullProgress {
            status: Some("downloading".into()),
            total: Some(2048),
            completed: Some(1024),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(event.describe(), "Downloading: 1 KB / 2 KB (50%)");
        assert_eq!(PullEvent::from_progress(&PullProgress::default()), None);
    }
}
