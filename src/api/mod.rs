use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::{Message, Role};

pub mod client;
pub mod models;

pub use client::{ApiError, OllamaClient, DEFAULT_BASE_URL};

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Base64 image payloads without the data-URI header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            images: None,
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatChunkMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// One line of the `/api/chat` stream.
#[derive(Debug, Deserialize, Default)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<ChatChunkMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ChatChunk {
    pub fn content(&self) -> Option<&str> {
        self.message
            .as_ref()
            .and_then(|message| message.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModelTagDetails {
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub parameter_size: Option<String>,
    #[serde(default)]
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelTag {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub modified_at: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub details: Option<ModelTagDetails>,
}

#[derive(Debug, Deserialize, Default)]
pub struct TagsResponse {
    #[serde(default)]
    pub models: Vec<ModelTag>,
}

#[derive(Debug, Serialize)]
pub struct ModelNameRequest<'a> {
    pub name: &'a str,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ShowResponse {
    #[serde(default)]
    pub parameters: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub capabilities: Option<Vec<String>>,
    #[serde(default)]
    pub modelfile: Option<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

/// Parsed `/api/show` metadata alongside the untouched JSON document.
#[derive(Debug, Clone)]
pub struct ModelDetails {
    pub name: String,
    pub info: ShowResponse,
    pub raw: Value,
}

/// One line of the `/api/pull` progress stream.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct PullProgress {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub completed: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
}
