use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::{Response, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::api::models::{normalize_pull_name, PullEvent};
use crate::api::{
    ChatRequest, ModelDetails, ModelNameRequest, ModelTag, PullProgress, ShowResponse,
    TagsResponse,
};
use crate::core::chat_stream::summarize_error_body;
use crate::core::ndjson::{decode_line, LineDecoder};
use crate::utils::url::{construct_api_url, validate_base_url};

pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Please enter a valid API URL (e.g., http://localhost:11434); got {0:?}")]
    InvalidBaseUrl(String),

    #[error("Cannot connect to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("API error: {status}. {message}")]
    Status { status: StatusCode, message: String },

    #[error("Unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Please enter a model name")]
    EmptyModelName,

    #[error("{0}")]
    Server(String),
}

/// HTTP client for an Ollama-compatible server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
}

impl OllamaClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_http_client(reqwest::Client::new(), base_url)
    }

    pub fn with_http_client(http: reqwest::Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = validate_base_url(base_url)
            .ok_or_else(|| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Point the client at another server. Invalid URLs leave it unchanged.
    pub fn set_base_url(&mut self, base_url: &str) -> Result<(), ApiError> {
        let validated = validate_base_url(base_url)
            .ok_or_else(|| ApiError::InvalidBaseUrl(base_url.to_string()))?;
        info!(base_url = %validated, "API URL updated");
        self.base_url = validated;
        Ok(())
    }

    fn url(&self, endpoint: &str) -> String {
        construct_api_url(&self.base_url, endpoint)
    }

    async fn send(
        &self,
        url: String,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ApiError> {
        debug!(%url, "sending request");
        let response = request
            .send()
            .await
            .map_err(|source| ApiError::Transport { url, source })?;
        ensure_success(response).await
    }

    /// `GET /api/tags`
    pub async fn list_models(&self) -> Result<Vec<ModelTag>, ApiError> {
        let url = self.url("api/tags");
        let response = self.send(url.clone(), self.http.get(&url)).await?;
        let tags = response
            .json::<TagsResponse>()
            .await
            .map_err(|source| ApiError::Decode { url, source })?;
        Ok(tags.models)
    }

    /// `POST /api/show`
    pub async fn show_model(&self, name: &str) -> Result<ModelDetails, ApiError> {
        let url = self.url("api/show");
        let request = self.http.post(&url).json(&ModelNameRequest { name });
        let response = self.send(url.clone(), request).await?;
        let raw = response
            .json::<serde_json::Value>()
            .await
            .map_err(|source| ApiError::Decode { url, source })?;
        let info = ShowResponse::from_json(&raw);
        Ok(ModelDetails {
            name: name.to_string(),
            info,
            raw,
        })
    }

    /// `POST /api/pull`, reporting each progress line through `on_event`.
    ///
    /// Returns the normalized model name that was pulled.
    pub async fn pull_model<F>(&self, name: &str, mut on_event: F) -> Result<String, ApiError>
    where
        F: FnMut(PullEvent),
    {
        let name = normalize_pull_name(name).ok_or(ApiError::EmptyModelName)?;
        let url = self.url("api/pull");
        let request = self.http.post(&url).json(&ModelNameRequest { name: &name });
        let response = self.send(url.clone(), request).await?;

        let mut stream = response.bytes_stream();
        let mut decoder = LineDecoder::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| ApiError::Transport {
                url: url.clone(),
                source,
            })?;
            for line in decoder.push(&chunk) {
                handle_pull_line(&line, &mut on_event)?;
            }
        }
        if let Some(line) = decoder.finish() {
            handle_pull_line(&line, &mut on_event)?;
        }

        info!(model = %name, "model pull finished");
        Ok(name)
    }

    /// `DELETE /api/delete`
    pub async fn delete_model(&self, name: &str) -> Result<(), ApiError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ApiError::EmptyModelName);
        }
        let url = self.url("api/delete");
        let request = self.http.delete(&url).json(&ModelNameRequest { name });
        self.send(url, request).await?;
        info!(model = %name, "model deleted");
        Ok(())
    }

    /// `POST /api/chat` with streaming enabled; yields the raw response body.
    pub async fn chat_stream(
        &self,
        request: &ChatRequest,
    ) -> Result<impl Stream<Item = reqwest::Result<Bytes>>, ApiError> {
        let url = self.url("api/chat");
        let http_request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(request);
        let response = self.send(url, http_request).await?;
        Ok(response.bytes_stream())
    }
}

async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(ApiError::Status {
        status,
        message: summarize_error_body(&body),
    })
}

fn handle_pull_line<F>(line: &str, on_event: &mut F) -> Result<(), ApiError>
where
    F: FnMut(PullEvent),
{
    let Some(progress) = decode_line::<PullProgress>(line) else {
        return Ok(());
    };
    if let Some(error) = progress.error {
        return Err(ApiError::Server(error));
    }
    if let Some(event) = PullEvent::from_progress(&progress) {
        on_event(event);
    }
    Ok(())
}
