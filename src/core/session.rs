//! One conversation: its history, pending attachments and the send flow.

use bytes::Bytes;
use futures_util::Stream;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ChatRequest, OllamaClient};
use crate::core::assembler::{FinalResponse, StreamAssembler};
use crate::core::attachments::AttachmentList;
use crate::core::chat_stream::{consume_chat_stream, format_api_error, StreamUpdate};
use crate::core::message::{History, Message};
use crate::core::outbound::{build_outbound, compose_messages};
use crate::core::reasoning::ReasoningPolicy;
use crate::core::render::RenderedView;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("Please select a model or ensure API URL is correct.")]
    NoModel,
    #[error("Type a message or attach a file first.")]
    EmptyMessage,
    #[error("A response is still streaming.")]
    Busy,
}

/// A validated turn whose request has not been issued yet.
#[derive(Debug, Clone)]
pub struct PendingTurn {
    pub request: ChatRequest,
    pub history_record: Message,
    /// Names of the attachments that went into this turn.
    pub attachments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(FinalResponse),
    /// The partial response stays visible next to the error message.
    Failed { partial: RenderedView, error: String },
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

#[derive(Debug, Default)]
pub struct ComposeSession {
    history: History,
    attachments: AttachmentList,
    model: Option<String>,
    system_prompt: String,
    policy: ReasoningPolicy,
    in_flight: bool,
}

impl ComposeSession {
    pub fn new(model: Option<String>, system_prompt: impl Into<String>) -> Self {
        Self {
            model: model.filter(|name| !name.trim().is_empty()),
            system_prompt: system_prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_policy(mut self, policy: ReasoningPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn attachments(&self) -> &AttachmentList {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentList {
        &mut self.attachments
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        let model = model.into();
        info!(%model, "model selected");
        self.model = Some(model).filter(|name| !name.trim().is_empty());
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = prompt.into();
    }

    pub fn policy(&self) -> ReasoningPolicy {
        self.policy
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Validate the input and claim the session for one turn.
    ///
    /// Attachments are drained into the request; the user record is only
    /// written to history once the server accepts it.
    pub fn begin_turn(&mut self, typed: &str) -> Result<PendingTurn, SendError> {
        if self.in_flight {
            return Err(SendError::Busy);
        }
        let Some(model) = self.model.clone() else {
            return Err(SendError::NoModel);
        };
        let typed = typed.trim();
        if typed.is_empty() && self.attachments.is_empty() {
            return Err(SendError::EmptyMessage);
        }

        let attachments = self.attachments.take();
        let outbound = build_outbound(typed, &attachments);
        let messages = compose_messages(&self.system_prompt, &self.history, outbound.api_message);

        self.in_flight = true;
        debug!(%model, messages = messages.len(), files = attachments.len(), "turn started");
        Ok(PendingTurn {
            request: ChatRequest {
                model,
                messages,
                stream: true,
            },
            history_record: outbound.history_record,
            attachments: attachments.into_iter().map(|a| a.name).collect(),
        })
    }

    /// Issue the request for `pending` and stream the reply.
    pub async fn run_turn<F>(
        &mut self,
        client: &OllamaClient,
        pending: PendingTurn,
        on_update: F,
    ) -> TurnOutcome
    where
        F: FnMut(StreamUpdate<'_>),
    {
        let PendingTurn {
            request,
            history_record,
            ..
        } = pending;
        match client.chat_stream(&request).await {
            Ok(stream) => self.complete_turn(history_record, stream, on_update).await,
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.abort_turn();
                TurnOutcome::Failed {
                    partial: RenderedView::empty(),
                    error: format_api_error(&err.to_string()),
                }
            }
        }
    }

    /// Record an accepted turn and fold its response stream into history.
    pub async fn complete_turn<S, E, F>(
        &mut self,
        history_record: Message,
        stream: S,
        on_update: F,
    ) -> TurnOutcome
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
        F: FnMut(StreamUpdate<'_>),
    {
        self.history.push(history_record);

        let mut assembler = StreamAssembler::new(self.policy);
        let result = consume_chat_stream(stream, &mut assembler, on_update).await;
        self.in_flight = false;

        match result {
            Ok(()) => {
                let response = assembler.finalize();
                self.history.push(Message::assistant(response.raw.clone()));
                TurnOutcome::Completed(response)
            }
            Err(error) => TurnOutcome::Failed {
                partial: assembler.view().clone(),
                error,
            },
        }
    }

    /// Release the session after a turn that never reached the server.
    pub fn abort_turn(&mut self) {
        self.in_flight = false;
    }

    pub async fn send<F>(
        &mut self,
        client: &OllamaClient,
        typed: &str,
        on_update: F,
    ) -> Result<TurnOutcome, SendError>
    where
        F: FnMut(StreamUpdate<'_>),
    {
        let pending = self.begin_turn(typed)?;
        Ok(self.run_turn(client, pending, on_update).await)
    }

    /// Start over: drop history and attachments.
    pub fn reset(&mut self) {
        self.history.clear();
        self.attachments.clear();
        self.in_flight = false;
        info!("conversation reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attachments::{Attachment, MediaKind, Normalized};
    use futures_util::stream;

    fn session() -> ComposeSession {
        ComposeSession::new(Some("llama3".into()), "")
    }

    fn chunks(lines: &[&str]) -> Vec<Result<Bytes, String>> {
        lines
            .iter()
            .map(|line| Ok(Bytes::from(format!("{line}\n"))))
            .collect()
    }

    fn text_attachment(name: &str) -> Attachment {
        Attachment::new(
            name,
            "text/plain",
            Normalized {
                content: "body".into(),
                kind: MediaKind::Text,
                warning: None,
            },
        )
    }

    #[test]
    fn send_is_gated_on_model_text_and_in_flight() {
        let mut no_model = ComposeSession::new(None, "");
        assert_eq!(no_model.begin_turn("hi").unwrap_err(), SendError::NoModel);

        let mut session = session();
        assert_eq!(session.begin_turn("   ").unwrap_err(), SendError::EmptyMessage);
        assert!(!session.is_in_flight());

        let pending = session.begin_turn("hi").unwrap();
        assert!(session.is_in_flight());
        assert_eq!(session.begin_turn("again").unwrap_err(), SendError::Busy);

        assert!(session.history().is_empty());
        assert_eq!(pending.request.model, "llama3");
        assert!(pending.request.stream);
    }

    #[test]
    fn attachments_alone_are_enough_to_send() {
        let mut session = session();
        session
            .attachments_mut()
            .push(text_attachment("notes.txt"))
            .unwrap();

        let pending = session.begin_turn("").unwrap();
        assert_eq!(pending.attachments, ["notes.txt"]);
        assert_eq!(pending.history_record.content, "(Files: notes.txt)");
        assert!(session.attachments().is_empty());
    }

    #[tokio::test]
    async fn completed_turn_appends_both_records() {
        let mut session = session();
        session.set_system_prompt("be brief");
        let pending = session.begin_turn("hello").unwrap();
        assert_eq!(pending.request.messages[0].content, "be brief");

        let body = chunks(&[
            r#"{"message":{"role":"assistant","content":"<think>hmm</think>"}}"#,
            r#"{"message":{"role":"assistant","content":"Hi **there**"}}"#,
            r#"{"done":true}"#,
        ]);
        let mut updates = 0;
        let outcome = session
            .complete_turn(pending.history_record, stream::iter(body), |_| updates += 1)
            .await;

        let TurnOutcome::Completed(response) = outcome else {
            panic!("expected a completed turn");
        };
        assert_eq!(updates, 2);
        assert_eq!(response.view.reasoning.len(), 1);
        assert!(response.view.html.contains("<strong>there</strong>"));
        assert!(!session.is_in_flight());

        let history: Vec<_> = session.history().iter().cloned().collect();
        assert_eq!(
            history,
            vec![
                Message::user("hello"),
                Message::assistant("<think>hmm</think>Hi **there**"),
            ]
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_partial_output_only() {
        let mut session = session();
        let pending = session.begin_turn("hello").unwrap();

        let mut body = chunks(&[r#"{"message":{"role":"assistant","content":"partial answer"}}"#]);
        body.push(Err("connection reset".to_string()));

        let outcome = session
            .complete_turn(pending.history_record, stream::iter(body), |_| {})
            .await;

        let TurnOutcome::Failed { partial, error } = outcome else {
            panic!("expected a failed turn");
        };
        assert!(partial.html.contains("partial answer"));
        assert!(error.starts_with("**Error:**"));
        assert!(error.contains("connection reset"));

        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().last(), Some(&Message::user("hello")));
        assert!(!session.is_in_flight());
        assert!(session.begin_turn("next").is_ok());
    }

    #[tokio::test]
    async fn failed_request_releases_the_session() {
        let mut session = session();
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = OllamaClient::new(&format!("http://127.0.0.1:{port}")).unwrap();
        let outcome = session.send(&client, "hello", |_| {}).await.unwrap();

        assert!(!outcome.is_completed());
        assert!(session.history().is_empty());
        assert!(!session.is_in_flight());
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = session();
        session
            .attachments_mut()
            .push(text_attachment("a.txt"))
            .unwrap();
        let _pending = session.begin_turn("hi").unwrap();
        session.reset();

        assert!(session.history().is_empty());
        assert!(session.attachments().is_empty());
        assert!(!session.is_in_flight());
        assert_eq!(session.model(), Some("llama3"));
    }
}
