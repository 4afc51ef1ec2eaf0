use bytes::Bytes;
use futures_util::{pin_mut, Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::ChatChunk;
use crate::core::assembler::StreamAssembler;
use crate::core::ndjson::{decode_line, LineDecoder};
use crate::core::render::RenderedView;

/// Handed to the caller after every fragment is folded into the response.
pub struct StreamUpdate<'a> {
    pub fragment: &'a str,
    pub raw: &'a str,
    pub view: &'a RenderedView,
}

#[derive(Debug, PartialEq, Eq)]
enum LineOutcome {
    Fragment(String),
    Failed(String),
    Skip,
}

fn process_chat_line(line: &str) -> LineOutcome {
    let Some(chunk) = decode_line::<ChatChunk>(line) else {
        return LineOutcome::Skip;
    };

    if chunk.error.is_some() {
        return LineOutcome::Failed(format_api_error(line));
    }

    match chunk.content() {
        Some(content) => LineOutcome::Fragment(content.to_string()),
        None => {
            if chunk.done {
                debug!("server marked the response as done");
            }
            LineOutcome::Skip
        }
    }
}

fn apply_line<F>(
    line: &str,
    assembler: &mut StreamAssembler,
    on_update: &mut F,
) -> Result<(), String>
where
    F: FnMut(StreamUpdate<'_>),
{
    match process_chat_line(line) {
        LineOutcome::Fragment(fragment) => {
            assembler.push_fragment(&fragment);
            on_update(StreamUpdate {
                fragment: &fragment,
                raw: assembler.raw(),
                view: assembler.view(),
            });
            Ok(())
        }
        LineOutcome::Failed(message) => Err(message),
        LineOutcome::Skip => Ok(()),
    }
}

/// Drive a `/api/chat` byte stream into `assembler`.
///
/// Each transport chunk is decoded, folded in and reported through
/// `on_update` before the next one is polled. The stream ends when the
/// transport does; an `Err` item or a server `error` line aborts with a
/// markdown-formatted message and leaves the assembler holding whatever
/// arrived before the failure.
pub async fn consume_chat_stream<S, E, F>(
    stream: S,
    assembler: &mut StreamAssembler,
    mut on_update: F,
) -> Result<(), String>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: std::fmt::Display,
    F: FnMut(StreamUpdate<'_>),
{
    pin_mut!(stream);
    let mut decoder = LineDecoder::new();

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(error = %err, "chat stream interrupted");
                return Err(format_api_error(&format!("Stream interrupted: {err}")));
            }
        };

        for line in decoder.push(&bytes) {
            apply_line(&line, assembler, &mut on_update)?;
        }
    }

    if let Some(line) = decoder.finish() {
        apply_line(&line, assembler, &mut on_update)?;
    }
    Ok(())
}

pub(crate) fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

/// Reduce an error response body to a single readable line.
pub fn summarize_error_body(body: &str) -> String {
    let trimmed = body.trim();
    serde_json::from_str::<Value>(trimmed)
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .filter(|summary| !summary.is_empty())
        .unwrap_or_else(|| trimmed.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Format an error as markdown suitable for showing in place of a response.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "**Error:** An unknown error occurred.".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("**Error:** {}\n```json\n{}\n```", summary, pretty_json);
                }
            }
            return format!("**Error:**\n```json\n{}\n```", pretty_json);
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("**Error:**\n```xml\n{}\n```", trimmed)
    } else if trimmed.contains('\n') {
        format!("**Error:**\n```\n{}\n```", trimmed)
    } else {
        format!("**Error:** {}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::reasoning::ReasoningPolicy;
    use futures_util::stream;

    fn chunk_line(content: &str) -> String {
        format!(
            "{}\n",
            serde_json::json!({"message": {"role": "assistant", "content": content}, "done": false})
        )
    }

    fn byte_stream(chunks: Vec<Vec<u8>>) -> impl Stream<Item = Result<Bytes, String>> {
        stream::iter(chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))))
    }

    #[test]
    fn process_chat_line_extracts_content() {
        assert_eq!(
            process_chat_line(r#"{"message":{"content":"Hi"},"done":false}"#),
            LineOutcome::Fragment("Hi".into())
        );
        assert_eq!(
            process_chat_line(r#"{"message":{"content":""},"done":true}"#),
            LineOutcome::Skip
        );
        assert_eq!(process_chat_line("not json"), LineOutcome::Skip);
    }

    #[test]
    fn process_chat_line_routes_server_errors() {
        match process_chat_line(r#"{"error":"model 'x' not found"}"#) {
            LineOutcome::Failed(message) => assert_eq!(
                message,
                "**Error:** model 'x' not found\n```json\n{\n  \"error\": \"model 'x' not found\"\n}\n```"
            ),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn raw_buffer_is_invariant_under_rechunking() {
        let fragments = ["<think>", "why", "</think>", "Hé", "llo", "\nworld"];
        let body: Vec<u8> = fragments
            .iter()
            .flat_map(|f| chunk_line(f).into_bytes())
            .collect();
        let expected = fragments.concat();

        for size in [1, 2, 3, 7, 16, body.len()] {
            let chunks = body.chunks(size).map(<[u8]>::to_vec).collect();
            let mut assembler = StreamAssembler::new(ReasoningPolicy::MarkersOnly);
            let mut seen = Vec::new();
            consume_chat_stream(byte_stream(chunks), &mut assembler, |update| {
                seen.push(update.fragment.to_string());
            })
            .await
            .expect("stream should complete");

            assert_eq!(assembler.raw(), expected, "chunk size {size}");
            assert_eq!(seen, fragments, "chunk size {size}");
        }
    }

    #[tokio::test]
    async fn malformed_lines_are_skipped() {
        let mut body = chunk_line("a").into_bytes();
        body.extend_from_slice(b"{oops\n");
        body.extend_from_slice(chunk_line("b").as_bytes());

        let mut assembler = StreamAssembler::new(ReasoningPolicy::MarkersOnly);
        consume_chat_stream(byte_stream(vec![body]), &mut assembler, |_| {})
            .await
            .unwrap();
        assert_eq!(assembler.raw(), "ab");
    }

    #[tokio::test]
    async fn final_line_without_newline_is_processed() {
        let body = chunk_line("tail").trim_end().as_bytes().to_vec();
        let mut assembler = StreamAssembler::new(ReasoningPolicy::MarkersOnly);
        consume_chat_stream(byte_stream(vec![body]), &mut assembler, |_| {})
            .await
            .unwrap();
        assert_eq!(assembler.raw(), "tail");
    }

    #[tokio::test]
    async fn transport_error_keeps_partial_content() {
        let items: Vec<Result<Bytes, String>> = vec![
            Ok(Bytes::from(chunk_line("partial"))),
            Err("connection reset".to_string()),
            Ok(Bytes::from(chunk_line("never"))),
        ];
        let mut assembler = StreamAssembler::new(ReasoningPolicy::MarkersOnly);
        let err = consume_chat_stream(stream::iter(items), &mut assembler, |_| {})
            .await
            .unwrap_err();

        assert_eq!(err, "**Error:** Stream interrupted: connection reset");
        assert_eq!(assembler.raw(), "partial");
    }

    #[test]
    fn summarize_error_body_prefers_json_message() {
        assert_eq!(summarize_error_body(r#"{"error":"no such model"}"#), "no such model");
        assert_eq!(summarize_error_body("  bad\n gateway "), "bad gateway");
    }

    #[test]
    fn format_api_error_handles_json_without_summary() {
        let formatted = format_api_error(r#"{"status":"failed"}"#);
        assert_eq!(formatted, "**Error:**\n```json\n{\n  \"status\": \"failed\"\n}\n```");
    }

    #[test]
    fn format_api_error_handles_xml_and_plaintext() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "**Error:**\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(format_api_error("api failure"), "**Error:** api failure");
        assert_eq!(format_api_error("   "), "**Error:** An unknown error occurred.");
    }
}
