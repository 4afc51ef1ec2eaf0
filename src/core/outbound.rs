//! Builds the user turn that goes over the wire and the compact record of it
//! that stays in history.

use crate::api::ChatMessage;
use crate::core::attachments::Attachment;
use crate::core::message::{History, Message, Role};

const NO_TYPED_MESSAGE: &str = "(No typed message)";

pub struct OutboundTurn {
    /// Final user message for the request, with file contents and images.
    pub api_message: ChatMessage,
    /// What history keeps: a filename manifest plus the typed text.
    pub history_record: Message,
}

/// Combine typed text and attachments into the outgoing user turn.
pub fn build_outbound(typed: &str, attachments: &[Attachment]) -> OutboundTurn {
    let images: Vec<String> = attachments
        .iter()
        .filter_map(Attachment::image_payload)
        .map(str::to_string)
        .collect();

    let content = if attachments.is_empty() {
        typed.to_string()
    } else {
        let mut preamble = String::from("User has attached the following files:\n");
        let mut file_blocks = String::new();
        for attachment in attachments {
            preamble.push_str(&format!(
                "- \"{}\" ({})\n",
                attachment.name, attachment.declared_type
            ));
            if !attachment.is_image() {
                file_blocks.push_str(&format!(
                    "\n\nContent of \"{}\":\n```\n{}\n```\n",
                    attachment.name, attachment.content
                ));
            }
        }
        let typed = if typed.is_empty() {
            NO_TYPED_MESSAGE
        } else {
            typed
        };
        format!("{preamble}{file_blocks}\nUser's typed message:\n{typed}")
    };

    OutboundTurn {
        api_message: ChatMessage {
            role: Role::User,
            content,
            images: (!images.is_empty()).then_some(images),
        },
        history_record: Message::user(history_content(typed, attachments)),
    }
}

/// `(Files: a, b) text`, or just the text when nothing is attached.
pub fn history_content(typed: &str, attachments: &[Attachment]) -> String {
    if attachments.is_empty() {
        return typed.to_string();
    }
    let names: Vec<&str> = attachments.iter().map(|a| a.name.as_str()).collect();
    format!("(Files: {}) {}", names.join(", "), typed)
        .trim()
        .to_string()
}

/// System prompt (when set), then the replayed history, then the new turn.
pub fn compose_messages(
    system_prompt: &str,
    history: &History,
    current: ChatMessage,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    let system_prompt = system_prompt.trim();
    if !system_prompt.is_empty() {
        messages.push(ChatMessage::from(&Message::system(system_prompt)));
    }
    messages.extend(history.iter().map(ChatMessage::from));
    messages.push(current);
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::attachments::{MediaKind, Normalized};

    fn attachment(name: &str, declared_type: &str, content: &str, kind: MediaKind) -> Attachment {
        Attachment::new(
            name,
            declared_type,
            Normalized {
                content: content.to_string(),
                kind,
                warning: None,
            },
        )
    }

    #[test]
    fn plain_message_passes_through() {
        let turn = build_outbound("hello", &[]);
        assert_eq!(turn.api_message.content, "hello");
        assert_eq!(turn.api_message.images, None);
        assert_eq!(turn.history_record, Message::user("hello"));
    }

    #[test]
    fn attachments_are_inlined_for_the_request_only() {
        let files = vec![
            attachment("notes.txt", "text/plain", "alpha", MediaKind::Text),
            attachment("cat.png", "image/png", "data:image/png;base64,QUJD", MediaKind::Image),
        ];
        let turn = build_outbound("summarize", &files);

        assert_eq!(
            turn.api_message.content,
            "User has attached the following files:\n\
             - \"notes.txt\" (text/plain)\n\
             - \"cat.png\" (image/png)\n\
             \n\nContent of \"notes.txt\":\n```\nalpha\n```\n\
             \nUser's typed message:\nsummarize"
        );
        assert_eq!(turn.api_message.images, Some(vec!["QUJD".to_string()]));
        assert_eq!(
            turn.history_record.content,
            "(Files: notes.txt, cat.png) summarize"
        );
    }

    #[test]
    fn attachments_without_text_use_placeholder() {
        let files = vec![attachment("a.txt", "", "x", MediaKind::Text)];
        let turn = build_outbound("", &files);
        assert!(turn
            .api_message
            .content
            .ends_with("User's typed message:\n(No typed message)"));
        assert_eq!(turn.history_record.content, "(Files: a.txt)");
    }

    #[test]
    fn messages_are_ordered_system_history_current() {
        let mut history = History::new();
        history.push(Message::user("q1"));
        history.push(Message::assistant("a1"));

        let current = build_outbound("q2", &[]).api_message;
        let messages = compose_messages("  be brief ", &history, current);

        let roles: Vec<_> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, ["system", "user", "assistant", "user"]);
        assert_eq!(messages[0].content, "be brief");
        assert_eq!(messages[3].content, "q2");

        let without_system = compose_messages("", &history, build_outbound("q2", &[]).api_message);
        assert_eq!(without_system.len(), 3);
    }
}
