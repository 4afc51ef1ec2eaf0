//! Ollachat is a terminal-first chat client for local Ollama-style inference
//! servers.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the compose session, conversation history, the streaming
//!   response assembler, reasoning-block segmentation, and the attachment
//!   normalizer that turns uploads into model context.
//! - [`api`] defines the wire payloads and the HTTP client for the chat, tags,
//!   show, pull, and delete endpoints.
//! - [`cli`] parses arguments and drives interactive and one-shot sessions.
//! - [`utils`] holds URL handling and transcript logging helpers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
