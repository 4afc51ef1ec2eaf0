pub mod assembler;
pub mod attachments;
pub mod chat_stream;
pub mod config;
pub mod message;
pub mod ndjson;
pub mod outbound;
pub mod reasoning;
pub mod render;
pub mod session;
