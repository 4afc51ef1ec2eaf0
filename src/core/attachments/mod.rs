//! Files attached to the next outgoing message.
//!
//! Uploads are normalized into either an inline image (a base64 data URI) or
//! extracted text before they join the [`AttachmentList`]. The list belongs to
//! the compose session and is drained when a message is sent.

pub mod classify;
pub mod ingest;
pub mod pdf;
pub mod spreadsheet;

use std::path::PathBuf;

use thiserror::Error;

pub use ingest::{normalize, IngestReport, Normalized, RawFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: String,
    pub name: String,
    /// Media type reported for the upload; may be empty.
    pub declared_type: String,
    pub content: String,
    pub kind: MediaKind,
}

impl Attachment {
    pub fn new(
        name: impl Into<String>,
        declared_type: impl Into<String>,
        normalized: Normalized,
    ) -> Self {
        Self {
            id: new_attachment_id(),
            name: name.into(),
            declared_type: declared_type.into(),
            content: normalized.content,
            kind: normalized.kind,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == MediaKind::Image
    }

    /// The base64 payload of an image with its data-URI header removed.
    pub fn image_payload(&self) -> Option<&str> {
        if !self.is_image() {
            return None;
        }
        self.content
            .split_once(',')
            .map(|(_, payload)| payload)
    }
}

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("File \"{name}\" is already attached.")]
    Duplicate { name: String },

    #[error("Error reading file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error extracting text from PDF \"{name}\": {source}")]
    Pdf {
        name: String,
        #[source]
        source: lopdf::Error,
    },

    #[error("Error processing spreadsheet \"{name}\": {source}")]
    Workbook {
        name: String,
        #[source]
        source: calamine::Error,
    },

    #[error("Error processing spreadsheet \"{name}\": {source}")]
    Csv {
        name: String,
        #[source]
        source: csv::Error,
    },

    #[error("Error processing file \"{name}\": {message}")]
    Task { name: String, message: String },
}

/// Opaque id of the form `file-<unix millis>-<5 base36 chars>`.
pub fn new_attachment_id() -> String {
    const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    let millis = chrono::Utc::now().timestamp_millis();
    let mut random = [0u8; 5];
    if getrandom::fill(&mut random).is_err() {
        // Clock-derived fallback; the millisecond prefix still orders ids.
        let nanos = chrono::Utc::now().timestamp_subsec_nanos().to_le_bytes();
        random[..4].copy_from_slice(&nanos);
    }
    let suffix: String = random
        .iter()
        .map(|byte| ALPHABET[usize::from(*byte) % ALPHABET.len()] as char)
        .collect();
    format!("file-{millis}-{suffix}")
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentList {
    items: Vec<Attachment>,
}

impl AttachmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.items.iter().any(|item| item.name == name)
    }

    /// Add an attachment unless one with the same name is already present.
    /// The existing attachment always wins.
    pub fn push(&mut self, attachment: Attachment) -> Result<(), AttachmentError> {
        if self.contains_name(&attachment.name) {
            return Err(AttachmentError::Duplicate {
                name: attachment.name,
            });
        }
        self.items.push(attachment);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Attachment> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn remove_by_name(&mut self, name: &str) -> Option<Attachment> {
        let index = self.items.iter().position(|item| item.name == name)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drain every attachment, leaving the list empty.
    pub fn take(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.items)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attachment> {
        self.items.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
