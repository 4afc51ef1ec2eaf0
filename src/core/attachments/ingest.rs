use std::path::Path;

use base64::Engine as _;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use super::classify::{classify, FileKind, SheetFormat};
use super::pdf::extract_pdf_text;
use super::spreadsheet::{read_csv, read_workbook, render_workbook};
use super::{Attachment, AttachmentError, AttachmentList, MediaKind};

/// An upload before conversion.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl RawFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its media type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, AttachmentError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| AttachmentError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let declared_type = mime_guess::from_path(path)
            .first_raw()
            .unwrap_or_default()
            .to_string();
        Ok(Self::new(name, declared_type, bytes))
    }

    fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.name)
    }
}

/// The converted content of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub content: String,
    pub kind: MediaKind,
    /// Set when the file was converted on a best-effort basis.
    pub warning: Option<String>,
}

impl Normalized {
    fn text(content: String) -> Self {
        Self {
            content,
            kind: MediaKind::Text,
            warning: None,
        }
    }
}

fn image_data_uri(declared_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        declared_type,
        base64::prelude::BASE64_STANDARD.encode(bytes)
    )
}

/// Convert one upload into an inline image or extracted text.
pub fn normalize(file: &RawFile) -> Result<Normalized, AttachmentError> {
    let kind = classify(&file.name, &file.declared_type);
    debug!(name = %file.name, declared_type = %file.declared_type, ?kind, "normalizing attachment");

    match kind {
        FileKind::Image => Ok(Normalized {
            content: image_data_uri(&file.declared_type, &file.bytes),
            kind: MediaKind::Image,
            warning: None,
        }),
        FileKind::Pdf => extract_pdf_text(&file.bytes)
            .map(Normalized::text)
            .map_err(|source| AttachmentError::Pdf {
                name: file.name.clone(),
                source,
            }),
        FileKind::Spreadsheet(SheetFormat::Csv) => read_csv(&file.bytes, file.stem())
            .map(|sheets| Normalized::text(render_workbook(&sheets)))
            .map_err(|source| AttachmentError::Csv {
                name: file.name.clone(),
                source,
            }),
        FileKind::Spreadsheet(SheetFormat::Workbook) => read_workbook(&file.bytes)
            .map(|sheets| Normalized::text(render_workbook(&sheets)))
            .map_err(|source| AttachmentError::Workbook {
                name: file.name.clone(),
                source,
            }),
        FileKind::Text => Ok(Normalized::text(
            String::from_utf8_lossy(&file.bytes).into_owned(),
        )),
        FileKind::Other => {
            let warning = format!(
                "File type \"{}\" for \"{}\" may not be optimally supported. It will be treated as text if possible.",
                file.declared_type, file.name
            );
            warn!("{warning}");
            Ok(Normalized {
                content: String::from_utf8_lossy(&file.bytes).into_owned(),
                kind: MediaKind::Text,
                warning: Some(warning),
            })
        }
    }
}

/// What happened to each file handed to [`AttachmentList::ingest`].
#[derive(Debug, Default)]
pub struct IngestReport {
    pub added: Vec<String>,
    /// Names refused because an attachment with that name already exists.
    pub rejected: Vec<String>,
    pub failed: Vec<AttachmentError>,
    pub warnings: Vec<String>,
}

impl AttachmentList {
    /// Convert `files` and add every one that succeeds.
    ///
    /// Duplicate names are refused before any work starts. Each remaining file
    /// is converted on its own blocking task and joined in completion order,
    /// so one slow PDF never holds up a text file. `on_added` runs once per
    /// attachment as it lands.
    pub async fn ingest<F>(&mut self, files: Vec<RawFile>, mut on_added: F) -> IngestReport
    where
        F: FnMut(&Attachment),
    {
        let mut report = IngestReport::default();
        let mut pending = FuturesUnordered::new();
        let mut claimed: Vec<String> = Vec::new();

        for file in files {
            if self.contains_name(&file.name) || claimed.contains(&file.name) {
                warn!(name = %file.name, "attachment with this name already exists");
                report.rejected.push(file.name);
                continue;
            }
            claimed.push(file.name.clone());

            let name = file.name.clone();
            pending.push(async move {
                let outcome = tokio::task::spawn_blocking(move || {
                    let normalized = normalize(&file);
                    (file.declared_type, normalized)
                })
                .await;
                (name, outcome)
            });
        }

        while let Some((name, outcome)) = pending.next().await {
            let (declared_type, normalized) = match outcome {
                Ok(result) => result,
                Err(err) => {
                    warn!(name = %name, error = %err, "attachment task failed");
                    report.failed.push(AttachmentError::Task {
                        name,
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            match normalized {
                Ok(normalized) => {
                    if let Some(warning) = normalized.warning.clone() {
                        report.warnings.push(warning);
                    }
                    let attachment = Attachment::new(name.clone(), declared_type, normalized);
                    match self.push(attachment) {
                        Ok(()) => {
                            if let Some(added) = self.iter().last() {
                                on_added(added);
                            }
                            report.added.push(name);
                        }
                        Err(err) => {
                            warn!(error = %err, "attachment rejected");
                            report.rejected.push(name);
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "attachment conversion failed");
                    report.failed.push(err);
                }
            }
        }

        report
    }
}
