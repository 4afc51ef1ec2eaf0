pub const MIME_PDF: &str = "application/pdf";
pub const MIME_JSON: &str = "application/json";
pub const MIME_XML: &str = "application/xml";
pub const MIME_CSV: &str = "text/csv";
pub const MIME_XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
pub const MIME_XLS: &str = "application/vnd.ms-excel";

const SPREADSHEET_MIME_TYPES: [&str; 3] = [MIME_XLSX, MIME_XLS, MIME_CSV];
const SPREADSHEET_EXTENSIONS: [&str; 3] = [".xlsx", ".xls", ".csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Csv,
    Workbook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Spreadsheet(SheetFormat),
    Text,
    /// Not a type we know; read as text after warning the user.
    Other,
}

fn has_extension(name: &str, extension: &str) -> bool {
    name.to_ascii_lowercase().ends_with(extension)
}

pub fn is_spreadsheet(name: &str, declared_type: &str) -> bool {
    SPREADSHEET_MIME_TYPES.contains(&declared_type)
        || SPREADSHEET_EXTENSIONS
            .iter()
            .any(|extension| has_extension(name, extension))
}

/// Decide how an upload is converted from its name and declared media type.
///
/// PDF and spreadsheet checks run first so that `text/csv` is parsed as a
/// table rather than passed through as plain text.
pub fn classify(name: &str, declared_type: &str) -> FileKind {
    if declared_type == MIME_PDF {
        return FileKind::Pdf;
    }

    if is_spreadsheet(name, declared_type) {
        let format = if declared_type == MIME_CSV || has_extension(name, ".csv") {
            SheetFormat::Csv
        } else {
            SheetFormat::Workbook
        };
        return FileKind::Spreadsheet(format);
    }

    if declared_type.starts_with("image/") {
        return FileKind::Image;
    }

    if declared_type.is_empty()
        || declared_type.starts_with("text/")
        || declared_type == MIME_JSON
        || declared_type == MIME_XML
    {
        return FileKind::Text;
    }

    FileKind::Other
}
