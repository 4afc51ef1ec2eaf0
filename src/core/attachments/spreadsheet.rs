//! Workbook and CSV conversion into markdown tables.

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

pub const EMPTY_SHEET_NOTICE: &str = "*Empty sheet*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }
}

/// Read every sheet of an xlsx/xls/ods workbook.
pub fn read_workbook(bytes: &[u8]) -> Result<Vec<Sheet>, calamine::Error> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        let rows = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect::<Vec<_>>())
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        sheets.push(Sheet::new(name, rows));
    }
    Ok(sheets)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Read a CSV file as a single sheet named after the file.
pub fn read_csv(bytes: &[u8], sheet_name: &str) -> Result<Vec<Sheet>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.iter().any(|cell| !cell.is_empty()) {
            rows.push(row);
        }
    }
    Ok(vec![Sheet::new(sheet_name, rows)])
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|")
}

fn push_row<'a, I>(out: &mut String, cells: I)
where
    I: IntoIterator<Item = &'a str>,
{
    let cells: Vec<String> = cells.into_iter().map(escape_cell).collect();
    out.push_str("| ");
    out.push_str(&cells.join(" | "));
    out.push_str(" |\n");
}

fn render_sheet(out: &mut String, sheet: &Sheet) {
    let Some((header, body)) = sheet.rows.split_first().filter(|(h, _)| !h.is_empty()) else {
        out.push_str(EMPTY_SHEET_NOTICE);
        out.push('\n');
        return;
    };

    let width = header.len();
    push_row(out, header.iter().map(String::as_str));
    push_row(out, std::iter::repeat("---").take(width));

    for row in body {
        // Short rows are padded with empty cells; extra cells are dropped.
        push_row(
            out,
            (0..width).map(|index| row.get(index).map(String::as_str).unwrap_or("")),
        );
    }
}

/// Render sheets as markdown tables, one per sheet.
///
/// The first row of each sheet is the header. Sheet names are only shown
/// when there is more than one sheet; sheets are separated by a rule.
pub fn render_workbook(sheets: &[Sheet]) -> String {
    let mut out = String::new();
    let multiple = sheets.len() > 1;

    for (index, sheet) in sheets.iter().enumerate() {
        if multiple {
            out.push_str(&format!("\nSheet: {}\n", sheet.name));
        }
        render_sheet(&mut out, sheet);
        if index + 1 < sheets.len() {
            out.push_str("\n---\n\n");
        }
    }

    out.trim().to_string()
}
