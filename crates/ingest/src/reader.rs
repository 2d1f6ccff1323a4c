use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use thiserror::Error;
use tracing::debug;

use tabula_core::date::from_serial;
use tabula_core::{resolve_date_str, Cell, RawGrid};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("unreadable file: {0}")]
    UnreadableFile(String),
    #[error("file contains no data rows")]
    EmptyFile,
}

/// Decode uploaded statement bytes into a grid of untyped cells.
///
/// Workbook formats (xlsx/xls/ods) are detected by magic bytes; anything else
/// is treated as delimited text. Native spreadsheet dates are converted to
/// `Cell::Date` here — downstream code assumes the source format's own dates
/// are already resolved.
pub fn read_grid(bytes: &[u8]) -> Result<RawGrid, ReadError> {
    if bytes.is_empty() {
        return Err(ReadError::EmptyFile);
    }
    if is_workbook(bytes) {
        read_workbook(bytes)
    } else {
        read_delimited(bytes)
    }
}

fn is_workbook(bytes: &[u8]) -> bool {
    // ZIP container (xlsx/ods) or OLE compound document (legacy xls).
    bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0])
}

// ── Workbook path ─────────────────────────────────────────────────────────────

fn read_workbook(bytes: &[u8]) -> Result<RawGrid, ReadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ReadError::UnreadableFile(e.to_string()))?;

    let sheet_names = workbook.sheet_names().to_owned();
    if sheet_names.is_empty() {
        return Err(ReadError::EmptyFile);
    }

    // First sheet with any content wins.
    for name in &sheet_names {
        let Ok(range) = workbook.worksheet_range(name) else {
            continue;
        };
        let rows: Vec<Vec<Cell>> = range
            .rows()
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        let grid = RawGrid::new(rows);
        if !grid.is_empty() && !grid.has_no_content() {
            debug!(sheet = %name, rows = grid.len(), "read workbook sheet");
            return Ok(grid);
        }
    }

    Err(ReadError::EmptyFile)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                Cell::Empty
            } else {
                Cell::Text(t.to_string())
            }
        }
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match from_serial(dt.as_f64()) {
            Some(d) => Cell::Date(d),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => {
            let date_part = s.split('T').next().unwrap_or(s);
            match resolve_date_str(date_part) {
                Some(d) => Cell::Date(d),
                None => Cell::Text(s.clone()),
            }
        }
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

// ── Delimited-text path ───────────────────────────────────────────────────────

fn read_delimited(bytes: &[u8]) -> Result<RawGrid, ReadError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ReadError::UnreadableFile("not a workbook and not UTF-8 text".to_string()))?;

    let delimiter = sniff_delimiter(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReadError::UnreadableFile(e.to_string()))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    let t = field.trim();
                    if t.is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(t.to_string())
                    }
                })
                .collect(),
        );
    }

    let grid = RawGrid::new(rows);
    if grid.is_empty() || grid.has_no_content() {
        return Err(ReadError::EmptyFile);
    }
    debug!(rows = grid.len(), delimiter = ?(delimiter as char), "read delimited text");
    Ok(grid)
}

/// Pick the delimiter with the most occurrences on the first non-empty line.
fn sniff_delimiter(text: &str) -> u8 {
    let line = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    [b',', b';', b'\t', b'|']
        .into_iter()
        .max_by_key(|d| line.bytes().filter(|b| b == d).count())
        .unwrap_or(b',')
}
