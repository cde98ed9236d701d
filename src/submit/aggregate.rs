//! Turning collected values into the artifact field map and file list.

use serde_json::{Map, Value};

use crate::forms::document::FormDocument;
use crate::forms::settings::{CsvGrid, ElementSettings};
use crate::submit::values::{FileUpload, SubmissionValue, SubmissionValues};

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;

/// Field map for the single fields artifact plus the files to upload.
#[derive(Debug, Default)]
pub struct Aggregated<'a> {
    pub fields: Map<String, Value>,
    /// Files in the order their keys were recorded.
    pub files: Vec<(&'a str, &'a FileUpload)>,
}

/// Row 0 is the header. Each remaining row contributes its non-empty cells
/// to the matching header's column. Blank headers and columns without any
/// cells are dropped; repeated headers share one column.
pub fn transpose_table(grid: &CsvGrid) -> Vec<(String, Vec<String>)> {
    let Some((header, rows)) = grid.split_first() else {
        return Vec::new();
    };

    let mut columns: Vec<(String, Vec<String>)> = Vec::new();
    for (index, name) in header.iter().enumerate() {
        if name.trim().is_empty() {
            continue;
        }
        let cells: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get(index))
            .filter(|cell| !cell.trim().is_empty())
            .cloned()
            .collect();
        if cells.is_empty() {
            continue;
        }
        match columns.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => existing.extend(cells),
            None => columns.push((name.clone(), cells)),
        }
    }
    columns
}

/// Table columns first, then scalar values by element key. A scalar with the
/// same name as a table column replaces it.
pub fn aggregate<'a>(doc: &FormDocument, values: &'a SubmissionValues) -> Aggregated<'a> {
    let mut out = Aggregated::default();

    for element in doc.elements() {
        let ElementSettings::Table { csv_data } = &element.settings else {
            continue;
        };
        for (header, cells) in transpose_table(csv_data) {
            let cells = cells.into_iter().map(Value::String);
            match out.fields.get_mut(&header) {
                Some(Value::Array(existing)) => existing.extend(cells),
                _ => {
                    out.fields.insert(header, Value::Array(cells.collect()));
                }
            }
        }
    }

    for (key, value) in values.iter() {
        match value {
            SubmissionValue::Scalar(text) => {
                out.fields.insert(key.to_string(), Value::String(text.clone()));
            }
            SubmissionValue::File(file) => out.files.push((key, file)),
        }
    }

    out
}

/// `"12.50 KB"` below one MiB, `"3.20 MB"` from there on.
pub fn human_file_size(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < MIB {
        format!("{:.2} KB", bytes / KIB)
    } else {
        format!("{:.2} MB", bytes / MIB)
    }
}
