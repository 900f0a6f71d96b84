//! # Dataset importer
//!
//! Turns an uploaded spreadsheet into headers plus rows, and keeps the
//! design's field list in sync with what arrived.
//!
//! The reading contract is deliberately blunt: first sheet only, first row
//! is the header row, every cell stringified. Import is all-or-nothing — a
//! failed parse leaves no partial rows behind. This module knows nothing
//! about merge syntax beyond manufacturing `{{Header}}` bindings when it
//! realigns fields.

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::DatasetError;
use crate::model::MergeField;

/// One data row: header name to cell value. Values are always strings; the
/// importer already stringified and trimmed them.
pub type DatasetRow = HashMap<String, String>;

/// A parsed spreadsheet: ordered headers plus one map per data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

/// Supported input formats, keyed off the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    /// Anything calamine can open: xlsx, xlsm, xlsb, xls, ods.
    Workbook,
}

impl TableFormat {
    /// Map a file extension to a format. Unknown extensions are rejected
    /// rather than content-sniffed.
    pub fn from_extension(ext: &str) -> Result<Self, DatasetError> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(TableFormat::Workbook),
            other => Err(DatasetError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parse dataset bytes into headers and rows.
///
/// Blank header cells drop their whole column. Rows whose cells are all
/// empty after trimming are discarded entirely. A file with headers but no
/// data rows is fine — zero rows is a valid dataset.
pub fn read_dataset(bytes: &[u8], format: TableFormat) -> Result<Dataset, DatasetError> {
    let grid = match format {
        TableFormat::Csv => csv_grid(bytes)?,
        TableFormat::Workbook => workbook_grid(bytes)?,
    };
    let dataset = dataset_from_grid(grid)?;
    debug!(
        "dataset parsed: {} column(s), {} row(s)",
        dataset.headers.len(),
        dataset.rows.len()
    );
    Ok(dataset)
}

/// Read a dataset from disk, picking the format from the file extension.
/// This is the pipeline's only filesystem touch; everything downstream of
/// the returned `Dataset` is pure.
pub fn read_dataset_file(path: &Path) -> Result<Dataset, DatasetError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let format = TableFormat::from_extension(extension)?;
    let bytes = std::fs::read(path)?;
    read_dataset(&bytes, format)
}

fn csv_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, DatasetError> {
    // Excel prepends a UTF-8 BOM; strip it so it cannot glue onto the first header.
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);

    let mut grid = Vec::new();
    for record in reader.records() {
        let record = record?;
        grid.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    Ok(grid)
}

fn workbook_grid(bytes: &[u8]) -> Result<Vec<Vec<String>>, DatasetError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(DatasetError::NoSheets)??;

    let mut grid = Vec::new();
    for row in range.rows() {
        grid.push(row.iter().map(cell_to_string).collect());
    }
    Ok(grid)
}

/// Stringify one workbook cell. Floats holding integral values print
/// without a trailing `.0`; datetimes render as ISO 8601.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 {
                format!("{:.0}", f)
            } else {
                f.to_string()
            }
        }
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|d| d.format("%Y-%m-%dT%H:%M:%S").to_string())
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => e.to_string(),
    }
}

fn dataset_from_grid(grid: Vec<Vec<String>>) -> Result<Dataset, DatasetError> {
    let mut raw_rows = grid.into_iter();
    let header_row = raw_rows.next().ok_or(DatasetError::NoRows)?;

    // Capture (column index, trimmed header); blank headers drop their column.
    let columns: Vec<(usize, String)> = header_row
        .iter()
        .enumerate()
        .filter_map(|(i, cell)| {
            let label = cell.trim();
            (!label.is_empty()).then(|| (i, label.to_string()))
        })
        .collect();

    let mut rows = Vec::new();
    for raw in raw_rows {
        if raw.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut row = DatasetRow::with_capacity(columns.len());
        for (index, header) in &columns {
            let value = raw.get(*index).map(|cell| cell.trim()).unwrap_or("");
            row.insert(header.clone(), value.to_string());
        }
        rows.push(row);
    }

    Ok(Dataset {
        headers: columns.into_iter().map(|(_, header)| header).collect(),
        rows,
    })
}

// ─── Import summary ──────────────────────────────────────────────────────────

/// How the imported columns relate to the design's fields. The designer's
/// UI calls fields "layers"; the wire names keep that vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryStatus {
    /// One column per field, exactly.
    Match,
    /// More columns than fields; some data has nowhere to land.
    NeedsLayers,
    /// More fields than columns; some fields will never resolve.
    UnusedLayers,
}

/// Derived comparison of an import against the current field list.
///
/// A pure projection: recomputed whenever the field count or the dataset
/// changes, never stored as a source of truth and never re-read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub header_count: usize,
    pub layer_count: usize,
    pub row_count: usize,
    pub status: SummaryStatus,
}

impl ImportSummary {
    pub fn compute(header_count: usize, layer_count: usize, row_count: usize) -> Self {
        let status = if header_count == layer_count {
            SummaryStatus::Match
        } else if header_count > layer_count {
            SummaryStatus::NeedsLayers
        } else {
            SummaryStatus::UnusedLayers
        };
        Self {
            header_count,
            layer_count,
            row_count,
            status,
        }
    }
}

// ─── Field / header alignment ────────────────────────────────────────────────

/// Vertical spacing of fields synthesized for surplus headers, in percent.
const SYNTH_BASE_Y: f64 = 15.0;
const SYNTH_STEP_Y: f64 = 10.0;

/// Result of realigning the field list to imported headers.
#[derive(Debug, Clone)]
pub struct AlignedFields {
    pub fields: Vec<MergeField>,
    /// The field the UI should focus after realigning.
    pub active_id: Option<String>,
}

/// Rebind fields to headers one-to-one by position.
///
/// Header `i` takes over field `i`: the field keeps its id, position, size,
/// and color, but its name becomes the header and its text the matching
/// `{{Header}}` token. Surplus headers synthesize new fields stacked down
/// the canvas; surplus fields are left untouched — the import summary
/// reports the mismatch instead of deleting user content.
pub fn align_fields_with_headers(fields: &[MergeField], headers: &[String]) -> AlignedFields {
    let mut aligned = fields.to_vec();

    for (i, header) in headers.iter().enumerate() {
        let label = normalize_header(header, i);
        let text = format!("{{{{{label}}}}}");
        match aligned.get_mut(i) {
            Some(field) => {
                field.name = label;
                field.text = text;
            }
            None => {
                let y = SYNTH_BASE_Y + SYNTH_STEP_Y * i as f64;
                aligned.push(MergeField::new(&label, &text, 50.0, y));
            }
        }
    }

    let active_id = aligned.first().map(|field| field.id.clone());
    AlignedFields {
        fields: aligned,
        active_id,
    }
}

/// Blank headers become positional placeholders.
fn normalize_header(header: &str, index: usize) -> String {
    let label = header.trim();
    if label.is_empty() {
        format!("Field {}", index + 1)
    } else {
        label.to_string()
    }
}
