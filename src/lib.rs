//! # Tirage
//!
//! A mail-merge document compiler.
//!
//! A design canvas positions merge fields absolutely — `{{Name}}` at
//! (50%, 20%), 24pt amber — but a word processor has no such concept: text
//! flows top to bottom, paragraph by paragraph. Most exporters give up and
//! emit a picture of the canvas, which prints beautifully and edits like a
//! brick.
//!
//! Tirage does the opposite: **the export is a real flowing document.**
//! Fields are clustered into visual lines, each line's alignment is inferred
//! from where it sits, and the percentage offsets become forward-only
//! paragraph spacing — so the text lands where the canvas put it and stays
//! editable in Word.
//!
//! ## Architecture
//!
//! ```text
//! Design (JSON/API)     Spreadsheet (CSV/XLSX)
//!       ↓                      ↓
//!   [model]               [dataset]   — fields + headers/rows
//!       └──────────┬───────────┘
//!              [merge]    — {{Token}} resolution, one field-set per row
//!                  ↓
//!              [layout]   — line grouping, alignment, vertical spacing
//!                  ↓
//!              [docx]     — WordprocessingML parts in an OPC container
//! ```

pub mod dataset;
pub mod doctype;
pub mod docx;
pub mod error;
pub mod layout;
pub mod merge;
pub mod model;
pub mod session;
pub mod style;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use error::{DatasetError, Error, ExportError, ValidationError};

use dataset::Dataset;
use docx::DocxWriter;
use model::DocumentData;

/// Merge a document template against a dataset into DOCX bytes.
///
/// This is the primary entry point. One output record is produced per data
/// row — a page for single-record types, a grid cell for labels. With no
/// dataset (or one without rows) the template compiles once with its tokens
/// left verbatim, which is what previewing an unbound design wants.
pub fn merge(document: &DocumentData, dataset: Option<&Dataset>) -> Result<Vec<u8>, ExportError> {
    let records = merge::build_record_sets(document, dataset);
    let writer = DocxWriter::new();
    writer.write(document, &records)
}

/// Merge a design described as JSON against a dataset.
pub fn merge_json(design_json: &str, dataset: Option<&Dataset>) -> Result<Vec<u8>, Error> {
    let document = model::parse_design(design_json)?;
    Ok(merge(&document, dataset)?)
}
