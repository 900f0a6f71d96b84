//! Structured error types for the tirage merge pipeline.
//!
//! Three enums cover the real failure domains — reading a tabular dataset,
//! compiling the export package, and validating a persisted design — plus an
//! umbrella `Error` for callers that drive the whole pipeline.
//!
//! Bad colors, out-of-range font sizes, and blank headers are deliberately
//! *not* here: those are data-quality issues that get normalized to safe
//! defaults instead of failing an export.

use thiserror::Error;

/// Errors raised while importing a tabular dataset.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The file could not be read at all.
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes could not be parsed as CSV.
    #[error("Failed to parse CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The bytes could not be opened as a spreadsheet workbook.
    #[error("Failed to open workbook: {0}")]
    Workbook(#[from] calamine::Error),

    /// The workbook has no sheets to read.
    #[error("The workbook contains no sheets")]
    NoSheets,

    /// The first sheet is completely empty — not even a header row.
    #[error("The sheet contains no rows")]
    NoRows,

    /// The file extension is not a supported tabular format.
    #[error("Unsupported dataset format: .{0}")]
    UnsupportedFormat(String),
}

/// Errors raised while compiling the export document.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The compiler was invoked with zero merged records.
    #[error("No documents available to export")]
    NoRecords,

    /// Writing the document XML failed. Stringified so the variant stays
    /// stable across quick-xml versions.
    #[error("Failed to write document XML: {0}")]
    Xml(String),

    /// The OPC zip container could not be assembled.
    #[error("Failed to assemble document package: {0}")]
    Package(String),
}

/// Errors raised when a persisted design payload is rejected.
///
/// Rejection is wholesale: an invalid design is never partially accepted.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// JSON input failed to parse as a design document.
    #[error("Failed to parse design: {source}{}", hint_suffix(.hint))]
    Parse {
        source: serde_json::Error,
        hint: String,
    },

    /// The JSON was well-formed but structurally invalid.
    #[error("Invalid design: {0}")]
    Invalid(String),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the design schema. Check field names and types."
                    .to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input — is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        ValidationError::Parse { source: e, hint }
    }
}

/// The unified error type returned by functions that span failure domains.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
