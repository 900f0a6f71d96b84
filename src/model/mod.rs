//! # Design model
//!
//! The input representation for the merge pipeline: positioned merge fields,
//! the document template that owns them, and the persistence envelope a
//! saved design travels in.
//!
//! Every position is a percentage of the canvas, clamped into `[0, 100]` on
//! every write — drag, nudge, deserialization — so nothing downstream ever
//! re-checks bounds. The canvas has no pixel coordinates anywhere in this
//! crate; percentages are the only spatial currency until the compiler
//! converts them to twips.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::doctype::DocumentType;
use crate::error::ValidationError;
use crate::style::{self, TextAlign};

/// Canvas midpoint, the fallback for non-finite position writes.
const CENTER_PERCENT: f64 = 50.0;

/// Clamp a canvas percentage into `[0, 100]`.
///
/// NaN and infinities land on the canvas midpoint rather than poisoning
/// later layout arithmetic.
pub fn clamp_percent(value: f64) -> f64 {
    if !value.is_finite() {
        return CENTER_PERCENT;
    }
    value.clamp(0.0, 100.0)
}

/// One placeable text element on the design canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeField {
    /// Opaque unique id, stable for the field's lifetime.
    pub id: String,
    /// Human-readable label. Not guaranteed unique.
    pub name: String,
    /// Raw content; may interleave literal text with `{{Name}}` tokens.
    pub text: String,
    /// Font size in points.
    pub font_size: f64,
    /// Hex color, `#RRGGBB` or the three-digit shorthand.
    pub color: String,
    /// Anchor x as a percentage of the canvas width. The field renders
    /// centered on the anchor. Private so every write goes through
    /// [`MergeField::set_position`] and its clamp.
    x: f64,
    /// Anchor y as a percentage of the canvas height.
    y: f64,
    /// Hidden fields stay in the document but are excluded from export.
    #[serde(default = "default_true")]
    pub visible: bool,
}

impl MergeField {
    /// A fresh field with a generated id and default styling.
    pub fn new(name: &str, text: &str, x: f64, y: f64) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            text: text.to_string(),
            font_size: style::DEFAULT_FONT_SIZE,
            color: "#000000".to_string(),
            x: clamp_percent(x),
            y: clamp_percent(y),
            visible: true,
        }
    }

    /// Anchor x, always within `[0, 100]`.
    pub fn x(&self) -> f64 {
        self.x
    }

    /// Anchor y, always within `[0, 100]`.
    pub fn y(&self) -> f64 {
        self.y
    }

    /// Move the anchor to an absolute position.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.x = clamp_percent(x);
        self.y = clamp_percent(y);
    }

    /// Nudge the anchor by a delta (keyboard arrows).
    pub fn nudge(&mut self, dx: f64, dy: f64) {
        self.set_position(self.x + dx, self.y + dy);
    }

    /// Resize, clamped into the printable range.
    pub fn set_font_size(&mut self, size: f64) {
        self.font_size = style::clamp_font_size(size);
    }
}

fn default_true() -> bool {
    true
}

/// A complete document template: type, fields, and theme state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentData {
    pub document_type: DocumentType,
    pub fields: Vec<MergeField>,
    /// On-screen chrome color. Never consulted by the compiler.
    #[serde(default = "default_accent")]
    pub accent: String,
    /// Named entry from the background palette.
    #[serde(default = "default_background")]
    pub background: String,
    /// Custom hex background; wins over `background` when non-blank.
    #[serde(default)]
    pub custom_background: Option<String>,
    /// Fallback alignment for single-field lines whose position is ambiguous.
    #[serde(default)]
    pub text_align: TextAlign,
}

impl DocumentData {
    /// A fresh template seeded with the type's preset fields.
    pub fn new(document_type: DocumentType) -> Self {
        Self {
            document_type,
            fields: document_type.default_fields(),
            accent: default_accent(),
            background: default_background(),
            custom_background: None,
            text_align: TextAlign::default(),
        }
    }
}

fn default_accent() -> String {
    "slate".to_string()
}

fn default_background() -> String {
    "white".to_string()
}

/// Parse and validate a persisted design.
///
/// Invalid payloads are rejected wholesale; there is no partial acceptance.
/// Positions in accepted payloads are clamped on the way in — hand-edited
/// JSON is a write like any other.
pub fn parse_design(json: &str) -> Result<DocumentData, ValidationError> {
    let mut document: DocumentData = serde_json::from_str(json)?;
    validate_document(&document)?;
    for field in &mut document.fields {
        field.x = clamp_percent(field.x);
        field.y = clamp_percent(field.y);
    }
    Ok(document)
}

fn validate_document(document: &DocumentData) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for field in &document.fields {
        if field.id.trim().is_empty() {
            return Err(ValidationError::Invalid(format!(
                "field \"{}\" has a blank id",
                field.name
            )));
        }
        if !seen.insert(field.id.as_str()) {
            return Err(ValidationError::Invalid(format!(
                "duplicate field id: {}",
                field.id
            )));
        }
    }
    Ok(())
}

/// Persistence envelope for a design stored under a user-chosen name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedDesign {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<SavedAt>,
    pub document: DocumentData,
}

/// When a design was saved.
///
/// Persisted metadata arrives either as a server-assigned timestamp or as a
/// browser-local date. The variant is resolved once, here at the persistence
/// boundary; downstream code only ever sees a UTC instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SavedAt {
    /// Server-assigned timestamp, epoch milliseconds.
    Servertime { raw: i64 },
    /// Browser-local date in RFC 3339 form.
    Localdate { value: String },
}

impl SavedAt {
    /// Resolve to a UTC instant. Unparseable local dates yield `None`.
    pub fn as_utc(&self) -> Option<DateTime<Utc>> {
        match self {
            SavedAt::Servertime { raw } => Utc.timestamp_millis_opt(*raw).single(),
            SavedAt::Localdate { value } => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
        }
    }
}
