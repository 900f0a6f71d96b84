//! # Document type registry
//!
//! Static page geometry, label-grid packing, and per-type field presets.
//! The registry is lookup tables only; all layout computation lives in
//! [`crate::layout`] and [`crate::docx`].

use serde::{Deserialize, Serialize};

use crate::model::MergeField;

/// Twentieths of a point per inch, the unit WordprocessingML measures in.
pub const TWIPS_PER_INCH: f64 = 1440.0;

/// Uniform page margin for single-document types: half an inch.
pub const PAGE_MARGIN_TWIPS: i64 = 720;

/// Inner padding of a label cell: a tenth of an inch.
pub const CELL_PADDING_TWIPS: i64 = 144;

/// The kinds of document the designer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    #[default]
    Letter,
    Certificate,
    Label,
    Envelope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Physical page geometry for one document type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_in: f64,
    pub height_in: f64,
    pub orientation: Orientation,
}

impl PageGeometry {
    pub fn width_twips(&self) -> i64 {
        (self.width_in * TWIPS_PER_INCH).round() as i64
    }

    pub fn height_twips(&self) -> i64 {
        (self.height_in * TWIPS_PER_INCH).round() as i64
    }
}

/// Fixed columns-by-rows packing for types that place several records on
/// one physical page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelGrid {
    pub labels_per_row: usize,
    pub rows_per_page: usize,
    pub cell_width_in: f64,
    pub cell_height_in: f64,
}

impl LabelGrid {
    pub fn labels_per_page(&self) -> usize {
        self.labels_per_row * self.rows_per_page
    }

    pub fn cell_width_twips(&self) -> i64 {
        (self.cell_width_in * TWIPS_PER_INCH).round() as i64
    }

    pub fn cell_height_twips(&self) -> i64 {
        (self.cell_height_in * TWIPS_PER_INCH).round() as i64
    }
}

/// Preset field rows: (name, text, x, y, font size, color).
type Preset = (&'static str, &'static str, f64, f64, f64, &'static str);

const LETTER_PRESETS: &[Preset] = &[
    ("Recipient", "{{Name}}", 50.0, 12.0, 16.0, "#111827"),
    ("Address", "{{Address}}", 50.0, 18.0, 12.0, "#374151"),
    ("Greeting", "Dear {{Name}},", 14.0, 32.0, 12.0, "#111827"),
    (
        "Body",
        "We are delighted to share the enclosed update with you.",
        16.0,
        40.0,
        12.0,
        "#111827",
    ),
    ("Signature", "Warm regards,", 14.0, 78.0, 12.0, "#111827"),
];

const CERTIFICATE_PRESETS: &[Preset] = &[
    ("Title", "Certificate of Achievement", 50.0, 16.0, 34.0, "#1F2937"),
    (
        "Lead-in",
        "This certificate is proudly presented to",
        50.0,
        34.0,
        12.0,
        "#6B7280",
    ),
    ("Recipient", "{{Name}}", 50.0, 46.0, 28.0, "#B45309"),
    (
        "Reason",
        "in recognition of {{Achievement}}",
        50.0,
        60.0,
        13.0,
        "#374151",
    ),
    ("Date", "{{Date}}", 22.0, 82.0, 11.0, "#374151"),
    ("Signature", "{{Presenter}}", 78.0, 82.0, 11.0, "#374151"),
];

const LABEL_PRESETS: &[Preset] = &[
    ("Name", "{{Name}}", 50.0, 32.0, 18.0, "#111827"),
    ("Street", "{{Address}}", 50.0, 52.0, 12.0, "#374151"),
    ("City line", "{{City}}, {{State}} {{Zip}}", 50.0, 66.0, 12.0, "#374151"),
];

const ENVELOPE_PRESETS: &[Preset] = &[
    ("Return name", "{{SenderName}}", 14.0, 12.0, 10.0, "#374151"),
    ("Return address", "{{SenderAddress}}", 14.0, 22.0, 10.0, "#374151"),
    ("Recipient", "{{Name}}", 50.0, 48.0, 14.0, "#111827"),
    ("Street", "{{Address}}", 50.0, 60.0, 12.0, "#111827"),
    ("City line", "{{City}}, {{State}} {{Zip}}", 50.0, 72.0, 12.0, "#111827"),
];

impl DocumentType {
    /// Physical page dimensions in inches.
    pub fn geometry(&self) -> PageGeometry {
        match self {
            DocumentType::Letter => PageGeometry {
                width_in: 8.5,
                height_in: 11.0,
                orientation: Orientation::Portrait,
            },
            DocumentType::Certificate => PageGeometry {
                width_in: 11.0,
                height_in: 8.5,
                orientation: Orientation::Landscape,
            },
            DocumentType::Label => PageGeometry {
                width_in: 8.5,
                height_in: 11.0,
                orientation: Orientation::Portrait,
            },
            // #10 business envelope.
            DocumentType::Envelope => PageGeometry {
                width_in: 9.5,
                height_in: 4.125,
                orientation: Orientation::Landscape,
            },
        }
    }

    /// Grid packing for types that place several records per page.
    /// Label sheets pack 2 x 3 shipping labels of 4" x 3 1/3".
    pub fn label_grid(&self) -> Option<LabelGrid> {
        match self {
            DocumentType::Label => Some(LabelGrid {
                labels_per_row: 2,
                rows_per_page: 3,
                cell_width_in: 4.0,
                cell_height_in: 10.0 / 3.0,
            }),
            _ => None,
        }
    }

    /// CSS aspect ratio for the on-screen preview. Label reports a single
    /// cell's aspect, not the sheet's.
    pub fn aspect_ratio(&self) -> &'static str {
        match self {
            DocumentType::Letter => "8.5 / 11",
            DocumentType::Certificate => "11 / 8.5",
            DocumentType::Label => "6 / 5",
            DocumentType::Envelope => "9.5 / 4.125",
        }
    }

    /// Wire name, also embedded in export filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Letter => "letter",
            DocumentType::Certificate => "certificate",
            DocumentType::Label => "label",
            DocumentType::Envelope => "envelope",
        }
    }

    /// Materialize the type's preset fields with fresh ids.
    pub fn default_fields(&self) -> Vec<MergeField> {
        let presets: &[Preset] = match self {
            DocumentType::Letter => LETTER_PRESETS,
            DocumentType::Certificate => CERTIFICATE_PRESETS,
            DocumentType::Label => LABEL_PRESETS,
            DocumentType::Envelope => ENVELOPE_PRESETS,
        };
        presets
            .iter()
            .map(|(name, text, x, y, size, color)| {
                let mut field = MergeField::new(name, text, *x, *y);
                field.font_size = *size;
                field.color = (*color).to_string();
                field
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_geometry_in_twips() {
        let geometry = DocumentType::Letter.geometry();
        assert_eq!(geometry.width_twips(), 12240);
        assert_eq!(geometry.height_twips(), 15840);
        assert_eq!(geometry.orientation, Orientation::Portrait);
    }

    #[test]
    fn test_certificate_is_landscape_letter() {
        let geometry = DocumentType::Certificate.geometry();
        assert_eq!(geometry.width_twips(), 15840);
        assert_eq!(geometry.height_twips(), 12240);
        assert_eq!(geometry.orientation, Orientation::Landscape);
    }

    #[test]
    fn test_envelope_number_ten() {
        let geometry = DocumentType::Envelope.geometry();
        assert_eq!(geometry.width_twips(), 13680);
        assert_eq!(geometry.height_twips(), 5940);
    }

    #[test]
    fn test_label_grid_packs_six_per_page() {
        let grid = DocumentType::Label.label_grid().unwrap();
        assert_eq!(grid.labels_per_page(), 6);
        assert_eq!(grid.cell_width_twips(), 5760);
        assert_eq!(grid.cell_height_twips(), 4800);
        // The grid fills the sheet: 2 x 4" across 8.5", 3 x 3.33" down 11".
        let geometry = DocumentType::Label.geometry();
        assert!(grid.cell_width_twips() * 2 < geometry.width_twips());
        assert_eq!(grid.cell_height_twips() * 3, 14400);
    }

    #[test]
    fn test_only_label_has_a_grid() {
        assert!(DocumentType::Letter.label_grid().is_none());
        assert!(DocumentType::Certificate.label_grid().is_none());
        assert!(DocumentType::Envelope.label_grid().is_none());
    }

    #[test]
    fn test_presets_have_fresh_unique_ids() {
        let first = DocumentType::Certificate.default_fields();
        let second = DocumentType::Certificate.default_fields();
        assert!(!first.is_empty());
        assert_ne!(first[0].id, second[0].id, "each call mints new ids");

        let mut ids: Vec<&str> = first.iter().map(|f| f.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), first.len(), "ids within a set are unique");
    }

    #[test]
    fn test_aspect_ratios() {
        assert_eq!(DocumentType::Letter.aspect_ratio(), "8.5 / 11");
        assert_eq!(DocumentType::Envelope.aspect_ratio(), "9.5 / 4.125");
        // The label preview frames one cell, not the sheet: 4" / 3.33" = 6/5.
        assert_eq!(DocumentType::Label.aspect_ratio(), "6 / 5");
    }

    #[test]
    fn test_wire_names_round_trip() {
        for kind in [
            DocumentType::Letter,
            DocumentType::Certificate,
            DocumentType::Label,
            DocumentType::Envelope,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            let parsed: DocumentType = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed, kind);
        }
    }
}
