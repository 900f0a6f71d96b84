//! # Text styling
//!
//! Alignment, color normalization, and the font-size bounds shared by the
//! editing surface and the compiler. Styling here is fail-soft: a color or
//! size that cannot be honored degrades to a safe default, it never fails
//! an export.

use serde::{Deserialize, Serialize};

/// Paragraph alignment for an exported line.
///
/// Also the document-level fallback applied when a single-field line sits in
/// the ambiguous middle of the canvas and its position implies nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Smallest font size the compiler will emit, in points.
pub const MIN_FONT_SIZE: f64 = 8.0;
/// Largest font size the compiler will emit, in points.
pub const MAX_FONT_SIZE: f64 = 200.0;
/// Size assigned to fresh fields and to non-finite stored sizes.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Clamp a font size into the printable range. Non-finite values land on
/// the default rather than poisoning line-height arithmetic.
pub fn clamp_font_size(size: f64) -> f64 {
    if !size.is_finite() {
        return DEFAULT_FONT_SIZE;
    }
    size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE)
}

/// Normalize a color to uppercase six-digit hex without the leading `#`.
///
/// Accepts `#RRGGBB`, `RRGGBB`, and the three-digit shorthand in either
/// case. Anything else — named colors, rgb() syntax, stray lengths — falls
/// back to black.
pub fn normalize_hex(input: &str) -> String {
    let hex = input.trim().trim_start_matches('#');
    match hex.len() {
        3 if hex.chars().all(|c| c.is_ascii_hexdigit()) => hex
            .chars()
            .flat_map(|c| [c, c])
            .collect::<String>()
            .to_uppercase(),
        6 if hex.chars().all(|c| c.is_ascii_hexdigit()) => hex.to_uppercase(),
        _ => "000000".to_string(),
    }
}

/// The named background palette offered by the theme picker.
/// Unknown names resolve to white at export time.
pub fn background_hex(name: &str) -> Option<&'static str> {
    match name {
        "white" => Some("FFFFFF"),
        "ivory" => Some("FFFFF0"),
        "parchment" => Some("F5EEDC"),
        "mint" => Some("E8F5E9"),
        "sky" => Some("E3F2FD"),
        "blush" => Some("FCE4EC"),
        _ => None,
    }
}

/// Resolve the fill color for an export, once per document.
///
/// A non-blank custom hex wins over the named palette entry; an unknown
/// palette name means white. The result is always a bare six-digit hex.
pub fn resolve_background(background: &str, custom_background: Option<&str>) -> String {
    if let Some(custom) = custom_background {
        if !custom.trim().is_empty() {
            return normalize_hex(custom);
        }
    }
    background_hex(background).unwrap_or("FFFFFF").to_string()
}
