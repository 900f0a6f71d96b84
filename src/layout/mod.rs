//! # Line grouping & vertical reconstruction
//!
//! The canvas positions fields absolutely at `(x%, y%)`; a word processor
//! flows top-to-bottom, paragraph by paragraph. This module reconstructs
//! the flowing form: cluster fields into visual lines, infer each line's
//! paragraph alignment from where it sits, and convert line centers into
//! forward-only "spacing before" offsets over the page's usable height.
//!
//! The reconstruction is a single pass and never re-measures rendered text,
//! so lines with large font variance can drift a little. That is the
//! accepted trade for output that existing documents already depend on —
//! resist the urge to make any of it smarter.

use crate::model::MergeField;
use crate::style::TextAlign;

/// Fields whose `y` differs by at most this many percentage points from a
/// group's first member share a line with it.
pub const LINE_GROUP_THRESHOLD: f64 = 5.0;
/// Single-field lines anchored left of this are left-aligned...
pub const ALIGN_LEFT_MAX_X: f64 = 35.0;
/// ...and right of this are right-aligned.
pub const ALIGN_RIGHT_MIN_X: f64 = 65.0;
/// Multi-field lines spanning more than this much of the width read as a
/// deliberate spread and are left-aligned rather than centered.
pub const WIDE_SPREAD_LIMIT: f64 = 40.0;
/// Divisor turning the x-distance between neighbors into literal spaces.
pub const GAP_DIVISOR: f64 = 2.0;
/// Floor on the literal spaces between two fields sharing a line.
pub const MIN_GAP_SPACES: usize = 2;
/// Single spacing renders at roughly 1.2x the font size.
pub const LINE_HEIGHT_FACTOR: f64 = 1.2;
/// Twentieths of a point per point.
pub const TWIPS_PER_POINT: f64 = 20.0;

/// A cluster of fields judged to lie on the same visual text line.
///
/// Transient: groups exist only while compiling an export and are rebuilt
/// from scratch on every run.
#[derive(Debug, Clone)]
pub struct FieldGroup {
    /// Members ordered left to right by `x`.
    pub fields: Vec<MergeField>,
    /// Mean `y` of the members; anchors the visual center of the line.
    pub y_position: f64,
}

impl FieldGroup {
    /// Mean font size across members, feeding the line-height estimate.
    pub fn avg_font_size(&self) -> f64 {
        let total: f64 = self.fields.iter().map(|f| f.font_size).sum();
        total / self.fields.len() as f64
    }
}

/// Cluster fields into visual lines.
///
/// Fields are stable-sorted by `y`; a field joins the open group while its
/// `y` is within [`LINE_GROUP_THRESHOLD`] of the group's FIRST member. The
/// first member anchors the whole group — deliberately not mutual-distance
/// clustering, so a slowly drifting column chains exactly the way existing
/// exports expect. Groups come back ordered top to bottom.
pub fn group_fields_by_line(fields: &[MergeField]) -> Vec<FieldGroup> {
    if fields.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<MergeField> = fields.to_vec();
    sorted.sort_by(|a, b| a.y().total_cmp(&b.y()));

    let mut groups = Vec::new();
    let mut current: Vec<MergeField> = Vec::new();
    let mut anchor_y = sorted[0].y();

    for field in sorted {
        if current.is_empty() {
            anchor_y = field.y();
            current.push(field);
        } else if (field.y() - anchor_y).abs() <= LINE_GROUP_THRESHOLD {
            current.push(field);
        } else {
            groups.push(close_group(std::mem::take(&mut current)));
            anchor_y = field.y();
            current.push(field);
        }
    }
    if !current.is_empty() {
        groups.push(close_group(current));
    }

    groups
}

fn close_group(mut fields: Vec<MergeField>) -> FieldGroup {
    let y_position = fields.iter().map(|f| f.y()).sum::<f64>() / fields.len() as f64;
    fields.sort_by(|a, b| a.x().total_cmp(&b.x()));
    FieldGroup { fields, y_position }
}

/// Infer a line's paragraph alignment from where its fields sit.
///
/// A lone field reads as left/right when it hugs an edge; in the ambiguous
/// middle the document-level fallback wins. Multiple fields read as a
/// deliberate spread when they span widely, otherwise they center as one
/// composed line.
pub fn infer_alignment(group: &FieldGroup, fallback: TextAlign) -> TextAlign {
    if group.fields.len() == 1 {
        let x = group.fields[0].x();
        if x < ALIGN_LEFT_MAX_X {
            TextAlign::Left
        } else if x > ALIGN_RIGHT_MIN_X {
            TextAlign::Right
        } else {
            fallback
        }
    } else {
        // Members are sorted by x, so the ends give the spread.
        let leftmost = group.fields.first().map(|f| f.x()).unwrap_or(0.0);
        let rightmost = group.fields.last().map(|f| f.x()).unwrap_or(0.0);
        if rightmost - leftmost > WIDE_SPREAD_LIMIT {
            TextAlign::Left
        } else {
            TextAlign::Center
        }
    }
}

/// Literal spaces standing in for the horizontal gap between two fields
/// sharing a line, proportional to their x-distance.
pub fn gap_spaces(delta_x: f64) -> usize {
    ((delta_x / GAP_DIVISOR).round() as i64).max(MIN_GAP_SPACES as i64) as usize
}

/// Estimated height of one line in twips for a font size in points.
pub fn line_height_twips(font_size: f64) -> i64 {
    (font_size * TWIPS_PER_POINT * LINE_HEIGHT_FACTOR).round() as i64
}

/// Converts group centers into forward-only paragraph spacing.
///
/// Each group wants its visual center at `y%` of the usable height. The
/// cursor tracks how far down the page previous groups have pushed the
/// flow and emits the remaining distance as `spacing before`; a group that
/// wants to sit above the cursor gets zero, never a negative.
#[derive(Debug, Default)]
pub struct FlowCursor {
    consumed: i64,
}

impl FlowCursor {
    pub fn new() -> Self {
        Self { consumed: 0 }
    }

    /// Twips of spacing to emit before the next line group.
    pub fn spacing_before(&mut self, y_position: f64, usable_height: i64, line_height: i64) -> i64 {
        let target = (y_position / 100.0 * usable_height as f64).round() as i64;
        let center_offset = line_height / 2;
        let spacing = (target - self.consumed - center_offset).max(0);
        self.consumed = target + center_offset;
        spacing
    }
}
